//! Script representation and stack-based evaluation
//!
//! A spending attempt runs the unlocking script on an empty stack, then the
//! locking script on the stack it left behind:
//! 1. Initialize stack S = ∅
//! 2. For each operation in unlocking ∥ locking:
//!    - push operations place their data on S
//!    - opcodes apply their stack effect, failing on underflow
//!    - |S| above the stack limit or too many opcodes fails
//! 3. Succeed iff S is non-empty and its top element is truthy

use crate::constants::*;
use crate::error::{MinicoinError, Result};
use crate::hash::hash160;
use crate::types::{ByteString, Hash160};
use std::fmt;

/// Supported opcodes. Anything else is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// OP_DUP - duplicate top stack item
    Dup,
    /// OP_HASH160 - RIPEMD160(SHA256(x))
    Hash160,
    /// OP_EQUAL - push whether the top two items are equal
    Equal,
    /// OP_EQUALVERIFY - fail unless the top two items are equal
    EqualVerify,
    /// OP_2DUP - duplicate the top two items as a pair
    TwoDup,
    /// OP_CHECKSIG - verify a signature against the signing digest
    CheckSig,
    /// OP_CHECKMULTISIG - m-of-n signature check with ordered key matching
    CheckMultiSig,
    /// OP_ADD
    Add,
    /// OP_SUB
    Sub,
    /// OP_RETURN - unconditional failure, marks unspendable outputs
    Return,
}

type OpEffect = fn(&mut Vec<ByteString>, &dyn SignatureChecker) -> Result<()>;

impl Opcode {
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Dup => 0x76,
            Opcode::Hash160 => 0xa9,
            Opcode::Equal => 0x87,
            Opcode::EqualVerify => 0x88,
            Opcode::TwoDup => 0x6e,
            Opcode::CheckSig => 0xac,
            Opcode::CheckMultiSig => 0xae,
            Opcode::Add => 0x93,
            Opcode::Sub => 0x94,
            Opcode::Return => 0x6a,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x76 => Some(Opcode::Dup),
            0xa9 => Some(Opcode::Hash160),
            0x87 => Some(Opcode::Equal),
            0x88 => Some(Opcode::EqualVerify),
            0x6e => Some(Opcode::TwoDup),
            0xac => Some(Opcode::CheckSig),
            0xae => Some(Opcode::CheckMultiSig),
            0x93 => Some(Opcode::Add),
            0x94 => Some(Opcode::Sub),
            0x6a => Some(Opcode::Return),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Dup => "OP_DUP",
            Opcode::Hash160 => "OP_HASH160",
            Opcode::Equal => "OP_EQUAL",
            Opcode::EqualVerify => "OP_EQUALVERIFY",
            Opcode::TwoDup => "OP_2DUP",
            Opcode::CheckSig => "OP_CHECKSIG",
            Opcode::CheckMultiSig => "OP_CHECKMULTISIG",
            Opcode::Add => "OP_ADD",
            Opcode::Sub => "OP_SUB",
            Opcode::Return => "OP_RETURN",
        }
    }

    /// Stack effect of each opcode.
    fn effect(self) -> OpEffect {
        match self {
            Opcode::Dup => op_dup,
            Opcode::Hash160 => op_hash160,
            Opcode::Equal => op_equal,
            Opcode::EqualVerify => op_equalverify,
            Opcode::TwoDup => op_2dup,
            Opcode::CheckSig => op_checksig,
            Opcode::CheckMultiSig => op_checkmultisig,
            Opcode::Add => op_add,
            Opcode::Sub => op_sub,
            Opcode::Return => op_return,
        }
    }
}

/// One script element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    /// Literal data push
    Push(ByteString),
    /// Small integer 0..=16, encoded as OP_0 / OP_1..OP_16
    Number(u8),
    Op(Opcode),
}

/// Immutable sequence of script operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    ops: Vec<ScriptOp>,
}

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;

impl Script {
    pub fn new(ops: Vec<ScriptOp>) -> Self {
        Self { ops }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[ScriptOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Wire encoding of the script.
    pub fn to_bytes(&self) -> ByteString {
        let mut bytes = Vec::new();
        for op in &self.ops {
            match op {
                ScriptOp::Push(data) => push_data(&mut bytes, data),
                ScriptOp::Number(0) => bytes.push(OP_0),
                ScriptOp::Number(n) if *n <= 16 => bytes.push(OP_1 - 1 + n),
                ScriptOp::Number(n) => push_data(&mut bytes, &encode_num(*n as i64)),
                ScriptOp::Op(opcode) => bytes.push(opcode.to_byte()),
            }
        }
        bytes
    }

    /// Parse a wire-encoded script restricted to the supported opcode set.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut ops = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let byte = bytes[pos];
            pos += 1;

            let op = match byte {
                OP_0 => ScriptOp::Number(0),
                0x01..=0x4b => ScriptOp::Push(take(bytes, &mut pos, byte as usize)?.to_vec()),
                OP_PUSHDATA1 => {
                    let len = take(bytes, &mut pos, 1)?[0] as usize;
                    ScriptOp::Push(take(bytes, &mut pos, len)?.to_vec())
                }
                OP_PUSHDATA2 => {
                    let raw = take(bytes, &mut pos, 2)?;
                    let len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
                    ScriptOp::Push(take(bytes, &mut pos, len)?.to_vec())
                }
                OP_PUSHDATA4 => {
                    let raw = take(bytes, &mut pos, 4)?;
                    let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
                    ScriptOp::Push(take(bytes, &mut pos, len)?.to_vec())
                }
                OP_1..=OP_16 => ScriptOp::Number(byte - OP_1 + 1),
                other => match Opcode::from_byte(other) {
                    Some(opcode) => ScriptOp::Op(opcode),
                    None => {
                        return Err(MinicoinError::DecodeError(format!(
                            "unsupported opcode {:#04x} at offset {}",
                            other,
                            pos - 1
                        )))
                    }
                },
            };
            ops.push(op);
        }

        Ok(Self { ops })
    }

    /// OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh_locking(hash: &Hash160) -> Self {
        Self::new(vec![
            ScriptOp::Op(Opcode::Dup),
            ScriptOp::Op(Opcode::Hash160),
            ScriptOp::Push(hash.to_vec()),
            ScriptOp::Op(Opcode::EqualVerify),
            ScriptOp::Op(Opcode::CheckSig),
        ])
    }

    /// <signature ∥ hash type> <public key>
    pub fn p2pkh_unlocking(signature: &[u8], public_key: &[u8]) -> Self {
        Self::new(vec![
            ScriptOp::Push(signature.to_vec()),
            ScriptOp::Push(public_key.to_vec()),
        ])
    }

    /// <m> <pk1> ... <pkn> <n> OP_CHECKMULTISIG
    pub fn multisig_locking(required: u8, public_keys: &[&[u8]]) -> Result<Self> {
        let total = public_keys.len();
        if required == 0 || required as usize > total || total > 16 {
            return Err(MinicoinError::ScriptFailed(format!(
                "invalid {}-of-{} multisig condition",
                required, total
            )));
        }

        let mut ops = vec![ScriptOp::Number(required)];
        ops.extend(public_keys.iter().map(|key| ScriptOp::Push(key.to_vec())));
        ops.push(ScriptOp::Number(total as u8));
        ops.push(ScriptOp::Op(Opcode::CheckMultiSig));
        Ok(Self::new(ops))
    }

    /// OP_0 <sig1> ... <sigm>; the leading OP_0 is the element CHECKMULTISIG
    /// consumes beyond its signatures.
    pub fn multisig_unlocking(signatures: &[ByteString]) -> Self {
        let mut ops = vec![ScriptOp::Number(0)];
        ops.extend(signatures.iter().cloned().map(ScriptOp::Push));
        Self::new(ops)
    }

    /// OP_RETURN
    pub fn unspendable() -> Self {
        Self::new(vec![ScriptOp::Op(Opcode::Return)])
    }

    /// Bare OP_CHECKSIG: satisfied by any key that signs the spending input
    pub fn bare_checksig() -> Self {
        Self::new(vec![ScriptOp::Op(Opcode::CheckSig)])
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match op {
                ScriptOp::Push(data) => write!(f, "<{}>", hex::encode(data))?,
                ScriptOp::Number(n) => write!(f, "OP_{}", n)?,
                ScriptOp::Op(opcode) => f.write_str(opcode.name())?,
            }
        }
        Ok(())
    }
}

fn push_data(bytes: &mut ByteString, data: &[u8]) {
    let len = data.len();
    if len == 0 {
        bytes.push(OP_0);
        return;
    } else if len < OP_PUSHDATA1 as usize {
        bytes.push(len as u8);
    } else if len <= 0xff {
        bytes.push(OP_PUSHDATA1);
        bytes.push(len as u8);
    } else if len <= 0xffff {
        bytes.push(OP_PUSHDATA2);
        bytes.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        bytes.push(OP_PUSHDATA4);
        bytes.extend_from_slice(&(len as u32).to_le_bytes());
    }
    bytes.extend_from_slice(data);
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| MinicoinError::DecodeError("truncated push".to_string()))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

/// Signature verification hook used by OP_CHECKSIG and OP_CHECKMULTISIG.
///
/// `signature` carries the trailing hash-type byte; implementors decide what
/// digest it must commit to.
pub trait SignatureChecker {
    fn check_sig(&self, signature: &[u8], public_key: &[u8]) -> bool;
}

/// Checker for scripts evaluated outside any transaction: every signature fails.
pub struct NoSignatureChecker;

impl SignatureChecker for NoSignatureChecker {
    fn check_sig(&self, _signature: &[u8], _public_key: &[u8]) -> bool {
        false
    }
}

/// Run one script against an existing stack.
pub fn eval_script(
    script: &Script,
    stack: &mut Vec<ByteString>,
    checker: &dyn SignatureChecker,
) -> Result<()> {
    let mut op_count = 0;

    for op in script.ops() {
        match op {
            ScriptOp::Push(data) => stack.push(data.clone()),
            ScriptOp::Number(n) => stack.push(encode_num(*n as i64)),
            ScriptOp::Op(opcode) => {
                op_count += 1;
                if op_count > MAX_SCRIPT_OPS {
                    return Err(MinicoinError::ScriptFailed("Operation limit exceeded".to_string()));
                }
                (opcode.effect())(stack, checker)?;
            }
        }

        if stack.len() > MAX_STACK_SIZE {
            return Err(MinicoinError::ScriptFailed("Stack overflow".to_string()));
        }
    }

    Ok(())
}

/// Run `unlocking` then `locking` on a shared stack.
///
/// Fails with `ScriptFailed` when an opcode fails or the final top of stack
/// is missing or falsy.
pub fn verify_script(
    unlocking: &Script,
    locking: &Script,
    checker: &dyn SignatureChecker,
) -> Result<()> {
    let mut stack = Vec::new();

    eval_script(unlocking, &mut stack, checker)?;
    eval_script(locking, &mut stack, checker)?;

    match stack.last() {
        Some(top) if cast_to_bool(top) => Ok(()),
        Some(_) => Err(MinicoinError::ScriptFailed("Top of stack is false".to_string())),
        None => Err(MinicoinError::ScriptFailed("Empty stack after evaluation".to_string())),
    }
}

/// Any non-zero byte is true, except a lone sign bit in the last byte
/// (negative zero).
pub fn cast_to_bool(value: &[u8]) -> bool {
    for (i, &byte) in value.iter().enumerate() {
        if byte != 0 {
            return !(i == value.len() - 1 && byte == 0x80);
        }
    }
    false
}

fn bool_item(value: bool) -> ByteString {
    if value {
        vec![1]
    } else {
        vec![]
    }
}

/// Little-endian sign-magnitude, minimal length; zero is the empty string.
pub fn encode_num(value: i64) -> ByteString {
    if value == 0 {
        return vec![];
    }

    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut result = Vec::new();
    while abs > 0 {
        result.push((abs & 0xff) as u8);
        abs >>= 8;
    }

    let last = result.len() - 1;
    if result[last] & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        result[last] |= 0x80;
    }
    result
}

/// Inverse of [`encode_num`] for operands of at most four bytes.
pub fn decode_num(bytes: &[u8]) -> Result<i64> {
    if bytes.len() > MAX_SCRIPT_NUM_LEN {
        return Err(MinicoinError::ScriptFailed(format!(
            "numeric operand of {} bytes",
            bytes.len()
        )));
    }
    if bytes.is_empty() {
        return Ok(0);
    }

    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }

    let sign_bit = 0x80i64 << (8 * (bytes.len() - 1));
    if result & sign_bit != 0 {
        Ok(-(result & !sign_bit))
    } else {
        Ok(result)
    }
}

fn underflow(opcode: Opcode) -> MinicoinError {
    MinicoinError::ScriptFailed(format!("{}: stack underflow", opcode.name()))
}

fn pop(stack: &mut Vec<ByteString>, opcode: Opcode) -> Result<ByteString> {
    stack.pop().ok_or_else(|| underflow(opcode))
}

fn op_dup(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    let top = stack.last().cloned().ok_or_else(|| underflow(Opcode::Dup))?;
    stack.push(top);
    Ok(())
}

fn op_hash160(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    let item = pop(stack, Opcode::Hash160)?;
    stack.push(hash160(&item).to_vec());
    Ok(())
}

fn op_equal(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    let a = pop(stack, Opcode::Equal)?;
    let b = pop(stack, Opcode::Equal)?;
    stack.push(bool_item(a == b));
    Ok(())
}

fn op_equalverify(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    let a = pop(stack, Opcode::EqualVerify)?;
    let b = pop(stack, Opcode::EqualVerify)?;
    if a != b {
        return Err(MinicoinError::ScriptFailed("OP_EQUALVERIFY: items differ".to_string()));
    }
    Ok(())
}

fn op_2dup(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    if stack.len() < 2 {
        return Err(underflow(Opcode::TwoDup));
    }
    let second = stack[stack.len() - 2].clone();
    let top = stack[stack.len() - 1].clone();
    stack.push(second);
    stack.push(top);
    Ok(())
}

fn op_checksig(stack: &mut Vec<ByteString>, checker: &dyn SignatureChecker) -> Result<()> {
    let public_key = pop(stack, Opcode::CheckSig)?;
    let signature = pop(stack, Opcode::CheckSig)?;
    stack.push(bool_item(checker.check_sig(&signature, &public_key)));
    Ok(())
}

fn op_checkmultisig(stack: &mut Vec<ByteString>, checker: &dyn SignatureChecker) -> Result<()> {
    let key_count = decode_num(&pop(stack, Opcode::CheckMultiSig)?)?;
    if key_count < 0 || key_count as usize > MAX_PUBKEYS_PER_MULTISIG {
        return Err(MinicoinError::ScriptFailed(format!(
            "OP_CHECKMULTISIG: key count {}",
            key_count
        )));
    }
    let key_count = key_count as usize;
    if stack.len() < key_count {
        return Err(underflow(Opcode::CheckMultiSig));
    }
    let keys = stack.split_off(stack.len() - key_count);

    let sig_count = decode_num(&pop(stack, Opcode::CheckMultiSig)?)?;
    if sig_count < 0 || sig_count as usize > key_count {
        return Err(MinicoinError::ScriptFailed(format!(
            "OP_CHECKMULTISIG: signature count {} of {}",
            sig_count, key_count
        )));
    }
    let sig_count = sig_count as usize;
    if stack.len() < sig_count + 1 {
        return Err(underflow(Opcode::CheckMultiSig));
    }
    let signatures = stack.split_off(stack.len() - sig_count);
    pop(stack, Opcode::CheckMultiSig)?;

    // Keys are consumed in listed order, so one key never satisfies two signatures
    let mut key_index = 0;
    let mut sig_index = 0;
    while sig_index < sig_count {
        if sig_count - sig_index > key_count - key_index {
            break;
        }
        if checker.check_sig(&signatures[sig_index], &keys[key_index]) {
            sig_index += 1;
        }
        key_index += 1;
    }

    stack.push(bool_item(sig_index == sig_count));
    Ok(())
}

fn op_add(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    let b = decode_num(&pop(stack, Opcode::Add)?)?;
    let a = decode_num(&pop(stack, Opcode::Add)?)?;
    stack.push(encode_num(a + b));
    Ok(())
}

fn op_sub(stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    let b = decode_num(&pop(stack, Opcode::Sub)?)?;
    let a = decode_num(&pop(stack, Opcode::Sub)?)?;
    stack.push(encode_num(a - b));
    Ok(())
}

fn op_return(_stack: &mut Vec<ByteString>, _checker: &dyn SignatureChecker) -> Result<()> {
    Err(MinicoinError::ScriptFailed("OP_RETURN".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &Script) -> Result<Vec<ByteString>> {
        let mut stack = Vec::new();
        eval_script(script, &mut stack, &NoSignatureChecker)?;
        Ok(stack)
    }

    fn op(opcode: Opcode) -> ScriptOp {
        ScriptOp::Op(opcode)
    }

    /// Accepts a signature iff it equals b"sig-" ∥ public key
    struct EchoChecker;

    impl SignatureChecker for EchoChecker {
        fn check_sig(&self, signature: &[u8], public_key: &[u8]) -> bool {
            signature.strip_prefix(b"sig-") == Some(public_key)
        }
    }

    #[test]
    fn test_op_dup() {
        let stack = run(&Script::new(vec![ScriptOp::Number(1), op(Opcode::Dup)])).unwrap();
        assert_eq!(stack, vec![vec![1], vec![1]]);
    }

    #[test]
    fn test_op_dup_empty_stack() {
        assert!(matches!(
            run(&Script::new(vec![op(Opcode::Dup)])),
            Err(MinicoinError::ScriptFailed(_))
        ));
    }

    #[test]
    fn test_op_hash160() {
        let stack = run(&Script::new(vec![ScriptOp::Push(b"abc".to_vec()), op(Opcode::Hash160)])).unwrap();
        assert_eq!(stack, vec![hash160(b"abc").to_vec()]);
    }

    #[test]
    fn test_op_equal_true_and_false() {
        let stack = run(&Script::new(vec![
            ScriptOp::Number(2),
            ScriptOp::Number(2),
            op(Opcode::Equal),
            ScriptOp::Number(2),
            ScriptOp::Number(3),
            op(Opcode::Equal),
        ]))
        .unwrap();
        assert_eq!(stack, vec![vec![1], vec![]]);
    }

    #[test]
    fn test_op_equalverify_mismatch_aborts() {
        let script = Script::new(vec![ScriptOp::Number(1), ScriptOp::Number(2), op(Opcode::EqualVerify)]);
        assert!(matches!(run(&script), Err(MinicoinError::ScriptFailed(_))));
    }

    #[test]
    fn test_op_2dup() {
        let stack = run(&Script::new(vec![ScriptOp::Number(1), ScriptOp::Number(2), op(Opcode::TwoDup)])).unwrap();
        assert_eq!(stack, vec![vec![1], vec![2], vec![1], vec![2]]);
    }

    #[test]
    fn test_op_2dup_underflow() {
        let script = Script::new(vec![ScriptOp::Number(1), op(Opcode::TwoDup)]);
        assert!(matches!(run(&script), Err(MinicoinError::ScriptFailed(_))));
    }

    #[test]
    fn test_op_return_always_fails() {
        let unlocking = Script::new(vec![ScriptOp::Number(1)]);
        assert!(verify_script(&unlocking, &Script::unspendable(), &NoSignatureChecker).is_err());
    }

    #[test]
    fn test_arithmetic_puzzle() {
        let sum = encode_num(977 + 881);
        let diff = encode_num(977 - 881);
        assert_eq!(sum, vec![0x42, 0x07]);
        assert_eq!(diff, vec![0x60]);

        let locking = Script::new(vec![
            op(Opcode::TwoDup),
            op(Opcode::Add),
            op(Opcode::Hash160),
            ScriptOp::Push(hash160(&sum).to_vec()),
            op(Opcode::EqualVerify),
            op(Opcode::Sub),
            op(Opcode::Hash160),
            ScriptOp::Push(hash160(&diff).to_vec()),
            op(Opcode::Equal),
        ]);
        let unlocking = Script::new(vec![
            ScriptOp::Push(977u16.to_le_bytes().to_vec()),
            ScriptOp::Push(881u16.to_le_bytes().to_vec()),
        ]);
        assert!(verify_script(&unlocking, &locking, &NoSignatureChecker).is_ok());

        let wrong = Script::new(vec![
            ScriptOp::Push(881u16.to_le_bytes().to_vec()),
            ScriptOp::Push(977u16.to_le_bytes().to_vec()),
        ]);
        assert!(verify_script(&wrong, &locking, &NoSignatureChecker).is_err());
    }

    #[test]
    fn test_script_num_encoding() {
        assert_eq!(encode_num(0), Vec::<u8>::new());
        assert_eq!(encode_num(127), vec![0x7f]);
        assert_eq!(encode_num(128), vec![0x80, 0x00]);
        assert_eq!(encode_num(-1), vec![0x81]);
        assert_eq!(encode_num(-128), vec![0x80, 0x80]);
        for value in [0, 1, -1, 127, 128, -255, 32767, -65536, 2147483647] {
            assert_eq!(decode_num(&encode_num(value)).unwrap(), value);
        }
        assert!(decode_num(&[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_cast_to_bool() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0, 0]));
        assert!(!cast_to_bool(&[0, 0x80]));
        assert!(cast_to_bool(&[0x80, 0]));
        assert!(cast_to_bool(&[1]));
    }

    #[test]
    fn test_checksig_uses_checker() {
        let unlocking = Script::new(vec![ScriptOp::Push(b"sig-key".to_vec()), ScriptOp::Push(b"key".to_vec())]);
        assert!(verify_script(&unlocking, &Script::bare_checksig(), &EchoChecker).is_ok());
        assert!(verify_script(&unlocking, &Script::bare_checksig(), &NoSignatureChecker).is_err());
    }

    #[test]
    fn test_checkmultisig_two_of_three() {
        let keys: [&[u8]; 3] = [b"k1", b"k2", b"k3"];
        let locking = Script::multisig_locking(2, &keys).unwrap();

        let ok = Script::multisig_unlocking(&[b"sig-k1".to_vec(), b"sig-k3".to_vec()]);
        assert!(verify_script(&ok, &locking, &EchoChecker).is_ok());

        let reused = Script::multisig_unlocking(&[b"sig-k2".to_vec(), b"sig-k2".to_vec()]);
        assert!(verify_script(&reused, &locking, &EchoChecker).is_err());

        let out_of_order = Script::multisig_unlocking(&[b"sig-k3".to_vec(), b"sig-k1".to_vec()]);
        assert!(verify_script(&out_of_order, &locking, &EchoChecker).is_err());
    }

    #[test]
    fn test_checkmultisig_missing_dummy_underflows() {
        let keys: [&[u8]; 3] = [b"k1", b"k2", b"k3"];
        let locking = Script::multisig_locking(2, &keys).unwrap();
        let no_dummy = Script::new(vec![
            ScriptOp::Push(b"sig-k1".to_vec()),
            ScriptOp::Push(b"sig-k2".to_vec()),
        ]);
        assert!(matches!(
            verify_script(&no_dummy, &locking, &EchoChecker),
            Err(MinicoinError::ScriptFailed(_))
        ));
    }

    #[test]
    fn test_multisig_locking_rejects_bad_threshold() {
        let keys: [&[u8]; 2] = [b"k1", b"k2"];
        assert!(Script::multisig_locking(3, &keys).is_err());
        assert!(Script::multisig_locking(0, &keys).is_err());
    }

    #[test]
    fn test_p2pkh_bytes() {
        let script = Script::p2pkh_locking(&[0x11; 20]);
        let bytes = script.to_bytes();
        assert_eq!(bytes.len(), 25);
        assert_eq!(&bytes[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&bytes[23..], &[0x88, 0xac]);
        assert_eq!(Script::parse(&bytes).unwrap(), script);
    }

    #[test]
    fn test_parse_pushdata_forms() {
        let big = vec![0xaa; 300];
        let script = Script::new(vec![ScriptOp::Push(vec![0xbb; 80]), ScriptOp::Push(big)]);
        let bytes = script.to_bytes();
        assert_eq!(bytes[0], OP_PUSHDATA1);
        assert_eq!(bytes[82], OP_PUSHDATA2);
        assert_eq!(Script::parse(&bytes).unwrap(), script);
    }

    #[test]
    fn test_parse_rejects_unknown_and_truncated() {
        assert!(matches!(Script::parse(&[0xb1]), Err(MinicoinError::DecodeError(_))));
        assert!(matches!(Script::parse(&[0x05, 0x01]), Err(MinicoinError::DecodeError(_))));
    }

    #[test]
    fn test_display_asm() {
        let keys: [&[u8]; 1] = [b"\x01"];
        let script = Script::multisig_locking(1, &keys).unwrap();
        assert_eq!(script.to_string(), "OP_1 <01> OP_1 OP_CHECKMULTISIG");
    }

    #[test]
    fn test_operation_limit() {
        let mut ops = vec![ScriptOp::Number(1)];
        for _ in 0..=MAX_SCRIPT_OPS / 2 {
            ops.push(op(Opcode::Dup));
            ops.push(op(Opcode::Equal));
        }
        assert!(run(&Script::new(ops[..ops.len() - 2].to_vec())).is_ok());
        assert!(matches!(run(&Script::new(ops)), Err(MinicoinError::ScriptFailed(_))));
    }
}
