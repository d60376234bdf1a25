//! Legacy (non-witness) transaction wire format
//!
//! version(4) ∥ varint(|ins|) ∥ ins ∥ varint(|outs|) ∥ outs ∥ lock_time(4)
//! - input: prev hash(32) ∥ prev index(4) ∥ varint(|scriptSig|) ∥ scriptSig ∥ sequence(4)
//! - output: value(8) ∥ varint(|scriptPubKey|) ∥ scriptPubKey
//!
//! All integers little-endian.

use crate::error::{MinicoinError, Result};
use crate::hash::{double_sha256, to_display_hex};
use crate::types::*;

/// Encode a number as a Bitcoin varint
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut data = Vec::new();

    data.extend_from_slice(&tx.version.to_le_bytes());

    data.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        data.extend_from_slice(&input.prevout.hash);
        data.extend_from_slice(&input.prevout.index.to_le_bytes());
        data.extend_from_slice(&encode_varint(input.script_sig.len() as u64));
        data.extend_from_slice(&input.script_sig);
        data.extend_from_slice(&input.sequence.to_le_bytes());
    }

    data.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        data.extend_from_slice(&output.value.to_le_bytes());
        data.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
        data.extend_from_slice(&output.script_pubkey);
    }

    data.extend_from_slice(&tx.lock_time.to_le_bytes());

    data
}

/// Parse a serialized transaction; the input must be consumed exactly.
pub fn deserialize_transaction(bytes: &[u8]) -> Result<Transaction> {
    let mut reader = Reader { bytes, pos: 0 };

    let version = i32::from_le_bytes(reader.array()?);

    let input_count = reader.varint()?;
    let mut inputs = Vec::new();
    for _ in 0..input_count {
        let hash: Hash = reader.array()?;
        let index = u32::from_le_bytes(reader.array()?);
        let script_len = reader.varint()? as usize;
        let script_sig = reader.take(script_len)?.to_vec();
        let sequence = u32::from_le_bytes(reader.array()?);
        inputs.push(TransactionInput {
            prevout: OutPoint { hash, index },
            script_sig,
            sequence,
        });
    }

    let output_count = reader.varint()?;
    let mut outputs = Vec::new();
    for _ in 0..output_count {
        let value = u64::from_le_bytes(reader.array()?);
        let script_len = reader.varint()? as usize;
        let script_pubkey = reader.take(script_len)?.to_vec();
        outputs.push(TransactionOutput { value, script_pubkey });
    }

    let lock_time = u32::from_le_bytes(reader.array()?);

    if reader.pos != bytes.len() {
        return Err(MinicoinError::Serialization(format!(
            "{} trailing bytes after transaction",
            bytes.len() - reader.pos
        )));
    }

    Ok(Transaction { version, inputs, outputs, lock_time })
}

/// Transaction id: double SHA256 of the serialized transaction (internal order)
pub fn txid(tx: &Transaction) -> Hash {
    double_sha256(&serialize_transaction(tx))
}

impl Transaction {
    pub fn serialize(&self) -> Vec<u8> {
        serialize_transaction(self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(serialize_transaction(self))
    }

    pub fn txid(&self) -> Hash {
        txid(self)
    }

    /// Transaction id as shown by explorers (byte-reversed hex)
    pub fn txid_hex(&self) -> String {
        to_display_hex(&txid(self))
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                MinicoinError::Serialization(format!(
                    "unexpected end of data at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn varint(&mut self) -> Result<u64> {
        let prefix = self.take(1)?[0];
        Ok(match prefix {
            0xfd => u16::from_le_bytes(self.array()?) as u64,
            0xfe => u32::from_le_bytes(self.array()?) as u64,
            0xff => u64::from_le_bytes(self.array()?),
            n => n as u64,
        })
    }
}
