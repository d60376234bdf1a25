//! Transaction building and verification with real signatures

use anyhow::Result;
use minicoin::hash::hash160;
use minicoin::script::encode_num;
use minicoin::serialization::deserialize_transaction;
use minicoin::transaction::verify_transaction;
use minicoin::*;

const FUNDING_TXID: &str = "4e2c3ad3c1ec2b4fa9ab4e0e5e0a7e7fcda3e44a1b5c7b7e3c3b4cbe0a1d2f3e";

fn key(byte: u8) -> KeyPair {
    KeyPair::from_secret_bytes(Network::Test, &[byte; 32]).unwrap()
}

fn multisig_condition(keys: &[KeyPair]) -> Script {
    let public_keys: Vec<[u8; 65]> = keys.iter().map(|k| k.public_key()).collect();
    let refs: Vec<&[u8]> = public_keys.iter().map(|k| k.as_slice()).collect();
    Script::multisig_locking(2, &refs).unwrap()
}

#[test]
fn test_single_signer_round_trip() -> Result<()> {
    let signer = key(11);
    let mut builder = TransactionBuilder::new(signer.clone());
    builder.add_output(Destination::to_address(&key(12).address(), 70_000));
    builder.add_output(Destination::to_address(&signer.address(), 8_000));
    builder.add_input(UnspentOutput::from_display_txid(FUNDING_TXID, 1, signer.p2pkh_script())?);

    let tx = builder.create()?;
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.inputs[0].prevout.hash[0], 0x3e);

    let parsed = deserialize_transaction(&hex::decode(tx.to_hex())?)?;
    assert_eq!(parsed, tx);
    verify_transaction(&parsed, &[signer.p2pkh_script()])?;
    Ok(())
}

#[test]
fn test_two_inputs_signed_against_same_outputs() -> Result<()> {
    let signer = key(21);
    let mut builder = TransactionBuilder::new(signer.clone());
    builder.add_output(Destination::to_address(&signer.address(), 1_000));
    builder.add_input(UnspentOutput::new([1; 32], 0, signer.p2pkh_script()));
    builder.add_input(UnspentOutput::new([2; 32], 3, signer.p2pkh_script()));

    let mut tx = builder.create()?;
    assert_ne!(tx.inputs[0].script_sig, tx.inputs[1].script_sig);

    // Each signature covers its own input index
    let (head, tail) = tx.inputs.split_at_mut(1);
    std::mem::swap(&mut head[0].script_sig, &mut tail[0].script_sig);
    assert_eq!(builder.verify(&tx), Err(MinicoinError::VerificationFailed(0)));
    Ok(())
}

#[test]
fn test_mutated_output_fails_verification() -> Result<()> {
    let signer = key(31);
    let mut builder = TransactionBuilder::new(signer.clone());
    builder.add_output(Destination::to_address(&signer.address(), 50_000));
    builder.add_input(UnspentOutput::new([5; 32], 0, signer.p2pkh_script()));

    let mut tx = builder.create()?;
    tx.outputs[0].value = 49_999;
    assert_eq!(
        verify_transaction(&tx, &[signer.p2pkh_script()]),
        Err(MinicoinError::VerificationFailed(0))
    );
    Ok(())
}

#[test]
fn test_two_of_three_multisig() -> Result<()> {
    let cosigners = [key(41), key(42), key(43)];
    let condition = multisig_condition(&cosigners);

    let mut builder = TransactionBuilder::new(cosigners[0].clone());
    builder.add_output(Destination::to_address(&cosigners[0].address(), 95_000));
    builder.add_input(UnspentOutput::new([6; 32], 0, condition));

    let skeleton = builder.finalize()?;
    let first = builder.sign(&skeleton, 0, &cosigners[0])?;
    let third = builder.sign(&skeleton, 0, &cosigners[2])?;
    builder.with_custom_unlocking_script(0, Script::multisig_unlocking(&[first, third]))?;

    let tx = builder.create()?;
    assert_eq!(tx.inputs[0].script_sig[0], 0x00);
    Ok(())
}

#[test]
fn test_multisig_same_key_twice_fails() -> Result<()> {
    let cosigners = [key(51), key(52), key(53)];
    let mut builder = TransactionBuilder::new(cosigners[0].clone());
    builder.add_output(Destination::to_address(&cosigners[0].address(), 1_000));
    builder.add_input(UnspentOutput::new([7; 32], 0, multisig_condition(&cosigners)));

    let skeleton = builder.finalize()?;
    let signature = builder.sign(&skeleton, 0, &cosigners[1])?;
    builder.with_custom_unlocking_script(
        0,
        Script::multisig_unlocking(&[signature.clone(), signature]),
    )?;

    assert_eq!(builder.create(), Err(MinicoinError::VerificationFailed(0)));
    Ok(())
}

#[test]
fn test_multisig_signatures_out_of_key_order_fail() -> Result<()> {
    let cosigners = [key(61), key(62), key(63)];
    let mut builder = TransactionBuilder::new(cosigners[0].clone());
    builder.add_output(Destination::to_address(&cosigners[0].address(), 1_000));
    builder.add_input(UnspentOutput::new([8; 32], 0, multisig_condition(&cosigners)));

    let skeleton = builder.finalize()?;
    let second = builder.sign(&skeleton, 0, &cosigners[1])?;
    let first = builder.sign(&skeleton, 0, &cosigners[0])?;
    builder.with_custom_unlocking_script(0, Script::multisig_unlocking(&[second, first]))?;

    assert_eq!(builder.create(), Err(MinicoinError::VerificationFailed(0)));
    Ok(())
}

fn puzzle_condition(a: i64, b: i64) -> Script {
    Script::new(vec![
        ScriptOp::Op(Opcode::TwoDup),
        ScriptOp::Op(Opcode::Add),
        ScriptOp::Op(Opcode::Hash160),
        ScriptOp::Push(hash160(&encode_num(a + b)).to_vec()),
        ScriptOp::Op(Opcode::EqualVerify),
        ScriptOp::Op(Opcode::Sub),
        ScriptOp::Op(Opcode::Hash160),
        ScriptOp::Push(hash160(&encode_num(a - b)).to_vec()),
        ScriptOp::Op(Opcode::Equal),
    ])
}

fn puzzle_answer(a: i64, b: i64) -> Script {
    Script::new(vec![ScriptOp::Push(encode_num(a)), ScriptOp::Push(encode_num(b))])
}

#[test]
fn test_arithmetic_puzzle_spend() -> Result<()> {
    let payee = key(71);
    let mut builder = TransactionBuilder::new(payee.clone());
    builder.add_output(Destination::to_address(&payee.address(), 10_000));
    builder.add_input(
        UnspentOutput::new([9; 32], 0, puzzle_condition(977, 881))
            .with_unlocking_script(puzzle_answer(977, 881)),
    );
    builder.create()?;
    Ok(())
}

#[test]
fn test_arithmetic_puzzle_wrong_answer() {
    let payee = key(72);
    let mut builder = TransactionBuilder::new(payee.clone());
    builder.add_output(Destination::to_address(&payee.address(), 10_000));
    builder.add_input(
        UnspentOutput::new([9; 32], 0, puzzle_condition(977, 881))
            .with_unlocking_script(puzzle_answer(881, 977)),
    );
    assert_eq!(builder.create(), Err(MinicoinError::VerificationFailed(0)));
}

#[test]
fn test_unspendable_output_script() {
    let destination = Destination::new(Script::unspendable(), 0);
    assert_eq!(destination.script.to_bytes(), vec![0x6a]);
}
