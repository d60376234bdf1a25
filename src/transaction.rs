//! Transaction building, legacy signing digests and input verification

use crate::constants::*;
use crate::error::{MinicoinError, Result};
use crate::hash::{double_sha256, from_display_hex};
use crate::keys::{Address, KeyPair};
use crate::script::{verify_script, Script, SignatureChecker};
use crate::serialization::serialize_transaction;
use crate::types::*;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1};
use tracing::{debug, warn};

/// Output to create: spending condition plus amount in smallest units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub script: Script,
    pub amount: u64,
}

impl Destination {
    pub fn new(script: Script, amount: u64) -> Self {
        Self { script, amount }
    }

    /// Standard pay-to-content-hash condition for `address`
    pub fn to_address(address: &Address, amount: u64) -> Self {
        Self { script: address.p2pkh_script(), amount }
    }
}

/// Prior output being spent, with the condition it must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub outpoint: OutPoint,
    pub locking_script: Script,
    pub unlocking_script: Option<Script>,
}

impl UnspentOutput {
    pub fn new(txid: Hash, index: u32, locking_script: Script) -> Self {
        Self {
            outpoint: OutPoint { hash: txid, index },
            locking_script,
            unlocking_script: None,
        }
    }

    /// Same as [`UnspentOutput::new`] with the txid in display (reversed) hex.
    pub fn from_display_txid(txid: &str, index: u32, locking_script: Script) -> Result<Self> {
        Ok(Self::new(from_display_hex(txid)?, index, locking_script))
    }

    pub fn with_unlocking_script(mut self, unlocking_script: Script) -> Self {
        self.unlocking_script = Some(unlocking_script);
        self
    }
}

/// Legacy signature hash.
///
/// For transaction tx, input i and script code sc:
/// 1. Copy tx and clear every input's scriptSig
/// 2. Set input i's scriptSig to sc
/// 3. Serialize the copy and append hash_type as 4 little-endian bytes
/// 4. Return SHA256(SHA256(bytes))
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    hash_type: u32,
) -> Result<Hash> {
    if input_index >= tx.inputs.len() {
        return Err(MinicoinError::InputIndexOutOfRange(input_index));
    }

    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.script_sig = if i == input_index {
            script_code.to_vec()
        } else {
            Vec::new()
        };
    }

    let mut preimage = serialize_transaction(&copy);
    preimage.extend_from_slice(&hash_type.to_le_bytes());
    Ok(double_sha256(&preimage))
}

/// Verify a DER signature over `digest`. High-S signatures are normalized
/// first so third-party signers are accepted.
pub fn verify_ecdsa(digest: &Hash, signature_der: &[u8], public_key: &[u8]) -> bool {
    let pubkey = match PublicKey::from_slice(public_key) {
        Ok(pk) => pk,
        Err(_) => return false,
    };

    let mut signature = match Signature::from_der(signature_der) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    signature.normalize_s();

    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&Message::from_digest(*digest), &signature, &pubkey).is_ok()
}

/// Checks signatures against the signing digest of one transaction input
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    script_code: Vec<u8>,
}

impl<'a> TransactionSignatureChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize, locking_script: &Script) -> Self {
        Self {
            tx,
            input_index,
            script_code: locking_script.to_bytes(),
        }
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_sig(&self, signature: &[u8], public_key: &[u8]) -> bool {
        let Some((&hash_type, der)) = signature.split_last() else {
            return false;
        };
        if hash_type as u32 != SIGHASH_ALL {
            return false;
        }

        match signature_hash(self.tx, self.input_index, &self.script_code, SIGHASH_ALL) {
            Ok(digest) => verify_ecdsa(&digest, der, public_key),
            Err(_) => false,
        }
    }
}

/// Verify every input of `tx` against the locking script of the output it
/// spends (`locking_scripts[i]` for input i).
pub fn verify_transaction(tx: &Transaction, locking_scripts: &[Script]) -> Result<()> {
    if locking_scripts.len() != tx.inputs.len() {
        return Err(MinicoinError::ScriptFailed(format!(
            "{} locking scripts for {} inputs",
            locking_scripts.len(),
            tx.inputs.len()
        )));
    }

    for (i, (input, locking)) in tx.inputs.iter().zip(locking_scripts).enumerate() {
        let unlocking = Script::parse(&input.script_sig).map_err(|e| {
            warn!(input = i, error = %e, "unparseable unlocking script");
            MinicoinError::VerificationFailed(i)
        })?;
        let checker = TransactionSignatureChecker::new(tx, i, locking);
        if let Err(e) = verify_script(&unlocking, locking, &checker) {
            warn!(input = i, error = %e, "input failed verification");
            return Err(MinicoinError::VerificationFailed(i));
        }
        debug!(input = i, "input verified");
    }

    Ok(())
}

/// Convert a decimal coin amount to smallest units (rounded).
pub fn btc_to_satoshis(amount: f64) -> Result<u64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(MinicoinError::Serialization(format!("invalid amount {}", amount)));
    }
    let units = (amount * SATOSHIS_PER_BTC as f64).round();
    if units > u64::MAX as f64 {
        return Err(MinicoinError::Serialization(format!("amount {} overflows", amount)));
    }
    Ok(units as u64)
}

/// Incremental builder for a single signer's transaction.
///
/// Inputs and outputs keep insertion order. Inputs without a custom
/// unlocking script are signed by the builder's key pair with the standard
/// `<signature> <public key>` proof.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    signer: KeyPair,
    inputs: Vec<UnspentOutput>,
    outputs: Vec<Destination>,
    version: i32,
    lock_time: u32,
}

impl TransactionBuilder {
    pub fn new(signer: KeyPair) -> Self {
        Self {
            signer,
            inputs: Vec::new(),
            outputs: Vec::new(),
            version: TX_VERSION,
            lock_time: 0,
        }
    }

    pub fn network(&self) -> Network {
        self.signer.network()
    }

    /// Address of the builder's signer
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Standard locking script paying to the signer
    pub fn p2pkh_script(&self) -> Script {
        self.signer.p2pkh_script()
    }

    pub fn inputs(&self) -> &[UnspentOutput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Destination] {
        &self.outputs
    }

    pub fn add_output(&mut self, destination: Destination) -> &mut Self {
        self.outputs.push(destination);
        self
    }

    pub fn add_input(&mut self, utxo: UnspentOutput) -> &mut Self {
        self.inputs.push(utxo);
        self
    }

    /// Replace the proof for input `index` with a caller-built script, e.g.
    /// multisig signatures collected from other keys.
    pub fn with_custom_unlocking_script(&mut self, index: usize, script: Script) -> Result<&mut Self> {
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(MinicoinError::InputIndexOutOfRange(index))?;
        input.unlocking_script = Some(script);
        Ok(self)
    }

    /// Transaction skeleton with empty unlocking scripts.
    pub fn finalize(&self) -> Result<Transaction> {
        if self.outputs.is_empty() {
            return Err(MinicoinError::MissingDestination);
        }
        if self.inputs.is_empty() {
            return Err(MinicoinError::MissingInput);
        }

        Ok(Transaction {
            version: self.version,
            inputs: self
                .inputs
                .iter()
                .map(|utxo| TransactionInput {
                    prevout: utxo.outpoint.clone(),
                    script_sig: Vec::new(),
                    sequence: SEQUENCE_FINAL,
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|destination| TransactionOutput {
                    value: destination.amount,
                    script_pubkey: destination.script.to_bytes(),
                })
                .collect(),
            lock_time: self.lock_time,
        })
    }

    /// Signing digest of input `index` over the finalized skeleton `tx`.
    pub fn signing_digest(&self, tx: &Transaction, index: usize) -> Result<Hash> {
        let utxo = self
            .inputs
            .get(index)
            .ok_or(MinicoinError::InputIndexOutOfRange(index))?;
        signature_hash(tx, index, &utxo.locking_script.to_bytes(), SIGHASH_ALL)
    }

    /// Signature ∥ SIGHASH_ALL for input `index`, by any key pair.
    ///
    /// Returns the raw signature only; [`TransactionBuilder::unlocking_script`]
    /// wraps the signer's signature into the standard proof.
    pub fn sign(&self, tx: &Transaction, index: usize, key_pair: &KeyPair) -> Result<Vec<u8>> {
        let digest = self.signing_digest(tx, index)?;
        let mut signature = key_pair.sign_digest(&digest);
        signature.push(SIGHASH_ALL as u8);
        Ok(signature)
    }

    /// Proof for input `index` of the skeleton `tx`: the custom unlocking
    /// script when one was set, otherwise `<signature ∥ SIGHASH_ALL> <public key>`
    /// signed by the builder's key pair.
    pub fn unlocking_script(&self, tx: &Transaction, index: usize) -> Result<Script> {
        let utxo = self
            .inputs
            .get(index)
            .ok_or(MinicoinError::InputIndexOutOfRange(index))?;
        match &utxo.unlocking_script {
            Some(custom) => Ok(custom.clone()),
            None => {
                let signature = self.sign(tx, index, &self.signer)?;
                Ok(Script::p2pkh_unlocking(&signature, &self.signer.public_key()))
            }
        }
    }

    /// Verify every input of `tx` against the locking scripts held by this builder.
    pub fn verify(&self, tx: &Transaction) -> Result<()> {
        let locking: Vec<Script> = self.inputs.iter().map(|u| u.locking_script.clone()).collect();
        verify_transaction(tx, &locking)
    }

    /// finalize → sign inputs lacking a custom proof → verify.
    pub fn create(&self) -> Result<Transaction> {
        let skeleton = self.finalize()?;

        let unlocking_scripts = (0..self.inputs.len())
            .map(|i| self.unlocking_script(&skeleton, i))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = skeleton;
        for (input, script) in tx.inputs.iter_mut().zip(&unlocking_scripts) {
            input.script_sig = script.to_bytes();
        }

        self.verify(&tx)?;
        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            txid = %tx.txid_hex(),
            "transaction created"
        );
        Ok(tx)
    }
}
