//! Block assembly and nonce search

use crate::config::MiningConfig;
use crate::constants::*;
use crate::error::{MinicoinError, Result};
use crate::hash::{double_sha256, from_display_hex, to_display_hex};
use crate::keys::Address;
use crate::pow::{expand_target, hash_meets_target, U256};
use crate::script::{Script, ScriptOp};
use crate::serialization::{serialize_transaction, txid};
use crate::types::*;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Merkle root over the transaction ids (internal order).
///
/// For transactions txs:
/// 1. Let hashes = [txid(tx) for tx in txs]
/// 2. While |hashes| > 1: duplicate the last hash if the count is odd, then
///    replace each adjacent pair (a, b) with SHA256(SHA256(a ∥ b))
/// 3. Return the remaining hash
pub fn merkle_root(transactions: &[Transaction]) -> Result<Hash> {
    if transactions.is_empty() {
        return Err(MinicoinError::Serialization(
            "cannot calculate merkle root for empty transaction list".to_string(),
        ));
    }

    let mut hashes: Vec<Hash> = transactions.iter().map(txid).collect();

    while hashes.len() > 1 {
        if hashes.len() % 2 == 1 {
            if let Some(&last) = hashes.last() {
                hashes.push(last);
            }
        }

        hashes = hashes
            .chunks(2)
            .map(|pair| {
                let mut combined = [0u8; 64];
                combined[..32].copy_from_slice(&pair[0]);
                combined[32..].copy_from_slice(&pair[1]);
                double_sha256(&combined)
            })
            .collect();
    }

    Ok(hashes[0])
}

/// Reward transaction: a single null-prevout input carrying `data` and one
/// P2PKH output paying `reward` to `address`.
pub fn coinbase_transaction(address: &Address, reward: u64, data: &[u8]) -> Transaction {
    Transaction {
        version: TX_VERSION,
        inputs: vec![TransactionInput {
            prevout: OutPoint {
                hash: [0u8; 32],
                index: COINBASE_INDEX,
            },
            script_sig: Script::new(vec![ScriptOp::Push(data.to_vec())]).to_bytes(),
            sequence: SEQUENCE_FINAL,
        }],
        outputs: vec![TransactionOutput {
            value: reward,
            script_pubkey: address.p2pkh_script().to_bytes(),
        }],
        lock_time: 0,
    }
}

impl Block {
    /// Assemble an unmined block (nonce 0) on top of `prev_hash`, given in
    /// display hex.
    pub fn new(transactions: Vec<Transaction>, prev_hash: &str, timestamp: u32, bits: u32) -> Result<Self> {
        let prev_block_hash = from_display_hex(prev_hash)?;
        let merkle_root = merkle_root(&transactions)?;

        Ok(Self {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_block_hash,
                merkle_root,
                timestamp,
                bits,
                nonce: 0,
            },
            transactions,
        })
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.header.version = version;
        self
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Header hash as shown by explorers (byte-reversed hex)
    pub fn hash_hex(&self) -> String {
        to_display_hex(&self.hash())
    }

    pub fn merkle_root_hex(&self) -> String {
        to_display_hex(&self.header.merkle_root)
    }

    /// Fails when the header's merkle root no longer commits to the body,
    /// e.g. after transactions were pushed past `Block::new`.
    pub fn check_merkle_root(&self) -> Result<()> {
        let expected = merkle_root(&self.transactions)?;
        if expected != self.header.merkle_root {
            return Err(MinicoinError::Serialization(format!(
                "header merkle root {} does not match body root {}",
                to_display_hex(&self.header.merkle_root),
                to_display_hex(&expected)
            )));
        }
        Ok(())
    }

    /// Block wire form.
    ///
    /// magic(4) ∥ size(4) ∥ header(80) ∥ tx count(1) ∥ transactions, where
    /// size counts everything after itself.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.transactions.len() > MAX_BLOCK_TRANSACTIONS {
            return Err(MinicoinError::TooManyTransactions(self.transactions.len()));
        }
        self.check_merkle_root()?;

        let mut payload = Vec::with_capacity(BLOCK_HEADER_LEN + 1);
        payload.extend_from_slice(&self.header.serialize());
        payload.push(self.transactions.len() as u8);
        for tx in &self.transactions {
            payload.extend_from_slice(&serialize_transaction(tx));
        }

        let mut data = Vec::with_capacity(payload.len() + 8);
        data.extend_from_slice(&BLOCK_MAGIC.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&payload);
        Ok(data)
    }
}

/// Human-readable hash rate (H/s, KH/s, MH/s, GH/s)
pub fn format_hash_rate(rate: f64) -> String {
    if rate >= 1_000_000_000.0 {
        format!("{:.2} GH/s", rate / 1_000_000_000.0)
    } else if rate >= 1_000_000.0 {
        format!("{:.2} MH/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2} KH/s", rate / 1_000.0)
    } else {
        format!("{:.2} H/s", rate)
    }
}

/// Nonce search over a block header.
///
/// With one worker the search runs on the calling thread. With more, the
/// remaining nonce range is split into contiguous slices, one per thread;
/// the first thread to hit the target raises a shared flag and the rest
/// stop at their next nonce.
#[derive(Debug, Clone)]
pub struct Miner {
    config: MiningConfig,
    cancel: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(config: MiningConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Shared flag; storing `true` stops any running search. The flag stays
    /// raised, so later searches on this miner fail immediately.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// MineBlock: search nonces from 0 upward.
    ///
    /// On success the winning nonce is stored in the header and the header
    /// hash (internal order) is returned. On failure the block is left
    /// untouched.
    pub fn mine(&self, block: &mut Block) -> Result<Hash> {
        self.mine_from(block, 0)
    }

    /// Same as [`Miner::mine`], starting at `start_nonce`.
    pub fn mine_from(&self, block: &mut Block, start_nonce: u32) -> Result<Hash> {
        block.check_merkle_root()?;
        let target = expand_target(block.header.bits)?;
        let started = Instant::now();
        debug!(
            pow_target = %target,
            workers = self.config.workers,
            start_nonce,
            "mining started"
        );

        let found = if self.config.workers <= 1 {
            let solved = AtomicBool::new(false);
            self.search(&block.header, &target, start_nonce..=u32::MAX, &solved)
        } else {
            self.search_parallel(&block.header, &target, start_nonce)
        };

        match found {
            Some((nonce, hash)) => {
                block.header.nonce = nonce;
                info!(
                    nonce,
                    hash = %to_display_hex(&hash),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "block mined"
                );
                Ok(hash)
            }
            None if self.cancel.load(Ordering::Relaxed) => Err(MinicoinError::MiningCancelled),
            None => Err(MinicoinError::NonceExhausted),
        }
    }

    /// Search a bounded nonce window for `header` without modifying it.
    pub fn mine_range(&self, header: &BlockHeader, nonces: RangeInclusive<u32>) -> Result<Option<(u32, Hash)>> {
        let target = expand_target(header.bits)?;
        let solved = AtomicBool::new(false);
        Ok(self.search(header, &target, nonces, &solved))
    }

    fn search_parallel(&self, header: &BlockHeader, target: &U256, start_nonce: u32) -> Option<(u32, Hash)> {
        let total = u32::MAX as u64 - start_nonce as u64 + 1;
        let workers = (self.config.workers as u64).min(total);
        let slice = total.div_ceil(workers);
        let solved = AtomicBool::new(false);

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let first = start_nonce as u64 + worker * slice;
                    let last = (first + slice - 1).min(u32::MAX as u64);
                    let solved = &solved;
                    scope.spawn(move || self.search(header, target, (first as u32)..=(last as u32), solved))
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok().flatten())
                .min_by_key(|&(nonce, _)| nonce)
        })
    }

    fn search(
        &self,
        template: &BlockHeader,
        target: &U256,
        nonces: RangeInclusive<u32>,
        solved: &AtomicBool,
    ) -> Option<(u32, Hash)> {
        let mut header = template.serialize();
        let interval = self.config.progress_interval.max(1);
        let started = Instant::now();
        let mut tried = 0u64;

        for nonce in nonces {
            if solved.load(Ordering::Relaxed) || self.cancel.load(Ordering::Relaxed) {
                return None;
            }

            header[76..80].copy_from_slice(&nonce.to_le_bytes());
            let hash = double_sha256(&header);
            tried += 1;

            if hash_meets_target(&hash, target) {
                solved.store(true, Ordering::Relaxed);
                return Some((nonce, hash));
            }

            if tried % interval == 0 {
                let secs = started.elapsed().as_secs_f64();
                let rate = if secs > 0.0 { tried as f64 / secs } else { 0.0 };
                debug!(nonce, tried, hash_rate = %format_hash_rate(rate), "mining progress");
            }
        }

        None
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(MiningConfig::default())
    }
}
