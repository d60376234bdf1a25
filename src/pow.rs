//! Proof of work: compact difficulty, 256-bit targets and header hashing

use crate::constants::BLOCK_HEADER_LEN;
use crate::error::{MinicoinError, Result};
use crate::hash::double_sha256;
use crate::types::*;
use std::cmp::Ordering;
use std::fmt;

/// 256-bit unsigned integer for target comparisons.
///
/// Limbs are little-endian: `0[0]` holds the least significant 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0; 4]);
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub fn from_u32(value: u32) -> Self {
        U256([value as u64, 0, 0, 0])
    }

    pub fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&x| x == 0)
    }

    /// Number of significant bits
    pub fn bits(&self) -> u32 {
        for (i, &word) in self.0.iter().enumerate().rev() {
            if word != 0 {
                return 64 * i as u32 + (64 - word.leading_zeros());
            }
        }
        0
    }

    /// Shift left; bits past 256 are discarded.
    pub fn shl(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }

        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;

        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }

        result
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }

        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;

        for i in word_shift..4 {
            result.0[i - word_shift] |= self.0[i] >> bit_shift;
            if bit_shift > 0 && i > word_shift {
                result.0[i - word_shift - 1] |= self.0[i] << (64 - bit_shift);
            }
        }

        result
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *word = u64::from_be_bytes(chunk);
        }
        U256(words)
    }

    /// Interpret a hash digest as a little-endian number (the display
    /// byte order read as big-endian).
    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        let mut reversed = *bytes;
        reversed.reverse();
        Self::from_be_bytes(&reversed)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, &word) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            bytes[start..start + 8].copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_be_bytes()))
    }
}

/// Parse compact bits written as hex, with or without a `0x` prefix.
pub fn parse_compact_bits(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16)
        .map_err(|e| MinicoinError::InvalidTarget(format!("{:?}: {}", text, e)))
}

/// Expand target from compact representation
///
/// The format is 0xEEMMMMMM where:
/// - EE is the exponent
/// - MMMMMM is the 3-byte coefficient
///
/// Target = coefficient * 2^(8 * (exponent - 3)); exponents below 3 shift
/// the coefficient right instead.
pub fn expand_target(bits: u32) -> Result<U256> {
    let exponent = bits >> 24;
    let coefficient = U256::from_u32(bits & 0x00ff_ffff);

    if coefficient.is_zero() {
        return Ok(U256::ZERO);
    }

    if exponent <= 3 {
        return Ok(coefficient.shr(8 * (3 - exponent)));
    }

    let shift = 8 * (exponent - 3);
    if coefficient.bits() + shift > 256 {
        return Err(MinicoinError::InvalidTarget(format!(
            "compact bits {:#010x} exceed 256 bits",
            bits
        )));
    }
    Ok(coefficient.shl(shift))
}

impl BlockHeader {
    /// Fixed 80-byte header layout.
    ///
    /// version(4) ∥ prev hash(32) ∥ merkle root(32) ∥ timestamp(4) ∥ bits(4) ∥ nonce(4)
    ///
    /// Hashes are written in internal order, i.e. reversed relative to
    /// their display hex.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_LEN] {
        let mut bytes = [0u8; BLOCK_HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..36].copy_from_slice(&self.prev_block_hash);
        bytes[36..68].copy_from_slice(&self.merkle_root);
        bytes[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[72..76].copy_from_slice(&self.bits.to_le_bytes());
        bytes[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    /// Double SHA256 of the serialized header (internal order)
    pub fn hash(&self) -> Hash {
        double_sha256(&self.serialize())
    }
}

/// True when `hash` (internal order) is numerically below `target`.
pub fn hash_meets_target(hash: &Hash, target: &U256) -> bool {
    U256::from_le_bytes(hash) < *target
}

/// CheckProofOfWork: SHA256(SHA256(header)) < ExpandTarget(header.bits)
pub fn check_proof_of_work(header: &BlockHeader) -> Result<bool> {
    let target = expand_target(header.bits)?;
    Ok(hash_meets_target(&header.hash(), &target))
}
