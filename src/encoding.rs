//! Base-58 check codec used for addresses and WIF private keys
//!
//! Encoding: `base58(payload ∥ double_sha256(payload)[..4])`. Leading zero
//! bytes survive as leading `1` characters.

use crate::constants::CHECKSUM_LEN;
use crate::error::{MinicoinError, Result};
use crate::hash::double_sha256;

/// Append the 4-byte checksum and encode with the base-58 alphabet.
pub fn checksum_encode(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&double_sha256(payload)[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decode base-58 text and strip a verified checksum.
///
/// Fails with `DecodeError` on characters outside the alphabet or input too
/// short to hold a checksum, and with `ChecksumMismatch` when the trailing
/// four bytes do not match the payload.
pub fn checksum_decode(encoded: &str) -> Result<Vec<u8>> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| MinicoinError::DecodeError(e.to_string()))?;

    if data.len() < CHECKSUM_LEN {
        return Err(MinicoinError::DecodeError(format!(
            "{} bytes is too short for a checksum",
            data.len()
        )));
    }

    let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if checksum != &double_sha256(payload)[..CHECKSUM_LEN] {
        return Err(MinicoinError::ChecksumMismatch);
    }

    Ok(payload.to_vec())
}
