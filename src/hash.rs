//! Hash primitives shared by addresses, scripts, signing and mining

use crate::error::{MinicoinError, Result};
use crate::types::{Hash, Hash160};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA256 hash.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(data));
    hash
}

/// SHA256(SHA256(data)), used for transaction ids, signing digests,
/// merkle nodes, block hashes and checksums.
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// RIPEMD160(SHA256(data)), the content hash behind addresses and OP_HASH160.
pub fn hash160(data: &[u8]) -> Hash160 {
    let sha256_hash = Sha256::digest(data);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&Ripemd160::digest(sha256_hash));
    hash
}

/// Hex of a hash in display order (byte-reversed), as explorers print txids
/// and block hashes.
pub fn to_display_hex(hash: &Hash) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Inverse of [`to_display_hex`].
pub fn from_display_hex(s: &str) -> Result<Hash> {
    let bytes = hex::decode(s.trim()).map_err(|e| MinicoinError::DecodeError(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(MinicoinError::DecodeError(format!(
            "expected 32-byte hash, got {} bytes",
            bytes.len()
        )));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    hash.reverse();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_double_sha256_is_sha256_twice() {
        let data = b"hello";
        assert_eq!(double_sha256(data), sha256(&sha256(data)));
        assert_eq!(
            hex::encode(double_sha256(data)),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn test_hash160_known_vector() {
        // Generator point G, uncompressed
        let pubkey = hex::decode(
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
        )
        .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "91b24bf9f5288532960ac687abb035127b1d28a5"
        );
    }

    #[test]
    fn test_display_hex_reverses() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        let shown = to_display_hex(&hash);
        assert!(shown.ends_with("ab"));
        assert_eq!(from_display_hex(&shown).unwrap(), hash);
    }

    #[test]
    fn test_from_display_hex_wrong_length() {
        assert!(matches!(
            from_display_hex("abcd"),
            Err(MinicoinError::DecodeError(_))
        ));
        assert!(matches!(
            from_display_hex("zz"),
            Err(MinicoinError::DecodeError(_))
        ));
    }
}
