//! Key pair generation, WIF private keys and P2PKH addresses

use crate::constants::*;
use crate::encoding::{checksum_decode, checksum_encode};
use crate::error::{MinicoinError, Result};
use crate::hash::hash160;
use crate::script::Script;
use crate::types::{Hash, Hash160, Network};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use tracing::{debug, info};

/// secp256k1 key pair bound to a network.
///
/// Only the secret scalar is stored; the public point is derived from it on
/// construction and can never disagree with it.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    network: Network,
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Draw 32 random bytes from the OS and derive the public point.
    ///
    /// A draw outside the curve order fails with `InvalidKey`; callers may
    /// simply try again.
    pub fn generate(network: Network) -> Result<Self> {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::from_secret_bytes(network, &secret)
    }

    /// Build a key pair from a known 32-byte secret scalar.
    pub fn from_secret_bytes(network: Network, secret: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_slice(secret)
            .map_err(|e| MinicoinError::InvalidKey(e.to_string()))?;
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self { network, secret, public })
    }

    /// Decode a WIF string, checking it was issued for `network`.
    pub fn from_wif(wif: &str, network: Network) -> Result<Self> {
        let payload = checksum_decode(wif)?;
        let expected = network.version_byte(true);

        let (&found, body) = payload
            .split_first()
            .ok_or_else(|| MinicoinError::DecodeError("empty WIF payload".to_string()))?;
        if found != expected {
            return Err(MinicoinError::WrongNetwork { expected, found });
        }

        let scalar = match body.len() {
            32 => body,
            33 if body[32] == WIF_COMPRESSED_FLAG => &body[..32],
            n => {
                return Err(MinicoinError::DecodeError(format!(
                    "WIF payload holds {} key bytes",
                    n
                )))
            }
        };

        let mut secret = [0u8; 32];
        secret.copy_from_slice(scalar);
        Self::from_secret_bytes(network, &secret)
    }

    /// WIF encoding: `checksum_encode(version(network, private) ∥ scalar)`.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(33);
        payload.push(self.network.version_byte(true));
        payload.extend_from_slice(&self.secret.secret_bytes());
        checksum_encode(&payload)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    /// Uncompressed SEC1 public key: 0x04 ∥ X ∥ Y.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public.serialize_uncompressed()
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self.network, &self.public_key())
    }

    /// Standard locking script paying to this key's address.
    pub fn p2pkh_script(&self) -> Script {
        self.address().p2pkh_script()
    }

    /// DER-encoded ECDSA signature over a 32-byte digest.
    pub fn sign_digest(&self, digest: &Hash) -> Vec<u8> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(*digest);
        let signature: Signature = secp.sign_ecdsa(&message, &self.secret);
        signature.serialize_der().to_vec()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("network", &self.network)
            .field("public", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Network-tagged 20-byte content hash of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    hash: Hash160,
}

impl Address {
    pub fn from_public_key(network: Network, public_key: &[u8]) -> Self {
        Self { network, hash: hash160(public_key) }
    }

    pub fn from_hash(network: Network, hash: Hash160) -> Self {
        Self { network, hash }
    }

    /// Decode a base-58 check address, requiring the version byte of `network`.
    pub fn decode(encoded: &str, network: Network) -> Result<Self> {
        let payload = checksum_decode(encoded)?;
        if payload.len() != 21 {
            return Err(MinicoinError::DecodeError(format!(
                "address payload is {} bytes, expected 21",
                payload.len()
            )));
        }

        let expected = network.version_byte(false);
        if payload[0] != expected {
            return Err(MinicoinError::WrongNetwork { expected, found: payload[0] });
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        Ok(Self { network, hash })
    }

    /// `checksum_encode(version(network, public) ∥ hash160)`.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.network.version_byte(false));
        payload.extend_from_slice(&self.hash);
        checksum_encode(&payload)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn hash(&self) -> &Hash160 {
        &self.hash
    }

    /// OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh_script(&self) -> Script {
        Script::p2pkh_locking(&self.hash)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Generate a fresh key pair and its address.
pub fn generate(network: Network) -> Result<(KeyPair, Address)> {
    let key_pair = KeyPair::generate(network)?;
    let address = key_pair.address();
    debug!(%network, %address, "generated key pair");
    Ok((key_pair, address))
}

/// Result of a vanity search
#[derive(Debug, Clone)]
pub struct VanityMatch {
    pub key_pair: KeyPair,
    pub address: Address,
    pub tries: u64,
}

/// Predicate matching addresses whose text after the network character
/// starts with `prefix`.
pub fn prefix_predicate(prefix: &str) -> impl Fn(&Address) -> bool + '_ {
    move |address| {
        let encoded = address.encode();
        encoded.get(1..).map_or(false, |rest| rest.starts_with(prefix))
    }
}

/// Generate key pairs until `predicate` accepts the address.
///
/// Draws rejected with `InvalidKey` count as tries and are retried. Returns
/// `None` once `max_tries` draws have failed to match; passing
/// `max_tries = None` searches without bound.
pub fn search_vanity<P>(network: Network, predicate: P, max_tries: Option<u64>) -> Option<VanityMatch>
where
    P: Fn(&Address) -> bool,
{
    let mut tries = 0u64;
    loop {
        if max_tries.map_or(false, |max| tries >= max) {
            debug!(tries, "vanity search gave up");
            return None;
        }
        tries += 1;

        let key_pair = match KeyPair::generate(network) {
            Ok(key_pair) => key_pair,
            Err(_) => continue,
        };
        let address = key_pair.address();
        if predicate(&address) {
            info!(%address, tries, "vanity address found");
            return Some(VanityMatch { key_pair, address, tries });
        }
        if tries % 10_000 == 0 {
            debug!(tries, "vanity search progress");
        }
    }
}
