//! Core ledger types shared by every engine

use crate::constants::*;
use crate::error::{MinicoinError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hash type: 256-bit hash, stored in internal (hashing) byte order
pub type Hash = [u8; 32];

/// 160-bit content hash
pub type Hash160 = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Network selector carried explicitly by keys, addresses and builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
}

impl Network {
    /// Version byte prefixed to checksum-encoded payloads.
    ///
    /// | network | public | private |
    /// |---------|--------|---------|
    /// | Main    | 0x00   | 0x80    |
    /// | Test    | 0x6f   | 0xef    |
    pub fn version_byte(self, is_private: bool) -> u8 {
        match (self, is_private) {
            (Network::Main, false) => MAINNET_PUBKEY_VERSION,
            (Network::Test, false) => TESTNET_PUBKEY_VERSION,
            (Network::Main, true) => MAINNET_PRIVATE_VERSION,
            (Network::Test, true) => TESTNET_PRIVATE_VERSION,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Test
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = MinicoinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            other => Err(MinicoinError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Reference to a prior transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

/// Transaction input in wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

/// Transaction output in wire form; value in smallest units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_pubkey: ByteString,
}

/// Legacy (non-witness) transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

/// Block header; hashes kept in internal byte order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

/// Block: header plus ordered transaction body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}
