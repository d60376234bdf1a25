//! Protocol constants shared by the key, script, transaction and mining modules

/// Address version byte on the main network (P2PKH)
pub const MAINNET_PUBKEY_VERSION: u8 = 0x00;

/// Address version byte on the test network (P2PKH)
pub const TESTNET_PUBKEY_VERSION: u8 = 0x6f;

/// WIF version byte on the main network
pub const MAINNET_PRIVATE_VERSION: u8 = 0x80;

/// WIF version byte on the test network
pub const TESTNET_PRIVATE_VERSION: u8 = 0xef;

/// Suffix marking a WIF payload as belonging to a compressed public key
pub const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Number of checksum bytes appended by the base-58 check codec
pub const CHECKSUM_LEN: usize = 4;

/// Uncompressed SEC1 public key length (0x04 ∥ X ∥ Y)
pub const PUBLIC_KEY_LEN: usize = 65;

/// Sign-all hash type appended to signatures and to the signing preimage
pub const SIGHASH_ALL: u32 = 0x01;

/// Maximum stack size during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of non-push operations in a script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Maximum number of public keys in a multisig condition
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Maximum byte length of a numeric script operand
pub const MAX_SCRIPT_NUM_LEN: usize = 4;

/// Default transaction version
pub const TX_VERSION: i32 = 1;

/// Sequence number for final inputs
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Output index used by the coinbase input
pub const COINBASE_INDEX: u32 = 0xffffffff;

/// Smallest units per coin
pub const SATOSHIS_PER_BTC: u64 = 100_000_000;

/// Default coinbase reward: 6.25 coins
pub const DEFAULT_BLOCK_REWARD: u64 = 625_000_000;

/// Block header version used when none is given
pub const BLOCK_VERSION: i32 = 2;

/// Default compact difficulty: 16 leading zero bits
pub const DEFAULT_BITS: u32 = 0x1f010000;

/// Block header length in bytes
pub const BLOCK_HEADER_LEN: usize = 80;

/// Network magic prefixed to serialized blocks
pub const BLOCK_MAGIC: u32 = 0xD9B4BEF9;

/// Largest transaction count representable by the single count byte
pub const MAX_BLOCK_TRANSACTIONS: usize = 255;
