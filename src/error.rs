//! Error types for key derivation, transaction building and mining

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinicoinError {
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Wrong network: expected version byte {expected:#04x}, found {found:#04x}")]
    WrongNetwork { expected: u8, found: u8 },

    #[error("Transaction has no destination")]
    MissingDestination,

    #[error("Transaction has no input")]
    MissingInput,

    #[error("Input index {0} out of range")]
    InputIndexOutOfRange(usize),

    #[error("Script execution failed: {0}")]
    ScriptFailed(String),

    #[error("Verification failed for input {0}")]
    VerificationFailed(usize),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Nonce space exhausted without finding a valid hash")]
    NonceExhausted,

    #[error("Mining cancelled")]
    MiningCancelled,

    #[error("Block holds {0} transactions, at most 255 fit the count byte")]
    TooManyTransactions(usize),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),
}

pub type Result<T> = std::result::Result<T, MinicoinError>;
