//! # Minicoin
//!
//! A from-scratch toolkit for the byte-level primitives of a UTXO ledger:
//! key pairs and checksum-protected addresses, a stack-based script
//! evaluator, legacy transaction building and signing, and block assembly
//! under a proof-of-work target.
//!
//! ## Architecture
//!
//! Data flows one way through the engines:
//! - Keys (`keys`) sign transaction inputs and provide default output conditions
//! - Transactions (`transaction`, `serialization`) are checked by the script engine (`script`)
//! - Finalized transactions become block bodies (`mining`, `pow`)
//!
//! Every engine is synchronous. The network is passed explicitly to each
//! constructor; there is no global selector.
//!
//! ## Usage
//!
//! ```rust
//! use minicoin::{Minicoin, Destination, UnspentOutput};
//!
//! let minicoin = Minicoin::default();
//! let (signer, address) = minicoin.generate_key_pair().unwrap();
//!
//! let mut builder = minicoin.transaction_builder(signer.clone()).unwrap();
//! builder.add_output(Destination::to_address(&address, 50_000));
//! builder.add_input(UnspentOutput::new([1; 32], 0, signer.p2pkh_script()));
//! let tx = builder.create().unwrap();
//! assert_eq!(tx.inputs.len(), 1);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod config;
pub mod hash;
pub mod encoding;
pub mod keys;
pub mod script;
pub mod serialization;
pub mod transaction;
pub mod pow;
pub mod mining;
pub mod broadcast;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{MinicoinError, Result};
pub use config::{BroadcastConfig, MiningConfig, MinicoinConfig};
pub use keys::{Address, KeyPair, VanityMatch};
pub use script::{Opcode, Script, ScriptOp};
pub use transaction::{Destination, TransactionBuilder, UnspentOutput};
pub use mining::Miner;
pub use pow::U256;
pub use broadcast::{BroadcastResponse, Broadcaster};

/// Entry point bundling a validated configuration with the engines.
///
/// # Examples
///
/// ```
/// use minicoin::{Minicoin, MinicoinConfig, Network};
///
/// let config = MinicoinConfig { network: Network::Main, ..MinicoinConfig::default() };
/// let minicoin = Minicoin::new(config).unwrap();
/// let (_, address) = minicoin.generate_key_pair().unwrap();
/// assert!(address.to_string().starts_with('1'));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Minicoin {
    config: MinicoinConfig,
}

impl Minicoin {
    pub fn new(config: MinicoinConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Defaults overridden by `MINICOIN_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(MinicoinConfig::from_env())
    }

    pub fn config(&self) -> &MinicoinConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn generate_key_pair(&self) -> Result<(KeyPair, Address)> {
        keys::generate(self.network())
    }

    /// Decode a WIF private key issued for the configured network
    pub fn import_private_key(&self, wif: &str) -> Result<KeyPair> {
        KeyPair::from_wif(wif, self.network())
    }

    pub fn decode_address(&self, address: &str) -> Result<Address> {
        Address::decode(address, self.network())
    }

    /// Generate key pairs until `predicate` accepts the address.
    pub fn search_vanity<P>(&self, predicate: P, max_tries: Option<u64>) -> Option<VanityMatch>
    where
        P: Fn(&Address) -> bool,
    {
        keys::search_vanity(self.network(), predicate, max_tries)
    }

    /// Builder signing with `signer`, which must belong to the configured network.
    pub fn transaction_builder(&self, signer: KeyPair) -> Result<TransactionBuilder> {
        if signer.network() != self.network() {
            return Err(MinicoinError::WrongNetwork {
                expected: self.network().version_byte(true),
                found: signer.network().version_byte(true),
            });
        }
        Ok(TransactionBuilder::new(signer))
    }

    pub fn verify_transaction(&self, tx: &Transaction, locking_scripts: &[Script]) -> Result<()> {
        transaction::verify_transaction(tx, locking_scripts)
    }

    /// Coinbase paying the default block reward to `address`
    pub fn coinbase(&self, address: &Address, data: &[u8]) -> Transaction {
        mining::coinbase_transaction(address, DEFAULT_BLOCK_REWARD, data)
    }

    /// Unmined block using the configured version and difficulty
    pub fn new_block(&self, transactions: Vec<Transaction>, prev_hash: &str, timestamp: u32) -> Result<Block> {
        let block = Block::new(transactions, prev_hash, timestamp, self.config.mining.default_bits)?;
        Ok(block.with_version(self.config.mining.block_version))
    }

    pub fn miner(&self) -> Miner {
        Miner::new(self.config.mining.clone())
    }

    pub fn mine_block(&self, block: &mut Block) -> Result<Hash> {
        self.miner().mine(block)
    }

    pub fn broadcaster(&self) -> Result<Broadcaster> {
        Broadcaster::new(&self.config.broadcast, self.network())
    }
}
