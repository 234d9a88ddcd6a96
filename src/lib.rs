//! Zerocoin Engine
//!
//! Anonymous mint and spend of fixed-denomination coins:
//! - Per-denomination accumulators with immutable, checksummed checkpoints
//! - Mint registry and the spent serial number set
//! - Ring membership proofs binding a serial to a spend type and transaction
//! - Orchestration of minting, block ingestion, spend construction and acceptance

pub mod accumulator;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod selection;
pub mod spend;
pub mod state;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use accumulator::{Accumulator, AccumulatorChecksum, AccumulatorSnapshot, Witness};
pub use config::ZerocoinConfig;
pub use crypto::{generate_coin_secret, CoinSecret, PublicValue, SerialNumber};
pub use error::{Result, ZerocoinError};
pub use orchestrator::{
    BlockReport, ConfirmedMint, MintSpendOrchestrator, PendingMint, SpendReceipt,
    SpendTransaction,
};
pub use registry::{MintMeta, MintRegistry, MintState, SerialLink};
pub use selection::{CoinSelector, DecomposingSelector, ExactDenominationSelector, Selection};
pub use spend::{SpendAttempt, SpendProof, SpendState, TransactionContext};
pub use state::ZerocoinState;
pub use types::{BlockHeight, Denomination, Hash, SpendType, TxID, ZQ_6666};
pub use wallet::{CoinSecretStore, InMemoryCoinStore};
