//! Spend proof engine

pub mod engine;
pub mod proof;
pub mod session;
pub mod types;

pub use engine::verify_spend;
pub use proof::{construct_proof, proof_digest, verify_proof};
pub use session::SpendAttempt;
pub use types::{
    ProofBlob, ProofStatement, RejectReason, SpendProof, SpendState, TransactionContext,
};
