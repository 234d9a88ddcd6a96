//! Per-denomination coin accumulators
//!
//! Each denomination accumulates `A = Σ H(C_i)` over its coin public values, an
//! elliptic-curve multiset hash. Addition is commutative, so two validators
//! ingesting the same coins in any order derive the same value and checksum.

pub mod ledger;
pub mod snapshot;
pub mod types;

pub use ledger::{Accumulator, PersistedAccumulator, PersistedCheckpoint};
pub use snapshot::{compute_witness, AccumulatorSnapshot, Witness};
pub use types::{member_point, AccumulatorChecksum, AccumulatorValue};
