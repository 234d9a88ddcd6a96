//! Spend proof types and the per-attempt state machine states

use crate::accumulator::{AccumulatorChecksum, Witness};
use crate::crypto::SerialNumber;
use crate::error::ZerocoinError;
use crate::types::{Denomination, Hash, SpendType};
use serde::{Deserialize, Serialize};

const CONTEXT_TAG: &[u8] = b"zerocoin/spend/context";

/// Enclosing transaction data a spend proof commits to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub amount: u64,
    pub fee: u64,
    /// Value returned to the spender, to be re-minted
    pub change: u64,
    /// Commitments to the transaction outputs
    pub outputs: Vec<Hash>,
    pub memo: String,
}

impl TransactionContext {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: Hash) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_change(mut self, change: u64) -> Self {
        self.change = change;
        self
    }

    /// Value the spent coins must add up to, or `None` on overflow
    pub fn total_out(&self) -> Option<u64> {
        self.amount.checked_add(self.fee)?.checked_add(self.change)
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Binding commitment to every field of the context
    pub fn commitment(&self) -> Hash {
        let amount = self.amount.to_be_bytes();
        let fee = self.fee.to_be_bytes();
        let change = self.change.to_be_bytes();
        let count = (self.outputs.len() as u64).to_be_bytes();
        let memo_len = (self.memo.len() as u64).to_be_bytes();

        let mut parts: Vec<&[u8]> = vec![CONTEXT_TAG, &amount[..], &fee[..], &change[..], &count[..]];
        for output in &self.outputs {
            parts.push(&output.0);
        }
        parts.push(&memo_len[..]);
        parts.push(self.memo.as_bytes());
        Hash::from_parts(&parts)
    }
}

/// Public statement a proof is checked against, supplied by the verifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofStatement {
    pub spend_type: SpendType,
    pub context: Hash,
}

/// Ring proof and trapdoor signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBlob {
    /// Ring challenge at index zero
    pub challenge: [u8; 32],
    /// One response per ring member
    pub responses: Vec<[u8; 32]>,
    /// Schnorr nonce commitment for the trapdoor signature
    pub signature_nonce: [u8; 32],
    pub signature_response: [u8; 32],
}

/// Zero-knowledge proof that the spender owns some coin in a checkpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendProof {
    pub version: u8,
    pub serial: SerialNumber,
    pub spend_type: SpendType,
    pub denomination: Denomination,
    pub checksum: AccumulatorChecksum,
    /// Commitment to the enclosing transaction context
    pub context: Hash,
    /// Public half of the coin trapdoor; the serial is derived from it
    pub trapdoor_public: [u8; 32],
    pub blob: ProofBlob,
}

impl SpendProof {
    /// Statement exactly as this proof declares it
    pub fn declared_statement(&self) -> ProofStatement {
        ProofStatement {
            spend_type: self.spend_type,
            context: self.context,
        }
    }
}

/// Why a verified proof was not accepted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    BadProof,
    UnknownAccumulatorChecksum,
    SerialAlreadySpent,
}

impl RejectReason {
    /// Reason code for a verification error, if it is one
    pub fn from_error(err: &ZerocoinError) -> Option<Self> {
        match err {
            ZerocoinError::BadProof(_) => Some(RejectReason::BadProof),
            ZerocoinError::UnknownAccumulatorChecksum(_) => {
                Some(RejectReason::UnknownAccumulatorChecksum)
            }
            ZerocoinError::SerialAlreadySpent(_) => Some(RejectReason::SerialAlreadySpent),
            _ => None,
        }
    }
}

/// Spend attempt state machine
#[derive(Clone, Debug)]
pub enum SpendState {
    Unstarted,
    WitnessComputed { witness: Witness },
    ProofConstructed { witness: Witness, proof: SpendProof },
    Verified { proof: SpendProof },
    Rejected { reason: RejectReason },
}

impl SpendState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SpendState::Verified { .. } | SpendState::Rejected { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpendState::Unstarted => "unstarted",
            SpendState::WitnessComputed { .. } => "witness-computed",
            SpendState::ProofConstructed { .. } => "proof-constructed",
            SpendState::Verified { .. } => "verified",
            SpendState::Rejected { .. } => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_commitment_binds_fields() {
        let base = TransactionContext::new(10).with_output(Hash::from_bytes(b"out"));

        assert_eq!(base.commitment(), base.clone().commitment());
        assert_ne!(base.commitment(), base.clone().with_fee(1).commitment());
        assert_ne!(base.commitment(), base.clone().with_change(1).commitment());
        assert_ne!(base.commitment(), base.clone().with_memo("hi").commitment());
        assert_ne!(
            base.commitment(),
            TransactionContext::new(11)
                .with_output(Hash::from_bytes(b"out"))
                .commitment()
        );
    }

    #[test]
    fn test_context_total_out() {
        let context = TransactionContext::new(10).with_fee(2).with_change(3);
        assert_eq!(context.total_out(), Some(15));
        assert_eq!(TransactionContext::new(u64::MAX).with_fee(1).total_out(), None);
    }

    #[test]
    fn test_state_terminal() {
        assert!(!SpendState::Unstarted.is_terminal());
        assert!(SpendState::Rejected {
            reason: RejectReason::BadProof
        }
        .is_terminal());
    }

    #[test]
    fn test_reject_reason_mapping() {
        assert_eq!(
            RejectReason::from_error(&ZerocoinError::SerialAlreadySpent("s".into())),
            Some(RejectReason::SerialAlreadySpent)
        );
        assert_eq!(
            RejectReason::from_error(&ZerocoinError::DoubleSpend("s".into())),
            None
        );
    }
}
