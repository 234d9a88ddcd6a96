//! Spend attempt state machine

use crate::accumulator::{Accumulator, AccumulatorSnapshot, Witness};
use crate::crypto::{CoinSecret, PublicValue};
use crate::error::{Result, ZerocoinError};
use crate::registry::MintRegistry;
use crate::types::{Denomination, SpendType};

use super::engine::verify_spend;
use super::proof::construct_proof;
use super::types::{ProofStatement, RejectReason, SpendProof, SpendState, TransactionContext};

/// One attempt to spend one coin
#[derive(Clone, Debug)]
pub struct SpendAttempt {
    public_value: PublicValue,
    denomination: Denomination,
    statement: ProofStatement,
    state: SpendState,
}

impl SpendAttempt {
    /// Start an attempt for a coin, bound to a spend type and transaction context
    pub fn new(
        public_value: PublicValue,
        denomination: Denomination,
        spend_type: SpendType,
        context: &TransactionContext,
    ) -> Self {
        Self {
            public_value,
            denomination,
            statement: ProofStatement {
                spend_type,
                context: context.commitment(),
            },
            state: SpendState::Unstarted,
        }
    }

    pub fn public_value(&self) -> &PublicValue {
        &self.public_value
    }

    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    pub fn statement(&self) -> &ProofStatement {
        &self.statement
    }

    pub fn state(&self) -> &SpendState {
        &self.state
    }

    pub fn witness(&self) -> Option<&Witness> {
        match &self.state {
            SpendState::WitnessComputed { witness } | SpendState::ProofConstructed { witness, .. } => {
                Some(witness)
            }
            _ => None,
        }
    }

    pub fn proof(&self) -> Option<&SpendProof> {
        match &self.state {
            SpendState::ProofConstructed { proof, .. } | SpendState::Verified { proof } => {
                Some(proof)
            }
            _ => None,
        }
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(ZerocoinError::InvalidStateTransition(format!(
                "cannot {} from {} state",
                action,
                self.state.name()
            )));
        }
        Ok(())
    }

    /// Compute the membership witness against a checkpoint.
    ///
    /// Allowed from any non-terminal state; recomputing against a newer
    /// checkpoint discards an earlier proof. On failure the state is unchanged.
    pub fn compute_witness(&mut self, snapshot: &AccumulatorSnapshot) -> Result<&Witness> {
        self.ensure_active("compute witness")?;
        if snapshot.denomination != self.denomination {
            return Err(ZerocoinError::InvalidDenomination(snapshot.denomination.value()));
        }

        let witness = snapshot.compute_witness(&self.public_value)?;
        self.state = SpendState::WitnessComputed { witness };

        match &self.state {
            SpendState::WitnessComputed { witness } => Ok(witness),
            _ => Err(ZerocoinError::Internal("witness state lost".to_string())),
        }
    }

    /// Construct the proof. Requires a computed witness; on failure the state is unchanged.
    pub fn construct_proof(
        &mut self,
        secret: &CoinSecret,
        snapshot: &AccumulatorSnapshot,
    ) -> Result<&SpendProof> {
        let witness = match &self.state {
            SpendState::WitnessComputed { witness } => witness.clone(),
            other => {
                return Err(ZerocoinError::InvalidStateTransition(format!(
                    "cannot construct proof from {} state",
                    other.name()
                )))
            }
        };

        let proof = construct_proof(secret, &witness, snapshot, &self.statement)?;
        self.state = SpendState::ProofConstructed { witness, proof };

        self.proof()
            .ok_or_else(|| ZerocoinError::Internal("proof state lost".to_string()))
    }

    /// Verify the constructed proof and record the outcome.
    ///
    /// Verification failures move the attempt to `Rejected` and are returned
    /// as errors; they are never reported as success.
    pub fn verify(&mut self, accumulator: &Accumulator, registry: &MintRegistry) -> Result<()> {
        let proof = match &self.state {
            SpendState::ProofConstructed { proof, .. } => proof.clone(),
            other => {
                return Err(ZerocoinError::InvalidStateTransition(format!(
                    "cannot verify from {} state",
                    other.name()
                )))
            }
        };

        match verify_spend(&proof, &self.statement, accumulator, registry) {
            Ok(()) => {
                self.state = SpendState::Verified { proof };
                Ok(())
            }
            Err(err) => {
                if let Some(reason) = RejectReason::from_error(&err) {
                    self.state = SpendState::Rejected { reason };
                }
                Err(err)
            }
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, SpendState::Verified { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.state, SpendState::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_coin_secret;

    struct Setup {
        secret: CoinSecret,
        accumulator: Accumulator,
        registry: MintRegistry,
    }

    fn setup() -> Setup {
        let secret = generate_coin_secret(Denomination::Ten);
        let mut accumulator = Accumulator::new(10);
        accumulator
            .add(Denomination::Ten, &secret.public_value())
            .unwrap();
        for _ in 0..2 {
            accumulator
                .add(
                    Denomination::Ten,
                    &generate_coin_secret(Denomination::Ten).public_value(),
                )
                .unwrap();
        }
        accumulator.checkpoint(10).unwrap();
        Setup {
            secret,
            accumulator,
            registry: MintRegistry::new(),
        }
    }

    fn attempt(secret: &CoinSecret, spend_type: SpendType) -> SpendAttempt {
        SpendAttempt::new(
            secret.public_value(),
            Denomination::Ten,
            spend_type,
            &TransactionContext::new(10),
        )
    }

    #[test]
    fn test_full_transition_sequence() {
        let s = setup();
        let snapshot = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let mut a = attempt(&s.secret, SpendType::Spend);

        assert!(matches!(a.state(), SpendState::Unstarted));
        a.compute_witness(&snapshot).unwrap();
        assert!(matches!(a.state(), SpendState::WitnessComputed { .. }));
        a.construct_proof(&s.secret, &snapshot).unwrap();
        assert!(matches!(a.state(), SpendState::ProofConstructed { .. }));
        a.verify(&s.accumulator, &s.registry).unwrap();
        assert!(a.is_verified());
        assert!(a.proof().is_some());
    }

    #[test]
    fn test_proof_requires_witness() {
        let s = setup();
        let snapshot = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let mut a = attempt(&s.secret, SpendType::Spend);

        let result = a.construct_proof(&s.secret, &snapshot);
        assert!(matches!(result, Err(ZerocoinError::InvalidStateTransition(_))));
        assert!(matches!(a.state(), SpendState::Unstarted));
    }

    #[test]
    fn test_witness_for_unaccumulated_coin() {
        let s = setup();
        let snapshot = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let outsider = generate_coin_secret(Denomination::Ten);
        let mut a = attempt(&outsider, SpendType::Spend);

        assert!(matches!(
            a.compute_witness(&snapshot),
            Err(ZerocoinError::CoinNotInAccumulator(_))
        ));
        assert!(matches!(a.state(), SpendState::Unstarted));
    }

    #[test]
    fn test_failed_construction_leaves_state() {
        let s = setup();
        let snapshot = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let mut a = attempt(&s.secret, SpendType::Spend);
        a.compute_witness(&snapshot).unwrap();

        let wrong_secret = generate_coin_secret(Denomination::Ten);
        assert!(a.construct_proof(&wrong_secret, &snapshot).is_err());
        assert!(matches!(a.state(), SpendState::WitnessComputed { .. }));
        assert!(a.proof().is_none());
    }

    #[test]
    fn test_spent_serial_rejected() {
        let mut s = setup();
        let snapshot = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let mut a = attempt(&s.secret, SpendType::Spend);
        a.compute_witness(&snapshot).unwrap();
        a.construct_proof(&s.secret, &snapshot).unwrap();

        s.registry.mark_spent(&s.secret.serial_number()).unwrap();

        assert!(matches!(
            a.verify(&s.accumulator, &s.registry),
            Err(ZerocoinError::SerialAlreadySpent(_))
        ));
        assert!(matches!(
            a.state(),
            SpendState::Rejected {
                reason: RejectReason::SerialAlreadySpent
            }
        ));
    }

    #[test]
    fn test_terminal_state_blocks_transitions() {
        let s = setup();
        let snapshot = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let mut a = attempt(&s.secret, SpendType::Stake);
        a.compute_witness(&snapshot).unwrap();
        a.construct_proof(&s.secret, &snapshot).unwrap();
        a.verify(&s.accumulator, &s.registry).unwrap();

        assert!(matches!(
            a.compute_witness(&snapshot),
            Err(ZerocoinError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            a.verify(&s.accumulator, &s.registry),
            Err(ZerocoinError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn test_recompute_witness_discards_proof() {
        let mut s = setup();
        let old = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();
        let mut a = attempt(&s.secret, SpendType::Spend);
        a.compute_witness(&old).unwrap();
        a.construct_proof(&s.secret, &old).unwrap();

        s.accumulator
            .add(
                Denomination::Ten,
                &generate_coin_secret(Denomination::Ten).public_value(),
            )
            .unwrap();
        s.accumulator.checkpoint(20).unwrap();
        let fresh = s.accumulator.latest_checkpoint(Denomination::Ten).unwrap();

        let witness = a.compute_witness(&fresh).unwrap();
        assert_eq!(witness.checksum, fresh.checksum);
        assert!(a.proof().is_none());
    }
}
