//! Spend acceptance against accumulator and registry state

use crate::accumulator::Accumulator;
use crate::error::{Result, ZerocoinError};
use crate::registry::MintRegistry;

use super::proof::verify_proof;
use super::types::{ProofStatement, SpendProof};

/// Decide whether a spend proof is acceptable right now.
///
/// Checks, in order: the referenced checkpoint is known
/// (`UnknownAccumulatorChecksum`), the proof is valid for the verifier's
/// statement (`BadProof`), and the serial is unspent (`SerialAlreadySpent`).
pub fn verify_spend(
    proof: &SpendProof,
    statement: &ProofStatement,
    accumulator: &Accumulator,
    registry: &MintRegistry,
) -> Result<()> {
    let snapshot = accumulator.snapshot(&proof.checksum)?;

    if let Err(err) = verify_proof(proof, &snapshot, statement) {
        tracing::warn!("Rejected spend of serial {}: {}", proof.serial, err);
        return Err(err);
    }

    if registry.is_serial_spent(&proof.serial) {
        tracing::warn!("Rejected replay of spent serial {}", proof.serial);
        return Err(ZerocoinError::SerialAlreadySpent(proof.serial.to_hex()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_coin_secret;
    use crate::spend::proof::construct_proof;
    use crate::spend::types::TransactionContext;
    use crate::types::{Denomination, SpendType};

    #[test]
    fn test_verify_spend_reason_codes() {
        let secret = generate_coin_secret(Denomination::Fifty);
        let mut accumulator = Accumulator::new(1);
        accumulator
            .add(Denomination::Fifty, &secret.public_value())
            .unwrap();
        accumulator.checkpoint(10).unwrap();

        let snapshot = accumulator.latest_checkpoint(Denomination::Fifty).unwrap();
        let witness = snapshot.compute_witness(&secret.public_value()).unwrap();
        let statement = ProofStatement {
            spend_type: SpendType::Spend,
            context: TransactionContext::new(50).commitment(),
        };
        let proof = construct_proof(&secret, &witness, &snapshot, &statement).unwrap();

        let mut registry = MintRegistry::new();
        verify_spend(&proof, &statement, &accumulator, &registry).unwrap();

        let wrong_type = ProofStatement {
            spend_type: SpendType::SignMessage,
            ..statement
        };
        assert!(matches!(
            verify_spend(&proof, &wrong_type, &accumulator, &registry),
            Err(ZerocoinError::BadProof(_))
        ));

        registry.mark_spent(&proof.serial).unwrap();
        assert!(matches!(
            verify_spend(&proof, &statement, &accumulator, &registry),
            Err(ZerocoinError::SerialAlreadySpent(_))
        ));

        accumulator
            .add(
                Denomination::Fifty,
                &generate_coin_secret(Denomination::Fifty).public_value(),
            )
            .unwrap();
        accumulator.checkpoint(20).unwrap();
        assert!(matches!(
            verify_spend(&proof, &statement, &accumulator, &registry),
            Err(ZerocoinError::UnknownAccumulatorChecksum(_))
        ));
    }
}
