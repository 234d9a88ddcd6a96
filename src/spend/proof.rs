//! Spend proof construction and verification
//!
//! The spender reveals the serial `S` and proves knowledge of `r` such that
//! `C_j - S·G = r·H` for some member `C_j` of the checkpoint ring, using an
//! AOS one-of-many Schnorr proof. A Schnorr signature under the trapdoor key
//! `K` (with `S = H(K)`) then binds the ring proof to the same transcript.
//! The transcript commits to the spend type, denomination, checksum, serial,
//! context commitment, `K` and every ring member.

use crate::accumulator::{AccumulatorSnapshot, Witness};
use crate::crypto::{
    derive_serial, generator_h, hash_to_scalar, serial_matches_trapdoor, CoinSecret,
    SerialNumber, COIN_VERSION,
};
use crate::error::{Result, ZerocoinError};
use crate::types::Hash;
use blake2::{Blake2b512, Digest};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use super::types::{ProofBlob, ProofStatement, SpendProof};

const TRANSCRIPT_TAG: &[u8] = b"zerocoin/spend/transcript/v2";
const RING_TAG: &[u8] = b"zerocoin/spend/ring";
const SIGNATURE_TAG: &[u8] = b"zerocoin/spend/signature";

/// Digest of everything the proof is bound to
fn transcript(
    statement: &ProofStatement,
    snapshot: &AccumulatorSnapshot,
    serial: &SerialNumber,
    trapdoor_public: &[u8; 32],
) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(TRANSCRIPT_TAG);
    hasher.update([statement.spend_type.as_byte()]);
    hasher.update([snapshot.denomination.as_byte()]);
    hasher.update(snapshot.checksum.0 .0);
    hasher.update(serial.0);
    hasher.update(statement.context.0);
    hasher.update(trapdoor_public);
    hasher.update((snapshot.len() as u64).to_be_bytes());
    for member in snapshot.members() {
        hasher.update(member.as_bytes());
    }

    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn ring_challenge(message: &[u8; 64], commitment: &RistrettoPoint) -> Scalar {
    hash_to_scalar(RING_TAG, &[message, commitment.compress().as_bytes()])
}

fn signature_challenge(message: &[u8; 64], nonce: &[u8; 32], ring_challenge: &[u8; 32]) -> Scalar {
    hash_to_scalar(SIGNATURE_TAG, &[message, nonce, ring_challenge])
}

/// Ring elements `C_i - S·G`; the spender knows the discrete log of exactly one to base `H`
fn shifted_ring(snapshot: &AccumulatorSnapshot, serial: &Scalar) -> Result<Vec<RistrettoPoint>> {
    let offset = serial * RISTRETTO_BASEPOINT_POINT;
    Ok(snapshot.ring()?.into_iter().map(|c| c - offset).collect())
}

/// Construct a spend proof for `secret` against `snapshot`.
///
/// Pure: on failure nothing is retained, and every nonce is drawn fresh.
pub fn construct_proof(
    secret: &CoinSecret,
    witness: &Witness,
    snapshot: &AccumulatorSnapshot,
    statement: &ProofStatement,
) -> Result<SpendProof> {
    let public_value = secret.public_value();
    if witness.public_value != public_value || !witness.verify(snapshot) {
        return Err(ZerocoinError::CoinNotInAccumulator(format!(
            "witness for {} does not match checkpoint {}",
            public_value.short(),
            snapshot.checksum.short()
        )));
    }
    if secret.denomination() != snapshot.denomination {
        return Err(ZerocoinError::InvalidDenomination(secret.denomination().value()));
    }

    let serial = secret.serial_number();
    let trapdoor_point = secret.trapdoor_public();
    let trapdoor_public = trapdoor_point.compress().to_bytes();
    let message = transcript(statement, snapshot, &serial, &trapdoor_public);

    let ring = shifted_ring(snapshot, &secret.serial)?;
    let n = ring.len();
    let j = witness.index;
    let h = generator_h();

    let mut rng = OsRng;
    let mut challenges = vec![Scalar::ZERO; n];
    let mut responses = vec![Scalar::ZERO; n];

    let mut alpha = Scalar::random(&mut rng);
    challenges[(j + 1) % n] = ring_challenge(&message, &(alpha * h));

    let mut i = (j + 1) % n;
    while i != j {
        responses[i] = Scalar::random(&mut rng);
        let commitment = responses[i] * h + challenges[i] * ring[i];
        challenges[(i + 1) % n] = ring_challenge(&message, &commitment);
        i = (i + 1) % n;
    }
    responses[j] = alpha - challenges[j] * secret.randomness;
    alpha.zeroize();

    let ring_challenge_bytes = challenges[0].to_bytes();

    let mut beta = Scalar::random(&mut rng);
    let nonce = (beta * RISTRETTO_BASEPOINT_POINT).compress().to_bytes();
    let e = signature_challenge(&message, &nonce, &ring_challenge_bytes);
    let signature_response = beta + e * secret.trapdoor;
    beta.zeroize();

    tracing::debug!(
        "Constructed {} proof over ring of {} for serial {}",
        statement.spend_type,
        n,
        serial
    );

    Ok(SpendProof {
        version: COIN_VERSION,
        serial,
        spend_type: statement.spend_type,
        denomination: snapshot.denomination,
        checksum: snapshot.checksum,
        context: statement.context,
        trapdoor_public,
        blob: ProofBlob {
            challenge: ring_challenge_bytes,
            responses: responses.iter().map(|s| s.to_bytes()).collect(),
            signature_nonce: nonce,
            signature_response: signature_response.to_bytes(),
        },
    })
}

fn canonical_scalar(bytes: &[u8; 32], field: &str) -> Result<Scalar> {
    let scalar = Scalar::from_bytes_mod_order(*bytes);
    if scalar.to_bytes() != *bytes {
        return Err(ZerocoinError::BadProof(format!("non-canonical {}", field)));
    }
    Ok(scalar)
}

fn decompress(bytes: &[u8; 32], field: &str) -> Result<RistrettoPoint> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or_else(|| ZerocoinError::BadProof(format!("invalid point for {}", field)))
}

/// Verify a proof against the snapshot its checksum names and the verifier's statement.
///
/// Depends only on the snapshot; whether the serial is already spent is an
/// acceptance question answered by the registry.
pub fn verify_proof(
    proof: &SpendProof,
    snapshot: &AccumulatorSnapshot,
    statement: &ProofStatement,
) -> Result<()> {
    if proof.checksum != snapshot.checksum || proof.denomination != snapshot.denomination {
        return Err(ZerocoinError::BadProof(format!(
            "proof references checkpoint {} but was checked against {}",
            proof.checksum.short(),
            snapshot.checksum.short()
        )));
    }
    if proof.version != COIN_VERSION {
        return Err(ZerocoinError::BadProof(format!(
            "unsupported coin version {}",
            proof.version
        )));
    }
    if snapshot.is_empty() || proof.blob.responses.len() != snapshot.len() {
        return Err(ZerocoinError::BadProof(format!(
            "ring size mismatch: {} responses for {} members",
            proof.blob.responses.len(),
            snapshot.len()
        )));
    }

    let trapdoor_point = decompress(&proof.trapdoor_public, "trapdoor key")?;
    if !serial_matches_trapdoor(&proof.serial, &trapdoor_point) {
        return Err(ZerocoinError::BadProof(
            "serial is not derived from trapdoor key".to_string(),
        ));
    }
    let serial = derive_serial(&trapdoor_point);

    let message = transcript(statement, snapshot, &proof.serial, &proof.trapdoor_public);
    let ring = shifted_ring(snapshot, &serial)?;
    let h = generator_h();

    let start = canonical_scalar(&proof.blob.challenge, "ring challenge")?;
    let mut challenge = start;
    for (member, response) in ring.iter().zip(&proof.blob.responses) {
        let s = canonical_scalar(response, "ring response")?;
        let commitment = s * h + challenge * member;
        challenge = ring_challenge(&message, &commitment);
    }
    if challenge != start {
        return Err(ZerocoinError::BadProof("ring does not close".to_string()));
    }

    let nonce = decompress(&proof.blob.signature_nonce, "signature nonce")?;
    let z = canonical_scalar(&proof.blob.signature_response, "signature response")?;
    let e = signature_challenge(&message, &proof.blob.signature_nonce, &proof.blob.challenge);
    if z * RISTRETTO_BASEPOINT_POINT != nonce + e * trapdoor_point {
        return Err(ZerocoinError::BadProof("trapdoor signature invalid".to_string()));
    }

    Ok(())
}

/// Digest identifying a proof, used for transaction IDs
pub fn proof_digest(proof: &SpendProof) -> Result<Hash> {
    Ok(Hash::from_bytes(&serde_json::to_vec(proof)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_coin_secret;
    use crate::spend::types::TransactionContext;
    use crate::types::{Denomination, SpendType};

    struct Fixture {
        secret: CoinSecret,
        snapshot: AccumulatorSnapshot,
        witness: Witness,
    }

    fn fixture(ring_size: usize) -> Fixture {
        let secret = generate_coin_secret(Denomination::Ten);
        let mut members: Vec<_> = (1..ring_size)
            .map(|_| generate_coin_secret(Denomination::Ten).public_value())
            .collect();
        members.push(secret.public_value());

        let snapshot = AccumulatorSnapshot::from_members(Denomination::Ten, 10, members).unwrap();
        let witness = snapshot.compute_witness(&secret.public_value()).unwrap();
        Fixture {
            secret,
            snapshot,
            witness,
        }
    }

    fn statement(spend_type: SpendType) -> ProofStatement {
        ProofStatement {
            spend_type,
            context: TransactionContext::new(10)
                .with_output(Hash::from_bytes(b"recipient"))
                .commitment(),
        }
    }

    #[test]
    fn test_proof_verifies() {
        for ring_size in [1, 2, 7] {
            let f = fixture(ring_size);
            let st = statement(SpendType::Spend);
            let proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &st).unwrap();

            assert_eq!(proof.serial, f.secret.serial_number());
            assert_eq!(proof.blob.responses.len(), ring_size);
            verify_proof(&proof, &f.snapshot, &st).unwrap();
        }
    }

    #[test]
    fn test_stake_proof_fails_as_spend() {
        let f = fixture(4);
        let stake = statement(SpendType::Stake);
        let proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &stake).unwrap();

        verify_proof(&proof, &f.snapshot, &stake).unwrap();
        let result = verify_proof(&proof, &f.snapshot, &statement(SpendType::Spend));
        assert!(matches!(result, Err(ZerocoinError::BadProof(_))));
    }

    #[test]
    fn test_context_is_bound() {
        let f = fixture(3);
        let st = statement(SpendType::Spend);
        let proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &st).unwrap();

        let other = ProofStatement {
            spend_type: SpendType::Spend,
            context: TransactionContext::new(999).commitment(),
        };
        assert!(matches!(
            verify_proof(&proof, &f.snapshot, &other),
            Err(ZerocoinError::BadProof(_))
        ));
    }

    #[test]
    fn test_tampered_serial_rejected() {
        let f = fixture(3);
        let st = statement(SpendType::Spend);
        let mut proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &st).unwrap();
        proof.serial = generate_coin_secret(Denomination::Ten).serial_number();

        assert!(matches!(
            verify_proof(&proof, &f.snapshot, &st),
            Err(ZerocoinError::BadProof(_))
        ));
    }

    #[test]
    fn test_tampered_response_rejected() {
        let f = fixture(3);
        let st = statement(SpendType::Spend);
        let mut proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &st).unwrap();
        proof.blob.responses[1] = Scalar::from(7u64).to_bytes();

        assert!(matches!(
            verify_proof(&proof, &f.snapshot, &st),
            Err(ZerocoinError::BadProof(_))
        ));
    }

    #[test]
    fn test_wrong_snapshot_rejected() {
        let f = fixture(3);
        let st = statement(SpendType::Spend);
        let proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &st).unwrap();

        let mut members = f.snapshot.members().to_vec();
        members.push(generate_coin_secret(Denomination::Ten).public_value());
        let grown = AccumulatorSnapshot::from_members(Denomination::Ten, 20, members).unwrap();

        assert!(matches!(
            verify_proof(&proof, &grown, &st),
            Err(ZerocoinError::BadProof(_))
        ));
    }

    #[test]
    fn test_foreign_secret_cannot_prove() {
        let f = fixture(3);
        let outsider = generate_coin_secret(Denomination::Ten);
        let st = statement(SpendType::Spend);

        let result = construct_proof(&outsider, &f.witness, &f.snapshot, &st);
        assert!(matches!(result, Err(ZerocoinError::CoinNotInAccumulator(_))));
    }

    #[test]
    fn test_proof_digest_stable() {
        let f = fixture(2);
        let st = statement(SpendType::Spend);
        let proof = construct_proof(&f.secret, &f.witness, &f.snapshot, &st).unwrap();
        assert_eq!(proof_digest(&proof).unwrap(), proof_digest(&proof).unwrap());
    }
}
