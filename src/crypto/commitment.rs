//! Coin commitments and the hash-to-group helpers they rely on
//!
//! A coin is a Pedersen commitment `C = S·G + r·H` over Ristretto, where the
//! serial `S` is derived from the trapdoor public key `k·G`.

use crate::error::{Result, ZerocoinError};
use crate::types::Denomination;
use blake2::{Blake2b512, Digest};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::rngs::OsRng;
use sha2::Sha512;
use std::sync::OnceLock;

use super::types::{CoinSecret, PublicValue, SerialNumber};

const GENERATOR_H_TAG: &[u8] = b"zerocoin/generator-h/v1";
const SERIAL_TAG: &[u8] = b"zerocoin/serial/v2";

/// Coin version whose serial is bound to a trapdoor public key
pub const COIN_VERSION: u8 = 2;

/// Second Pedersen generator with unknown discrete log relative to `G`
pub fn generator_h() -> RistrettoPoint {
    static H: OnceLock<RistrettoPoint> = OnceLock::new();
    *H.get_or_init(|| hash_to_point(GENERATOR_H_TAG, &[]))
}

/// Map arbitrary data onto the group
pub fn hash_to_point(domain: &[u8], data: &[&[u8]]) -> RistrettoPoint {
    let mut hasher = Blake2b512::new();
    hasher.update(domain);
    for part in data {
        hasher.update(part);
    }
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hasher.finalize());
    RistrettoPoint::from_uniform_bytes(&wide)
}

/// Map arbitrary data onto a scalar
pub fn hash_to_scalar(domain: &[u8], data: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(domain);
    for part in data {
        hasher.update(part);
    }
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Derive the serial number scalar from a trapdoor public key
pub fn derive_serial(trapdoor_public: &RistrettoPoint) -> Scalar {
    hash_to_scalar(SERIAL_TAG, &[trapdoor_public.compress().as_bytes()])
}

/// Compute the coin commitment `S·G + r·H`
pub fn compute_public_value(serial: &Scalar, randomness: &Scalar) -> PublicValue {
    let point = serial * RISTRETTO_BASEPOINT_POINT + randomness * generator_h();
    PublicValue(point.compress().to_bytes())
}

/// Decode a published public value, rejecting invalid encodings and the identity
pub fn decode_public_value(value: &PublicValue) -> Result<RistrettoPoint> {
    let point = CompressedRistretto(value.0)
        .decompress()
        .ok_or_else(|| {
            ZerocoinError::InvalidCoinValue(format!("{} is not a group element", value.short()))
        })?;

    if point == RistrettoPoint::identity() {
        return Err(ZerocoinError::InvalidCoinValue(
            "identity element is not a valid coin".to_string(),
        ));
    }

    Ok(point)
}

/// Generate a fresh coin secret for a denomination
pub fn generate_coin_secret(denomination: Denomination) -> CoinSecret {
    let mut rng = OsRng;
    let trapdoor = Scalar::random(&mut rng);
    let randomness = Scalar::random(&mut rng);
    let serial = derive_serial(&(trapdoor * RISTRETTO_BASEPOINT_POINT));

    CoinSecret {
        serial,
        randomness,
        trapdoor,
        denomination,
    }
}

impl CoinSecret {
    /// Public value committed to by this secret
    pub fn public_value(&self) -> PublicValue {
        compute_public_value(&self.serial, &self.randomness)
    }

    /// Public half of the trapdoor, revealed at spend time
    pub fn trapdoor_public(&self) -> RistrettoPoint {
        self.trapdoor * RISTRETTO_BASEPOINT_POINT
    }
}

/// Check that a serial number is the one bound to a trapdoor public key
pub fn serial_matches_trapdoor(serial: &SerialNumber, trapdoor_public: &RistrettoPoint) -> bool {
    SerialNumber::from_scalar(&derive_serial(trapdoor_public)) == *serial
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_value_deterministic() {
        let secret = generate_coin_secret(Denomination::Ten);

        let value1 = secret.public_value();
        let value2 = secret.public_value();
        assert_eq!(value1, value2);

        let cloned = secret.clone();
        assert_eq!(cloned.public_value(), value1);
    }

    #[test]
    fn test_distinct_secrets_distinct_values() {
        let a = generate_coin_secret(Denomination::Ten);
        let b = generate_coin_secret(Denomination::Ten);

        assert_ne!(a.public_value(), b.public_value());
        assert_ne!(a.serial_number(), b.serial_number());
    }

    #[test]
    fn test_serial_bound_to_trapdoor() {
        let secret = generate_coin_secret(Denomination::One);
        assert!(serial_matches_trapdoor(
            &secret.serial_number(),
            &secret.trapdoor_public()
        ));

        let other = generate_coin_secret(Denomination::One);
        assert!(!serial_matches_trapdoor(
            &secret.serial_number(),
            &other.trapdoor_public()
        ));
    }

    #[test]
    fn test_decode_public_value() {
        let secret = generate_coin_secret(Denomination::Fifty);
        let value = secret.public_value();
        let point = decode_public_value(&value).unwrap();
        assert_eq!(point.compress().to_bytes(), value.0);
    }

    #[test]
    fn test_decode_rejects_identity() {
        let identity = PublicValue(RistrettoPoint::identity().compress().to_bytes());
        assert!(matches!(
            decode_public_value(&identity),
            Err(ZerocoinError::InvalidCoinValue(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_public_value(&PublicValue([0xffu8; 32])),
            Err(ZerocoinError::InvalidCoinValue(_))
        ));
    }

    #[test]
    fn test_hash_to_scalar_domain_separated() {
        let a = hash_to_scalar(b"domain-a", &[b"data"]);
        let b = hash_to_scalar(b"domain-b", &[b"data"]);
        assert_ne!(a, b);
        assert_eq!(a, hash_to_scalar(b"domain-a", &[b"data"]));
    }
}
