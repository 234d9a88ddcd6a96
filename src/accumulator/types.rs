//! Accumulator values and checksums

use crate::crypto::{hash_to_point, PublicValue};
use crate::error::{Result, ZerocoinError};
use crate::types::{Denomination, Hash};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::traits::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;

const MEMBER_TAG: &[u8] = b"zerocoin/accumulator/member";
const CHECKSUM_TAG: &[u8] = b"zerocoin/accumulator/checksum";

/// Multiset hash of every coin accumulated for one denomination
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccumulatorValue(pub [u8; 32]);

impl AccumulatorValue {
    /// Value of an accumulator with no members
    pub fn empty() -> Self {
        Self::from_point(&RistrettoPoint::identity())
    }

    pub fn from_point(point: &RistrettoPoint) -> Self {
        AccumulatorValue(point.compress().to_bytes())
    }

    pub fn to_point(&self) -> Result<RistrettoPoint> {
        CompressedRistretto(self.0).decompress().ok_or_else(|| {
            ZerocoinError::Internal(format!(
                "accumulator value {} is not a group element",
                hex::encode(self.0)
            ))
        })
    }

    /// Checksum identifying this value for a denomination
    pub fn checksum(&self, denomination: Denomination) -> AccumulatorChecksum {
        AccumulatorChecksum(Hash::from_parts(&[
            CHECKSUM_TAG,
            &[denomination.as_byte()],
            &self.0,
        ]))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Snapshot identifier spends reference instead of the full accumulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccumulatorChecksum(pub Hash);

impl AccumulatorChecksum {
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_hex(hex_str: &str) -> std::result::Result<Self, hex::FromHexError> {
        Ok(AccumulatorChecksum(Hash::from_hex(hex_str)?))
    }

    /// First eight hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0 .0[..4])
    }
}

impl fmt::Display for AccumulatorChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Group element a public value contributes to the accumulator
pub fn member_point(value: &PublicValue) -> RistrettoPoint {
    hash_to_point(MEMBER_TAG, &[value.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_value_round_trips() {
        let empty = AccumulatorValue::empty();
        assert_eq!(empty.to_point().unwrap(), RistrettoPoint::identity());
    }

    #[test]
    fn test_checksum_depends_on_denomination() {
        let value = AccumulatorValue::from_point(&member_point(&PublicValue([3u8; 32])));
        assert_ne!(
            value.checksum(Denomination::One),
            value.checksum(Denomination::Five)
        );
        assert_eq!(
            value.checksum(Denomination::One),
            value.checksum(Denomination::One)
        );
    }

    #[test]
    fn test_checksum_hex() {
        let checksum = AccumulatorValue::empty().checksum(Denomination::Ten);
        let parsed = AccumulatorChecksum::from_hex(&checksum.to_hex()).unwrap();
        assert_eq!(checksum, parsed);
        assert_eq!(checksum.short().len(), 8);
    }
}
