//! Immutable accumulator checkpoints and membership witnesses

use crate::crypto::{decode_public_value, PublicValue};
use crate::error::{Result, ZerocoinError};
use crate::types::{BlockHeight, Denomination};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::traits::Identity;
use serde::{Deserialize, Serialize};

use super::types::{member_point, AccumulatorChecksum, AccumulatorValue};

/// Frozen accumulator state for one denomination at a checkpoint height.
///
/// Members are kept byte-sorted so the anonymity ring derived from a snapshot
/// does not depend on the order coins were ingested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorSnapshot {
    pub denomination: Denomination,
    pub height: BlockHeight,
    pub value: AccumulatorValue,
    pub checksum: AccumulatorChecksum,
    members: Vec<PublicValue>,
}

impl AccumulatorSnapshot {
    /// Build a snapshot from a member set, recomputing the accumulator value
    pub fn from_members(
        denomination: Denomination,
        height: BlockHeight,
        mut members: Vec<PublicValue>,
    ) -> Result<Self> {
        members.sort();
        members.dedup();

        let mut point = RistrettoPoint::identity();
        for member in &members {
            decode_public_value(member)?;
            point += member_point(member);
        }

        let value = AccumulatorValue::from_point(&point);
        Ok(Self {
            denomination,
            height,
            checksum: value.checksum(denomination),
            value,
            members,
        })
    }

    pub fn members(&self) -> &[PublicValue] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, value: &PublicValue) -> bool {
        self.members.binary_search(value).is_ok()
    }

    /// Decoded ring members, in canonical order
    pub fn ring(&self) -> Result<Vec<RistrettoPoint>> {
        self.members.iter().map(decode_public_value).collect()
    }

    /// Recompute the value from the members and compare with the recorded one
    pub fn is_consistent(&self) -> bool {
        let point = self
            .members
            .iter()
            .fold(RistrettoPoint::identity(), |acc, m| acc + member_point(m));
        AccumulatorValue::from_point(&point) == self.value
            && self.value.checksum(self.denomination) == self.checksum
    }

    /// Compute a membership witness for a coin in this snapshot
    pub fn compute_witness(&self, value: &PublicValue) -> Result<Witness> {
        let index = self.members.binary_search(value).map_err(|_| {
            ZerocoinError::CoinNotInAccumulator(format!(
                "{} not in checkpoint {} (denomination {})",
                value.short(),
                self.checksum.short(),
                self.denomination
            ))
        })?;

        let witness_point = self.value.to_point()? - member_point(value);

        Ok(Witness {
            denomination: self.denomination,
            checksum: self.checksum,
            public_value: *value,
            index,
            value: AccumulatorValue::from_point(&witness_point),
        })
    }
}

/// Membership witness: the accumulated value of every other member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub denomination: Denomination,
    pub checksum: AccumulatorChecksum,
    pub public_value: PublicValue,
    /// Position of the coin in the snapshot's canonical member order
    pub index: usize,
    pub value: AccumulatorValue,
}

impl Witness {
    /// Check `witness + H(coin) == accumulator` against a snapshot
    pub fn verify(&self, snapshot: &AccumulatorSnapshot) -> bool {
        if self.checksum != snapshot.checksum || self.denomination != snapshot.denomination {
            return false;
        }
        let (Ok(witness), Ok(accumulated)) = (self.value.to_point(), snapshot.value.to_point())
        else {
            return false;
        };
        witness + member_point(&self.public_value) == accumulated
            && snapshot.members().get(self.index) == Some(&self.public_value)
    }
}

/// Compute a witness for `value` against `snapshot`
pub fn compute_witness(value: &PublicValue, snapshot: &AccumulatorSnapshot) -> Result<Witness> {
    snapshot.compute_witness(value)
}
