//! Live per-denomination accumulators and their checkpoint history

use crate::crypto::{decode_public_value, PublicValue};
use crate::error::{Result, ZerocoinError};
use crate::types::{BlockHeight, Denomination};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::traits::Identity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::snapshot::AccumulatorSnapshot;
use super::types::{member_point, AccumulatorChecksum, AccumulatorValue};

/// Running accumulator for one denomination
#[derive(Clone, Debug)]
struct DenominationAccumulator {
    members: BTreeSet<PublicValue>,
    point: RistrettoPoint,
}

impl DenominationAccumulator {
    fn new() -> Self {
        Self {
            members: BTreeSet::new(),
            point: RistrettoPoint::identity(),
        }
    }
}

/// Append-only accumulators for every denomination plus retained checkpoints
#[derive(Debug)]
pub struct Accumulator {
    live: BTreeMap<Denomination, DenominationAccumulator>,
    snapshots: HashMap<AccumulatorChecksum, Arc<AccumulatorSnapshot>>,
    /// Checksums recorded at each checkpoint height, oldest first
    checkpoints: BTreeMap<BlockHeight, Vec<AccumulatorChecksum>>,
    latest: HashMap<Denomination, AccumulatorChecksum>,
    max_checkpoints: usize,
}

impl Accumulator {
    /// Empty accumulator, as at genesis
    pub fn new(max_checkpoints: usize) -> Self {
        Self {
            live: BTreeMap::new(),
            snapshots: HashMap::new(),
            checkpoints: BTreeMap::new(),
            latest: HashMap::new(),
            max_checkpoints: max_checkpoints.max(1),
        }
    }

    /// Add a coin public value, returning the new accumulator value
    pub fn add(
        &mut self,
        denomination: Denomination,
        value: &PublicValue,
    ) -> Result<AccumulatorValue> {
        decode_public_value(value)?;

        let acc = self
            .live
            .entry(denomination)
            .or_insert_with(DenominationAccumulator::new);

        if !acc.members.insert(*value) {
            return Err(ZerocoinError::DuplicateCommitment(value.to_hex()));
        }
        acc.point += member_point(value);

        tracing::debug!(
            "Accumulated {} into denomination {} ({} members)",
            value.short(),
            denomination,
            acc.members.len()
        );

        Ok(AccumulatorValue::from_point(&acc.point))
    }

    /// Current live value for a denomination
    pub fn value(&self, denomination: Denomination) -> AccumulatorValue {
        self.live
            .get(&denomination)
            .map(|acc| AccumulatorValue::from_point(&acc.point))
            .unwrap_or_else(AccumulatorValue::empty)
    }

    /// Number of coins accumulated for a denomination
    pub fn member_count(&self, denomination: Denomination) -> usize {
        self.live
            .get(&denomination)
            .map(|acc| acc.members.len())
            .unwrap_or(0)
    }

    pub fn contains(&self, denomination: Denomination, value: &PublicValue) -> bool {
        self.live
            .get(&denomination)
            .map(|acc| acc.members.contains(value))
            .unwrap_or(false)
    }

    /// Freeze every non-empty denomination at `height`.
    ///
    /// Returns the snapshots recorded at this height. Older checkpoints beyond
    /// the retention limit are pruned.
    pub fn checkpoint(&mut self, height: BlockHeight) -> Result<Vec<Arc<AccumulatorSnapshot>>> {
        if let Some((&last, _)) = self.checkpoints.iter().next_back() {
            if height <= last {
                return Err(ZerocoinError::Internal(format!(
                    "checkpoint height {} is not above last checkpoint {}",
                    height, last
                )));
            }
        }

        let mut recorded = Vec::new();
        let mut checksums = Vec::new();

        for (denomination, acc) in &self.live {
            if acc.members.is_empty() {
                continue;
            }
            let checksum = AccumulatorValue::from_point(&acc.point).checksum(*denomination);

            let snapshot = match self.snapshots.get(&checksum) {
                Some(existing) => existing.clone(),
                None => {
                    let snapshot = Arc::new(AccumulatorSnapshot::from_members(
                        *denomination,
                        height,
                        acc.members.iter().copied().collect(),
                    )?);
                    self.snapshots.insert(checksum, snapshot.clone());
                    snapshot
                }
            };

            self.latest.insert(*denomination, checksum);
            checksums.push(checksum);
            recorded.push(snapshot);
        }

        self.checkpoints.insert(height, checksums);
        self.prune();

        tracing::info!(
            "Accumulator checkpoint at height {} ({} denominations)",
            height,
            recorded.len()
        );

        Ok(recorded)
    }

    /// Drop the oldest checkpoints beyond the retention limit
    fn prune(&mut self) {
        while self.checkpoints.len() > self.max_checkpoints {
            let Some((height, expired)) = self.checkpoints.pop_first() else {
                break;
            };
            for checksum in expired {
                let still_referenced = self
                    .checkpoints
                    .values()
                    .any(|checksums| checksums.contains(&checksum));
                if !still_referenced {
                    self.snapshots.remove(&checksum);
                    tracing::debug!(
                        "Pruned checkpoint {} from height {}",
                        checksum.short(),
                        height
                    );
                }
            }
        }
    }

    /// Resolve a checksum to its snapshot
    pub fn snapshot(&self, checksum: &AccumulatorChecksum) -> Result<Arc<AccumulatorSnapshot>> {
        self.snapshots
            .get(checksum)
            .cloned()
            .ok_or_else(|| ZerocoinError::UnknownAccumulatorChecksum(checksum.to_hex()))
    }

    /// Most recent checkpoint for a denomination
    pub fn latest_checkpoint(&self, denomination: Denomination) -> Result<Arc<AccumulatorSnapshot>> {
        let checksum = self.latest.get(&denomination).ok_or_else(|| {
            ZerocoinError::CoinNotInAccumulator(format!(
                "no checkpoint yet for denomination {}",
                denomination
            ))
        })?;
        self.snapshot(checksum)
    }

    /// Checksum of the most recent checkpoint for a denomination, if any
    pub fn latest_checksum(&self, denomination: Denomination) -> Option<AccumulatorChecksum> {
        self.latest.get(&denomination).copied()
    }

    pub fn checkpoint_heights(&self) -> Vec<BlockHeight> {
        self.checkpoints.keys().copied().collect()
    }

    /// Serializable form: live members plus checkpoint membership
    pub fn to_persisted(&self) -> PersistedAccumulator {
        PersistedAccumulator {
            members: self
                .live
                .iter()
                .map(|(d, acc)| (*d, acc.members.iter().copied().collect()))
                .collect(),
            checkpoints: self
                .checkpoints
                .iter()
                .map(|(height, checksums)| PersistedCheckpoint {
                    height: *height,
                    snapshots: checksums
                        .iter()
                        .filter_map(|c| self.snapshots.get(c))
                        .map(|s| s.as_ref().clone())
                        .collect(),
                })
                .collect(),
            max_checkpoints: self.max_checkpoints,
        }
    }

    /// Rebuild from persisted form, recomputing every value
    pub fn from_persisted(persisted: PersistedAccumulator) -> Result<Self> {
        let mut accumulator = Accumulator::new(persisted.max_checkpoints);

        for (denomination, members) in persisted.members {
            for member in members {
                accumulator.add(denomination, &member)?;
            }
        }

        for checkpoint in persisted.checkpoints {
            let mut checksums = Vec::new();
            for persisted in checkpoint.snapshots {
                // Rebuilt snapshots have sorted, deduplicated members
                let snapshot = AccumulatorSnapshot::from_members(
                    persisted.denomination,
                    persisted.height,
                    persisted.members().to_vec(),
                )?;
                if snapshot != persisted {
                    return Err(ZerocoinError::Internal(format!(
                        "persisted checkpoint {} does not match its members",
                        persisted.checksum
                    )));
                }
                let checksum = snapshot.checksum;
                accumulator.latest.insert(snapshot.denomination, checksum);
                accumulator
                    .snapshots
                    .entry(checksum)
                    .or_insert_with(|| Arc::new(snapshot));
                checksums.push(checksum);
            }
            accumulator.checkpoints.insert(checkpoint.height, checksums);
        }

        Ok(accumulator)
    }
}

/// On-disk form of the accumulator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedAccumulator {
    pub members: Vec<(Denomination, Vec<PublicValue>)>,
    pub checkpoints: Vec<PersistedCheckpoint>,
    pub max_checkpoints: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedCheckpoint {
    pub height: BlockHeight,
    pub snapshots: Vec<AccumulatorSnapshot>,
}
