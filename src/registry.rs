//! Mint metadata and the spent serial number set

use crate::accumulator::AccumulatorChecksum;
use crate::crypto::{decode_public_value, PublicValue, SerialNumber};
use crate::error::{Result, ZerocoinError};
use crate::types::{BlockHeight, Denomination, TxID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lifecycle of a registered mint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintState {
    /// In a block, fewer confirmations than required
    Minted,
    /// Mature enough to spend
    Confirmed,
    /// Serial number revealed in an accepted spend
    Spent,
}

/// Metadata kept for every confirmed mint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintMeta {
    pub public_value: PublicValue,
    pub denomination: Denomination,
    pub version: u8,
    /// Latest checkpoint for the denomination when the mint confirmed
    pub accumulator_checksum: Option<AccumulatorChecksum>,
    pub height: BlockHeight,
    pub txid: TxID,
    /// Set when this wallet holds the coin secret
    pub spendable: bool,
    pub confirmations: u64,
    pub state: MintState,
}

impl MintMeta {
    /// Whether the mint can back a spend at the given confirmation threshold
    pub fn is_spendable(&self, required_confirmations: u64) -> bool {
        self.spendable
            && self.state != MintState::Spent
            && self.confirmations >= required_confirmations
    }
}

/// Registry of every mint seen on chain plus the spent serial set
#[derive(Debug, Default)]
pub struct MintRegistry {
    mints: BTreeMap<PublicValue, MintMeta>,
    spent_serials: HashSet<SerialNumber>,
    /// Serials of local coins, so a spend can retire the right mint
    serial_owners: HashMap<SerialNumber, PublicValue>,
}

impl MintRegistry {
    /// Empty registry, as at genesis
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a confirmed mint
    pub fn register_mint(&mut self, meta: MintMeta) -> Result<()> {
        decode_public_value(&meta.public_value)?;

        if self.mints.contains_key(&meta.public_value) {
            return Err(ZerocoinError::DuplicateCommitment(meta.public_value.to_hex()));
        }

        tracing::info!(
            "Registered mint {} (denomination {}, height {})",
            meta.public_value.short(),
            meta.denomination,
            meta.height
        );
        self.mints.insert(meta.public_value, meta);
        Ok(())
    }

    /// Associate a local coin's serial with its public value
    pub fn link_serial(&mut self, serial: SerialNumber, public_value: PublicValue) {
        self.serial_owners.insert(serial, public_value);
    }

    /// Public value of the local coin carrying `serial`, if linked
    pub fn owner_of(&self, serial: &SerialNumber) -> Option<PublicValue> {
        self.serial_owners.get(serial).copied()
    }

    /// Record a serial as spent.
    ///
    /// Check and insert happen in one step; a serial already present fails
    /// with `DoubleSpend`. Returns the local mint retired by this spend, if any.
    pub fn mark_spent(&mut self, serial: &SerialNumber) -> Result<Option<PublicValue>> {
        if !self.spent_serials.insert(*serial) {
            tracing::warn!("Double spend attempt for serial {}", serial);
            return Err(ZerocoinError::DoubleSpend(serial.to_hex()));
        }

        let retired = self.serial_owners.get(serial).copied();
        if let Some(public_value) = retired {
            if let Some(meta) = self.mints.get_mut(&public_value) {
                meta.state = MintState::Spent;
                meta.spendable = false;
            }
        }

        tracing::info!("Serial {} marked spent", serial);
        Ok(retired)
    }

    pub fn is_serial_spent(&self, serial: &SerialNumber) -> bool {
        self.spent_serials.contains(serial)
    }

    /// Whether `meta` can back a spend at the given confirmation threshold
    pub fn is_spendable(meta: &MintMeta, required_confirmations: u64) -> bool {
        meta.is_spendable(required_confirmations)
    }

    /// Refresh confirmation counts against the chain tip
    pub fn update_confirmations(&mut self, tip: BlockHeight, required_confirmations: u64) {
        for meta in self.mints.values_mut() {
            meta.confirmations = tip.saturating_sub(meta.height) + 1;
            if meta.state == MintState::Minted && meta.confirmations >= required_confirmations {
                meta.state = MintState::Confirmed;
            }
        }
    }

    /// Flag a mint as owned by this wallet
    pub fn set_spendable(&mut self, public_value: &PublicValue, spendable: bool) {
        if let Some(meta) = self.mints.get_mut(public_value) {
            meta.spendable = spendable && meta.state != MintState::Spent;
        }
    }

    pub fn get(&self, public_value: &PublicValue) -> Option<&MintMeta> {
        self.mints.get(public_value)
    }

    /// All registered mints, in public value order
    pub fn mints(&self) -> impl Iterator<Item = &MintMeta> {
        self.mints.values()
    }

    /// Owned mints ready to spend
    pub fn spendable_mints(&self, required_confirmations: u64) -> Vec<MintMeta> {
        self.mints
            .values()
            .filter(|m| m.is_spendable(required_confirmations))
            .cloned()
            .collect()
    }

    /// Count of unspent owned coins per denomination
    pub fn distribution(&self) -> BTreeMap<Denomination, u64> {
        let mut distribution = BTreeMap::new();
        for meta in self.owned_unspent() {
            *distribution.entry(meta.denomination).or_insert(0) += 1;
        }
        distribution
    }

    /// Total value of owned unspent coins; `mature_only` counts only spendable ones
    pub fn balance(&self, required_confirmations: u64, mature_only: bool) -> u64 {
        self.owned_unspent()
            .filter(|m| !mature_only || m.confirmations >= required_confirmations)
            .map(|m| m.denomination.value())
            .sum()
    }

    fn owned_unspent(&self) -> impl Iterator<Item = &MintMeta> {
        self.mints
            .values()
            .filter(|m| m.spendable && m.state != MintState::Spent)
    }

    pub fn spent_count(&self) -> usize {
        self.spent_serials.len()
    }

    pub fn to_persisted(&self) -> PersistedRegistry {
        let mut spent_serials: Vec<SerialNumber> = self.spent_serials.iter().copied().collect();
        spent_serials.sort();
        let mut serial_links: Vec<SerialLink> = self
            .serial_owners
            .iter()
            .map(|(serial, public_value)| SerialLink {
                serial: *serial,
                public_value: *public_value,
            })
            .collect();
        serial_links.sort_by(|a, b| a.serial.cmp(&b.serial));
        PersistedRegistry {
            mints: self.mints.values().cloned().collect(),
            spent_serials,
            serial_links,
        }
    }

    /// Rebuild from persisted form, local serial links included
    pub fn from_persisted(persisted: PersistedRegistry) -> Result<Self> {
        let mut registry = MintRegistry::new();
        for meta in persisted.mints {
            registry.register_mint(meta)?;
        }
        for serial in persisted.spent_serials {
            if !registry.spent_serials.insert(serial) {
                return Err(ZerocoinError::DoubleSpend(serial.to_hex()));
            }
        }
        for link in persisted.serial_links {
            if !registry.mints.contains_key(&link.public_value) {
                return Err(ZerocoinError::Internal(format!(
                    "serial {} linked to unknown mint {}",
                    link.serial,
                    link.public_value.short()
                )));
            }
            registry.link_serial(link.serial, link.public_value);
        }
        Ok(registry)
    }
}

/// On-disk form of the registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedRegistry {
    pub mints: Vec<MintMeta>,
    pub spent_serials: Vec<SerialNumber>,
    #[serde(default)]
    pub serial_links: Vec<SerialLink>,
}

/// Serial of a local coin and the mint it retires
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialLink {
    pub serial: SerialNumber,
    pub public_value: PublicValue,
}
