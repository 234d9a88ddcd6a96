//! Wallet-side storage of coin secrets

use crate::crypto::{CoinSecret, PublicValue};
use crate::error::{Result, ZerocoinError};
use std::collections::HashMap;

/// Storage for the secrets behind locally minted coins
pub trait CoinSecretStore: Send {
    /// Keep a secret, keyed by its coin's public value
    fn store(&mut self, secret: CoinSecret) -> Result<PublicValue>;

    fn get(&self, public_value: &PublicValue) -> Result<CoinSecret>;

    fn remove(&mut self, public_value: &PublicValue) -> Result<CoinSecret>;

    fn contains(&self, public_value: &PublicValue) -> bool;

    fn public_values(&self) -> Vec<PublicValue>;
}

/// Process-local secret store; secrets are zeroized when dropped
#[derive(Default)]
pub struct InMemoryCoinStore {
    secrets: HashMap<PublicValue, CoinSecret>,
}

impl InMemoryCoinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl CoinSecretStore for InMemoryCoinStore {
    fn store(&mut self, secret: CoinSecret) -> Result<PublicValue> {
        let public_value = secret.public_value();
        if self.secrets.contains_key(&public_value) {
            return Err(ZerocoinError::DuplicateCommitment(public_value.to_hex()));
        }
        self.secrets.insert(public_value, secret);
        Ok(public_value)
    }

    fn get(&self, public_value: &PublicValue) -> Result<CoinSecret> {
        self.secrets
            .get(public_value)
            .cloned()
            .ok_or_else(|| ZerocoinError::CoinSecretNotFound(public_value.to_hex()))
    }

    fn remove(&mut self, public_value: &PublicValue) -> Result<CoinSecret> {
        self.secrets
            .remove(public_value)
            .ok_or_else(|| ZerocoinError::CoinSecretNotFound(public_value.to_hex()))
    }

    fn contains(&self, public_value: &PublicValue) -> bool {
        self.secrets.contains_key(public_value)
    }

    fn public_values(&self) -> Vec<PublicValue> {
        let mut values: Vec<PublicValue> = self.secrets.keys().copied().collect();
        values.sort();
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_coin_secret;
    use crate::types::Denomination;

    #[test]
    fn test_store_get_remove() {
        let mut store = InMemoryCoinStore::new();
        let secret = generate_coin_secret(Denomination::Five);
        let serial = secret.serial_number();

        let public_value = store.store(secret).unwrap();
        assert!(store.contains(&public_value));
        assert_eq!(store.get(&public_value).unwrap().serial_number(), serial);

        let removed = store.remove(&public_value).unwrap();
        assert_eq!(removed.serial_number(), serial);
        assert!(store.is_empty());
        assert!(matches!(
            store.get(&public_value),
            Err(ZerocoinError::CoinSecretNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_store() {
        let mut store = InMemoryCoinStore::new();
        let secret = generate_coin_secret(Denomination::One);

        store.store(secret.clone()).unwrap();
        assert!(matches!(
            store.store(secret),
            Err(ZerocoinError::DuplicateCommitment(_))
        ));
        assert_eq!(store.len(), 1);
    }
}
