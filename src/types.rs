//! Core types used throughout the zerocoin engine

use crate::error::{Result, ZerocoinError};
use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Block height reported by the chain layer
pub type BlockHeight = u64;

/// Blake2b 256-bit hash wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Create hash from bytes using Blake2b
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_parts(&[data])
    }

    /// Hash several byte strings in sequence
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Blake2b512::new();
        for part in parts {
            hasher.update(part);
        }
        let result = hasher.finalize();

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result[..32]);
        Hash(hash)
    }

    /// Get hash as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create hash from hex string
    pub fn from_hex(hex_str: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Transaction ID
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxID(pub String);

impl TxID {
    /// Derive a transaction ID from serialized transaction bytes
    pub fn from_payload(payload: &[u8]) -> Self {
        Self(Hash::from_bytes(payload).to_hex())
    }
}

impl fmt::Display for TxID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed coin value tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Denomination {
    One,
    Five,
    Ten,
    Fifty,
    OneHundred,
    FiveHundred,
    OneThousand,
    FiveThousand,
}

/// Amount that mints exactly one coin of every denomination
pub const ZQ_6666: u64 = 6666;

impl Denomination {
    /// All denominations, smallest first
    pub fn all() -> [Denomination; 8] {
        [
            Denomination::One,
            Denomination::Five,
            Denomination::Ten,
            Denomination::Fifty,
            Denomination::OneHundred,
            Denomination::FiveHundred,
            Denomination::OneThousand,
            Denomination::FiveThousand,
        ]
    }

    /// Coin value in whole units
    pub fn value(&self) -> u64 {
        match self {
            Denomination::One => 1,
            Denomination::Five => 5,
            Denomination::Ten => 10,
            Denomination::Fifty => 50,
            Denomination::OneHundred => 100,
            Denomination::FiveHundred => 500,
            Denomination::OneThousand => 1000,
            Denomination::FiveThousand => 5000,
        }
    }

    /// Look up the denomination with exactly this value
    pub fn from_value(value: u64) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|d| d.value() == value)
            .ok_or(ZerocoinError::InvalidDenomination(value))
    }

    /// Stable one-byte tag used in hashes and transcripts
    pub fn as_byte(&self) -> u8 {
        match self {
            Denomination::One => 0,
            Denomination::Five => 1,
            Denomination::Ten => 2,
            Denomination::Fifty => 3,
            Denomination::OneHundred => 4,
            Denomination::FiveHundred => 5,
            Denomination::OneThousand => 6,
            Denomination::FiveThousand => 7,
        }
    }

    /// Split an amount into denominations, largest first, using as few coins as possible
    /// Number of coins `decompose` would return, without building them
    pub fn coin_count(amount: u64) -> u64 {
        let mut remaining = amount;
        let mut count = 0;
        for denom in Self::all().into_iter().rev() {
            count += remaining / denom.value();
            remaining %= denom.value();
        }
        count
    }

    pub fn decompose(amount: u64) -> Vec<Denomination> {
        let mut remaining = amount;
        let mut coins = Vec::new();
        for denom in Self::all().into_iter().rev() {
            let count = remaining / denom.value();
            coins.extend(std::iter::repeat(denom).take(count as usize));
            remaining %= denom.value();
        }
        coins
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Context a spend proof is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpendType {
    /// Typical spend; the coin is unusable afterwards
    Spend,
    /// Spend that occurs as a stake
    Stake,
    /// Proof of ownership for masternode collateral
    MnCollateral,
    /// Message signing
    SignMessage,
}

impl SpendType {
    pub fn as_byte(&self) -> u8 {
        match self {
            SpendType::Spend => 0,
            SpendType::Stake => 1,
            SpendType::MnCollateral => 2,
            SpendType::SignMessage => 3,
        }
    }
}

impl fmt::Display for SpendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpendType::Spend => "spend",
            SpendType::Stake => "stake",
            SpendType::MnCollateral => "mn-collateral",
            SpendType::SignMessage => "sign-message",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SpendType {
    type Err = ZerocoinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spend" => Ok(SpendType::Spend),
            "stake" => Ok(SpendType::Stake),
            "mn-collateral" | "mn_collateral" => Ok(SpendType::MnCollateral),
            "sign-message" | "sign_message" => Ok(SpendType::SignMessage),
            other => Err(ZerocoinError::Configuration(format!(
                "unknown spend type: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let data = b"test data";

        let hash1 = Hash::from_bytes(data);
        let hash2 = Hash::from_bytes(data);
        assert_eq!(hash1, hash2);

        let hash3 = Hash::from_bytes(b"different data");
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_hash_parts_match_concatenation() {
        assert_eq!(
            Hash::from_parts(&[b"abc", b"def"]),
            Hash::from_bytes(b"abcdef")
        );
    }

    #[test]
    fn test_hash_hex_conversion() {
        let hash = Hash::from_bytes(b"test data");
        let hash_from_hex = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, hash_from_hex);

        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_denomination_values() {
        let values: Vec<u64> = Denomination::all().iter().map(|d| d.value()).collect();
        assert_eq!(values, vec![1, 5, 10, 50, 100, 500, 1000, 5000]);

        assert_eq!(Denomination::from_value(50).unwrap(), Denomination::Fifty);
        assert!(matches!(
            Denomination::from_value(20),
            Err(ZerocoinError::InvalidDenomination(20))
        ));
    }

    #[test]
    fn test_decompose() {
        let coins = Denomination::decompose(ZQ_6666);
        assert_eq!(coins.len(), 8);
        assert_eq!(coins[0], Denomination::FiveThousand);
        assert_eq!(coins[7], Denomination::One);

        let coins = Denomination::decompose(26);
        assert_eq!(
            coins,
            vec![
                Denomination::Ten,
                Denomination::Ten,
                Denomination::Five,
                Denomination::One
            ]
        );

        assert!(Denomination::decompose(0).is_empty());
    }

    #[test]
    fn test_coin_count() {
        assert_eq!(Denomination::coin_count(ZQ_6666), 8);
        assert_eq!(Denomination::coin_count(26), 4);
        assert_eq!(Denomination::coin_count(0), 0);
        assert_eq!(Denomination::coin_count(u64::MAX), u64::MAX / 5000 + 5);
    }

    #[test]
    fn test_spend_type_parsing() {
        assert_eq!("stake".parse::<SpendType>().unwrap(), SpendType::Stake);
        assert_eq!(
            "MN_COLLATERAL".parse::<SpendType>().unwrap(),
            SpendType::MnCollateral
        );
        assert!("bogus".parse::<SpendType>().is_err());

        let tags: Vec<u8> = [
            SpendType::Spend,
            SpendType::Stake,
            SpendType::MnCollateral,
            SpendType::SignMessage,
        ]
        .iter()
        .map(|t| t.as_byte())
        .collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_serialization() {
        let denom = Denomination::OneHundred;
        let serialized = serde_json::to_string(&denom).unwrap();
        let deserialized: Denomination = serde_json::from_str(&serialized).unwrap();
        assert_eq!(denom, deserialized);
    }
}
