//! Cryptographic types for zerocoin mints and spends

use crate::types::Denomination;
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Compressed Ristretto encoding of a coin commitment, published on mint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicValue(pub [u8; 32]);

impl PublicValue {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Get public value as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create public value from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut value = [0u8; 32];
        value.copy_from_slice(&bytes);
        Ok(PublicValue(value))
    }

    /// Short form for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for PublicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Serial number revealed at spend time; spending it twice is a double spend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SerialNumber(pub [u8; 32]);

impl SerialNumber {
    /// Create serial number from its scalar form
    pub fn from_scalar(scalar: &Scalar) -> Self {
        SerialNumber(scalar.to_bytes())
    }

    /// Get serial number as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create serial number from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut serial = [0u8; 32];
        serial.copy_from_slice(&bytes);
        Ok(SerialNumber(serial))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Wallet-held secret for one coin. Never serialized; wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CoinSecret {
    pub(crate) serial: Scalar,
    pub(crate) randomness: Scalar,
    pub(crate) trapdoor: Scalar,
    #[zeroize(skip)]
    pub(crate) denomination: Denomination,
}

impl CoinSecret {
    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    pub fn serial_number(&self) -> SerialNumber {
        SerialNumber::from_scalar(&self.serial)
    }
}

impl fmt::Debug for CoinSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoinSecret")
            .field("denomination", &self.denomination)
            .field("serial", &self.serial_number())
            .finish_non_exhaustive()
    }
}
