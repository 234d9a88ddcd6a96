//! Coin cryptography: secrets, commitments and group helpers

pub mod commitment;
pub mod types;

pub use commitment::{
    compute_public_value, decode_public_value, derive_serial, generate_coin_secret,
    generator_h, hash_to_point, hash_to_scalar, serial_matches_trapdoor, COIN_VERSION,
};
pub use types::{CoinSecret, PublicValue, SerialNumber};
