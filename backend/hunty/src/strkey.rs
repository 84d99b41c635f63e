//! Stellar account addresses (`G...`) to raw ed25519 keys and back.

use stellar_strkey::ed25519::PublicKey;

use crate::errors::{HuntyError, Result};

/// Decode a `G...` address into its raw ed25519 public key.
pub fn decode_account_id(address: &str) -> Result<[u8; 32]> {
    PublicKey::from_string(address.trim())
        .map(|key| key.0)
        .map_err(|e| HuntyError::Xdr(format!("Invalid account address {address}: {e}")))
}

/// Encode a raw ed25519 public key as a `G...` address.
pub fn encode_account_id(key: &[u8; 32]) -> String {
    PublicKey(*key).to_string()
}
