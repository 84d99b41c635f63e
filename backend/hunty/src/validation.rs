//! Input checks run before any cache lookup or network access.

use crate::errors::RegistrationError;

/// Length of a Stellar account public key in StrKey form.
pub const PUBLIC_KEY_LEN: usize = 56;

/// Reject non-positive hunt ids. Returns the id as `u64` on success.
pub fn validate_hunt_id(hunt_id: i64) -> Result<u64, RegistrationError> {
    if hunt_id <= 0 {
        return Err(RegistrationError::InvalidHuntId);
    }
    Ok(hunt_id as u64)
}

/// Shape check only: `G` prefix and 56 characters after trimming.
pub fn validate_player_address(address: &str) -> Result<&str, RegistrationError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(RegistrationError::MissingPlayerAddress);
    }
    if !trimmed.starts_with('G') || trimmed.chars().count() != PUBLIC_KEY_LEN {
        return Err(RegistrationError::MalformedPlayerAddress);
    }
    Ok(trimmed)
}
