//! Loyalty point adjustments.
//!
//! Points move only through an explicit adjustment; nothing in the ordering
//! or billing flow earns or spends them.

use crate::DomainError;

/// Applies `delta` to `balance` and returns the new balance.
///
/// # Errors
/// [`DomainError::InsufficientPoints`] if the result would be negative.
pub fn adjust_points(balance: i32, delta: i32) -> Result<i32, DomainError> {
    let next = balance
        .checked_add(delta)
        .ok_or(DomainError::InvalidPointsDelta { balance, delta })?;
    if next < 0 {
        return Err(DomainError::InsufficientPoints { balance, delta });
    }
    Ok(next)
}
