//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Limits are chosen for reasonable UX on names and contact handles;
//! the store enforces product/quantity rules separately.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Customer names
pub const MAX_NAME_LEN: usize = 200;

/// Contact handles (phone numbers)
pub const MAX_CONTACT_LEN: usize = 32;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate a WhatsApp-style contact handle: `08` followed by 8-11 digits.
pub fn validate_contact_handle(value: &str) -> Result<(), AppError> {
    validate_required_text(value, "contact_handle", MAX_CONTACT_LEN)?;
    let digits_after_prefix = value.len().saturating_sub(2);
    let valid = value.starts_with("08")
        && (8..=11).contains(&digits_after_prefix)
        && value.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(AppError::validation(
            "contact_handle must match 08 followed by 8-11 digits",
        ));
    }
    Ok(())
}
