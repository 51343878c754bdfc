//! Payload validation applied before any write.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MarkazError, MarkazResult};

/// Egyptian mobile numbers in international form, e.g. `+201012345678`.
static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+201[0125][0-9]{8}$").expect("phone number pattern"));

/// Reject a malformed phone number before anything is written.
pub fn phone_number(value: &str) -> MarkazResult<()> {
    if PHONE_NUMBER.is_match(value) {
        Ok(())
    } else {
        Err(MarkazError::Validation {
            message: format!("invalid phone number: {value}"),
        })
    }
}

/// Names must carry at least one visible character.
pub fn display_name(value: &str) -> MarkazResult<()> {
    if value.trim().is_empty() {
        Err(MarkazError::Validation {
            message: "name must not be empty".into(),
        })
    } else {
        Ok(())
    }
}
