use stockroom_core::{DomainError, DomainResult};

/// Trimmed, non-blank text.
pub(crate) fn required_text(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Blank labels are stored as absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Largest quantity a single field or ledger entry may carry.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

fn at_most_max(field: &str, value: i64) -> DomainResult<i64> {
    if value > MAX_QUANTITY {
        return Err(DomainError::validation(format!(
            "{field} cannot exceed {MAX_QUANTITY}"
        )));
    }
    Ok(value)
}

pub(crate) fn non_negative(field: &str, value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    at_most_max(field, value)
}

pub(crate) fn positive(field: &str, value: i64) -> DomainResult<i64> {
    if value <= 0 {
        return Err(DomainError::validation(format!("{field} must be greater than 0")));
    }
    at_most_max(field, value)
}
