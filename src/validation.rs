// Request-boundary validation
// Rejects malformed input before any transaction begins. The engine
// re-checks the amount rules inside its own transaction; these checks
// exist so bad requests never touch the store at all.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerError;

/// Maximum customer name length in characters.
pub const NAME_MAX_LEN: usize = 100;

/// Fixed decimal scale for all monetary values. High enough that repeated
/// transfers never accumulate rounding drift.
pub const AMOUNT_MAX_SCALE: u32 = 20;

/// Widest supported integral part: 16 digits before the decimal point,
/// mirroring a NUMERIC(36,20) column. Values wider than this cannot be
/// added exactly at scale 20, so they are rejected before any arithmetic.
pub const AMOUNT_MAX_INTEGRAL_DIGITS: u32 = 16;

/// Validate a customer name and normalize it to title case.
///
/// Allowed characters: letters, whitespace, hyphens, apostrophes.
/// Length: 1..=100 characters. "jane doe" becomes "Jane Doe",
/// "o'brien" becomes "O'Brien".
pub fn normalize_customer_name(raw: &str) -> Result<String, LedgerError> {
    if raw.is_empty() || raw.chars().count() > NAME_MAX_LEN {
        return Err(LedgerError::Validation(format!(
            "Name must be between 1 and {NAME_MAX_LEN} characters"
        )));
    }

    let valid = raw
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_ascii_whitespace() || c == '-' || c == '\'');
    if !valid {
        return Err(LedgerError::Validation(
            "Name must contain only letters, spaces, hyphens, and apostrophes".to_string(),
        ));
    }

    Ok(title_case(raw))
}

/// Uppercase every letter that follows a non-letter, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_ascii_alphabetic() {
            if prev_alpha {
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c.to_ascii_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Validate a transfer amount: strictly positive, within the money bounds.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    validate_bounds(amount)
}

/// Validate an opening balance: strictly positive, within the money bounds.
pub fn validate_initial_balance(balance: Decimal) -> Result<(), LedgerError> {
    if balance <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "Initial balance must be positive".to_string(),
        ));
    }
    validate_bounds(balance)
}

fn validate_bounds(value: Decimal) -> Result<(), LedgerError> {
    if value.scale() > AMOUNT_MAX_SCALE {
        return Err(LedgerError::Validation(format!(
            "Amount must have at most {AMOUNT_MAX_SCALE} decimal places"
        )));
    }
    if value.abs().trunc() >= integral_limit() {
        return Err(LedgerError::Validation(format!(
            "Amount must have at most {AMOUNT_MAX_INTEGRAL_DIGITS} digits before the decimal point"
        )));
    }
    Ok(())
}

fn integral_limit() -> Decimal {
    Decimal::from(10_u64.pow(AMOUNT_MAX_INTEGRAL_DIGITS))
}

/// Parse a path segment as a UUID. A malformed identifier is a validation
/// failure (422), not a routing miss.
pub fn parse_id(raw: &str) -> Result<Uuid, LedgerError> {
    Uuid::parse_str(raw)
        .map_err(|_| LedgerError::Validation(format!("Invalid identifier: {raw}")))
}
