//! Input validation helpers
//!
//! Field limits for accounts, catalog entries and orders. Every helper returns
//! the normalized value (trimmed, lowercased where relevant) or a message fit
//! for showing to the user.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

// ── Text length limits ──────────────────────────────────────────────

pub const MAX_FULL_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

pub const MAX_PRODUCT_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_CATEGORY_LEN: usize = 50;

pub const MAX_RECIPIENT_LEN: usize = 100;

/// Prices and totals carry at most this many decimal places.
pub const MONEY_SCALE: u32 = 2;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r".+@.+\..+").expect("static email pattern"));

// ── Text ────────────────────────────────────────────────────────────

/// Trim a required string and check it is non-empty and within `max_len` chars.
pub fn required_text(value: &str, field: &str, max_len: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(format!("{field} is too long ({len} chars, max {max_len})"));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional string. Blank input collapses to `None`.
pub fn optional_text(value: Option<&str>, field: &str, max_len: usize) -> Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(v, field, max_len).map(Some),
    }
}

// ── Accounts ────────────────────────────────────────────────────────

pub fn email(value: &str) -> Result<String, String> {
    let email = required_text(value, "Email", MAX_EMAIL_LEN)?.to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err("Please provide a valid email address".to_string());
    }
    Ok(email)
}

pub fn password(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters long"));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(format!("Password is too long (max {MAX_PASSWORD_LEN} characters)"));
    }
    Ok(())
}

// ── Numbers ─────────────────────────────────────────────────────────

/// Non-negative amount with at most two decimal places.
pub fn price(value: Decimal) -> Result<Decimal, String> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err("Price cannot be negative".to_string());
    }
    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err("Price must have at most 2 decimal places".to_string());
    }
    Ok(normalized)
}

/// Order line quantity: a whole number of at least one unit.
pub fn quantity(value: u32) -> Result<u32, String> {
    if value == 0 {
        return Err("Quantity must be at least 1".to_string());
    }
    Ok(value)
}

/// Round a computed amount to money precision (half away from zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims_and_limits() {
        assert_eq!(required_text("  Widget ", "Name", 10), Ok("Widget".to_string()));
        assert!(required_text("   ", "Name", 10).unwrap_err().contains("required"));
        assert!(required_text("abcdefghijk", "Name", 10).unwrap_err().contains("too long"));
        // Limits count characters, not bytes.
        assert!(required_text("ééééé", "Name", 5).is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(None, "Description", 5), Ok(None));
        assert_eq!(optional_text(Some("  "), "Description", 5), Ok(None));
        assert_eq!(optional_text(Some(" ab "), "Description", 5), Ok(Some("ab".to_string())));
        assert!(optional_text(Some("abcdef"), "Description", 5).is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" Alice@Example.COM "), Ok("alice@example.com".to_string()));
        assert!(email("alice.example.com").is_err());
        assert!(email("alice@example").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
        assert!(password(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    #[test]
    fn test_price() {
        assert_eq!(price(Decimal::new(1000, 2)), Ok(Decimal::new(10, 0)));
        assert!(price(Decimal::new(1999, 2)).is_ok());
        assert!(price(Decimal::ZERO).is_ok());
        assert!(price(Decimal::new(-1, 2)).is_err());
        assert!(price(Decimal::new(1001, 3)).is_err());
    }

    #[test]
    fn test_quantity_and_rounding() {
        assert!(quantity(0).is_err());
        assert_eq!(quantity(3), Ok(3));
        assert_eq!(round_money(Decimal::new(10005, 3)), Decimal::new(1001, 2));
    }
}
