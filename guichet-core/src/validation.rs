//! Centralized validation and normalization utilities
//!
//! Identity normalization lives here so that every component (rate limiter,
//! attempt logger, analyzer) correlates attempts on the same string.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Lazy-loaded email validation regex
///
/// Validates email addresses according to a practical subset of RFC 5322.
/// Loaded once at runtime and reused for all email validation operations.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Normalize an email address into the canonical identity string.
///
/// Trims surrounding whitespace and lower-cases the address. Every stored
/// attempt record and every rate-limit lookup uses the normalized form, so
/// `"User@Example.COM "` and `"user@example.com"` are the same identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an email address
///
/// # Arguments
///
/// * `email` - The email address to validate
///
/// # Returns
///
/// Returns `Ok(())` if the email is valid, or a `ValidationError::InvalidEmail` if invalid.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
        assert_eq!(normalize_email("a@b.com"), "a@b.com");
    }

    #[test]
    fn test_normalize_email_is_idempotent() {
        let variants = ["A@B.com ", " a@B.COM", "a@b.com", "\tA@b.Com\n"];
        for v in variants {
            let once = normalize_email(v);
            assert_eq!(once, "a@b.com");
            assert_eq!(normalize_email(&once), once);
        }
    }

    #[test]
    fn test_validate_email_accepts_valid() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name+tag@sub.example.co").is_ok());
    }

    #[test]
    fn test_validate_email_rejects_invalid() {
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());

        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&too_long).is_err());
    }
}
