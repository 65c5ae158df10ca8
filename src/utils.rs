//! Form validation helpers for the auth and card forms.

use crate::config::{MAX_NAME_LEN, MIN_NAME_LEN, MIN_PASSWORD_LEN};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]{2,}$").unwrap());
static DIGIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

/// Validate an email address, returning the trimmed form.
pub fn validate_email(input: &str) -> Result<String, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err("Enter a valid email address".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a password: minimum length plus at least one digit.
pub fn validate_password(input: &str) -> Result<String, String> {
    if input.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if !DIGIT_REGEX.is_match(input) {
        return Err("Password must contain at least one digit".to_string());
    }
    Ok(input.to_string())
}

/// Validate a display name, returning the trimmed form.
pub fn validate_name(input: &str) -> Result<String, String> {
    let trimmed = input.trim();
    if trimmed.len() < MIN_NAME_LEN {
        return Err(format!("Name must be at least {} characters", MIN_NAME_LEN));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(format!("Name cannot exceed {} characters", MAX_NAME_LEN));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(validate_email("dana@example.com").is_ok());
        assert_eq!(
            validate_email("  dana@example.com  ").unwrap(),
            "dana@example.com"
        );
    }

    #[test]
    fn email_validation_rejects_malformed_input() {
        assert!(validate_email("").is_err());
        assert!(validate_email("dana").is_err());
        assert!(validate_email("dana@nodot").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn password_needs_length_and_a_digit() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("longenoughbutnodigit").is_err());
        assert!(validate_password("longenough1").is_ok());
    }

    #[test]
    fn name_length_is_bounded() {
        assert!(validate_name("D").is_err());
        assert!(validate_name("Dana").is_ok());
        assert!(validate_name(&"x".repeat(65)).is_err());
    }
}
