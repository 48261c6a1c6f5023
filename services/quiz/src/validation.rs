//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate a Telegram username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username must not be empty".to_string());
    }

    if username.chars().count() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate a result category label
pub fn validate_result_type(result_type: &str) -> Result<(), String> {
    if result_type.is_empty() {
        return Err("Result type is required".to_string());
    }

    if result_type.chars().count() > 64 {
        return Err("Result type must be at most 64 characters long".to_string());
    }

    static RESULT_TYPE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = RESULT_TYPE_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Failed to compile result type regex")
    });

    if !regex.is_match(result_type) {
        return Err(
            "Result type can only contain letters, numbers, underscores, and hyphens".to_string(),
        );
    }

    Ok(())
}

/// Validate an optional free-text field against a character limit
pub fn validate_text(field: &str, value: Option<&str>, max_chars: usize) -> Result<(), String> {
    match value {
        Some(text) if text.chars().count() > max_chars => Err(format!(
            "{} must be at most {} characters long",
            field, max_chars
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("a").is_ok());
        assert!(validate_username("demo_user").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_result_type() {
        assert!(validate_result_type("biorobot").is_ok());
        assert!(validate_result_type("half-human_2").is_ok());
        assert!(validate_result_type("").is_err());
        assert!(validate_result_type("drop table").is_err());
        assert!(validate_result_type(&"r".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_text_counts_characters() {
        assert!(validate_text("Result title", None, 3).is_ok());
        assert!(validate_text("Result title", Some("абв"), 3).is_ok());
        assert!(validate_text("Result title", Some("абвг"), 3).is_err());
    }
}
