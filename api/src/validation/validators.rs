//! Submission-level validation
//!
//! Composes per-field sanitizer results into a single pass/fail decision.

use thiserror::Error;

use super::sanitizers::{is_email_shaped, sanitize, sanitize_optional};
use crate::models::{RawSubmission, Submission};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid email format")]
    InvalidEmailFormat,
}

/// Sanitize every field and check the submission as a whole.
///
/// `company` is optional and may come back empty. An email that was supplied
/// but blanked by the sanitizer, or that fails the shape check here, yields
/// [`ValidationError::InvalidEmailFormat`].
pub fn validate(raw: &RawSubmission) -> Result<Submission, ValidationError> {
    let name = sanitize(&raw.name, "name");
    let email = sanitize(&raw.email, "email");
    let company = sanitize_optional(raw.company.as_ref(), "company");
    let message = sanitize(&raw.message, "message");

    // A supplied email that the sanitizer blanked is a format problem, not a
    // missing field.
    let email_supplied = raw
        .email
        .as_str()
        .is_some_and(|value| !value.trim().is_empty());

    if name.is_empty() || !email_supplied || message.is_empty() {
        tracing::warn!(
            name_present = !name.is_empty(),
            email_present = email_supplied,
            message_present = !message.is_empty(),
            "Missing required fields"
        );
        return Err(ValidationError::MissingFields);
    }

    if email.is_empty() || !is_email_shaped(&email) {
        tracing::warn!("Invalid email format");
        return Err(ValidationError::InvalidEmailFormat);
    }

    Ok(Submission {
        name,
        email,
        company,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn count(lines: &[&str], needle: &str) -> usize {
        lines
            .iter()
            .filter(|l| l.contains("WARN") && l.contains(needle))
            .count()
    }

    #[test]
    fn test_valid_submission_defaults_company() {
        let raw = RawSubmission::from_strings("Alice", "alice@example.com", None, "Hi");
        let submission = validate(&raw).unwrap();
        assert_eq!(
            submission,
            Submission {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                company: String::new(),
                message: "Hi".to_string(),
            }
        );
    }

    #[test]
    fn test_fields_are_trimmed() {
        let raw = RawSubmission::from_strings(" Alice ", " alice@example.com ", Some(" Acme "), " Hi ");
        let submission = validate(&raw).unwrap();
        assert_eq!(submission.name, "Alice");
        assert_eq!(submission.email, "alice@example.com");
        assert_eq!(submission.company, "Acme");
        assert_eq!(submission.message, "Hi");
    }

    #[test]
    fn test_empty_name_is_missing() {
        let raw = RawSubmission::from_strings("", "a@b.co", None, "Hi");
        assert_eq!(validate(&raw), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_absent_message_is_missing() {
        let raw: RawSubmission =
            serde_json::from_value(json!({"name": "Alice", "email": "a@b.co"})).unwrap();
        assert_eq!(validate(&raw), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_rejected_message_counts_as_missing() {
        let raw = RawSubmission::from_strings("Alice", "a@b.co", None, "DROP TABLE users");
        assert_eq!(validate(&raw), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_malformed_email_fails() {
        let raw = RawSubmission::from_strings("Bob", "bob[at]example", None, "Hi");
        assert_eq!(validate(&raw), Err(ValidationError::InvalidEmailFormat));
    }

    #[test]
    fn test_email_with_keyword_is_invalid_format() {
        let raw = RawSubmission::from_strings("Bob", "drop@x.or.com", None, "Hi");
        assert_eq!(validate(&raw), Err(ValidationError::InvalidEmailFormat));
    }

    #[test]
    fn test_blank_or_non_string_email_is_missing() {
        let blank = RawSubmission::from_strings("Bob", "   ", None, "Hi");
        assert_eq!(validate(&blank), Err(ValidationError::MissingFields));

        let numeric: RawSubmission =
            serde_json::from_value(json!({"name": "Bob", "email": 7, "message": "Hi"})).unwrap();
        assert_eq!(validate(&numeric), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_rejected_company_is_not_fatal() {
        let raw = RawSubmission::from_strings("Alice", "a@b.co", Some("Fish & Chips"), "Hi");
        let submission = validate(&raw).unwrap();
        assert_eq!(submission.company, "");
    }

    #[traced_test]
    #[test]
    fn test_missing_fields_emits_single_warning() {
        let raw = RawSubmission::from_strings("", "a@b.co", None, "Hi");
        assert_eq!(validate(&raw), Err(ValidationError::MissingFields));
        logs_assert(|lines: &[&str]| {
            match (count(lines, "Missing required fields"), count(lines, "")) {
                (1, 1) => Ok(()),
                (rule, all) => Err(format!("expected 1 warning, got {rule} of {all}")),
            }
        });
    }

    #[traced_test]
    #[test]
    fn test_invalid_email_emits_single_validator_warning() {
        let raw = RawSubmission::from_strings("Bob", "bob[at]example", None, "Hi");
        assert_eq!(validate(&raw), Err(ValidationError::InvalidEmailFormat));
        logs_assert(|lines: &[&str]| {
            match (
                count(lines, "Invalid email format"),
                count(lines, "Rejected suspicious email"),
            ) {
                (1, 1) => Ok(()),
                (rule, field) => Err(format!(
                    "expected one validator and one sanitizer warning, got {rule} and {field}"
                )),
            }
        });
        assert!(!logs_contain("bob[at]example"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ValidationError::MissingFields.to_string(), "Missing required fields");
        assert_eq!(ValidationError::InvalidEmailFormat.to_string(), "Invalid email format");
    }
}
