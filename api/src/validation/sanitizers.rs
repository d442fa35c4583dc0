//! Input sanitization functions
//!
//! Every contact form field passes through [`sanitize`] exactly once. A
//! rejected value collapses to the empty string, which the validator then
//! treats as missing.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::metrics;

lazy_static! {
    /// Email shape: word/dot/dash local part and domain, TLD of 2+ word chars
    pub(crate) static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[\w.-]+@[\w.-]+\.\w{2,}$").unwrap();

    /// Injection patterns, scanned in order against the escaped value
    static ref INJECTION_PATTERNS: [Regex; 4] = [
        Regex::new(r"(?i)<script.*?>.*?</script>").unwrap(),
        Regex::new(r"(?:--|\|\||;)").unwrap(),
        Regex::new(r"(?i)\b(UNION|SELECT|INSERT|DELETE|UPDATE|DROP|OR|AND)\b").unwrap(),
        Regex::new(r"(?i)\b(alert|onerror|onload)\b").unwrap(),
    ];
}

/// Sanitize one untrusted field.
///
/// Returns the trimmed, HTML-escaped value, or `""` when the value is not a
/// string, fails the email shape check (for the `email` field), or matches an
/// injection pattern. Each rejection emits one warning.
pub fn sanitize(value: &Value, field_name: &str) -> String {
    let Some(raw) = value.as_str() else {
        tracing::warn!(field = field_name, "Rejected non-string input in {field_name}");
        metrics::record_rejection(field_name);
        return String::new();
    };

    let trimmed = raw.trim();

    if field_name == "email" && !is_email_shaped(trimmed) {
        tracing::warn!(field = field_name, "Rejected suspicious email");
        metrics::record_rejection(field_name);
        return String::new();
    }

    // Escaping runs before the scan, so the scan sees entities, not raw markup.
    let escaped = escape_html(trimmed);

    if INJECTION_PATTERNS.iter().any(|p| p.is_match(&escaped)) {
        tracing::warn!(
            field = field_name,
            "Rejected suspicious input in {field_name}: '{escaped}'"
        );
        metrics::record_rejection(field_name);
        return String::new();
    }

    escaped
}

/// Sanitize an optional field; an absent value is accepted as empty.
pub fn sanitize_optional(value: Option<&Value>, field_name: &str) -> String {
    match value {
        Some(v) => sanitize(v, field_name),
        None => String::new(),
    }
}

pub fn is_email_shaped(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Escape HTML special characters, including both quote styles
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
