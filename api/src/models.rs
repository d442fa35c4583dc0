use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untrusted contact form body as it arrives on the wire.
///
/// Fields are kept as raw JSON values so that a number or an object sent in
/// place of a string reaches the sanitizer instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmission {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub company: Option<Value>,
    #[serde(default)]
    pub message: Value,
}

impl RawSubmission {
    /// Convenience constructor for string-only payloads.
    pub fn from_strings(name: &str, email: &str, company: Option<&str>, message: &str) -> Self {
        Self {
            name: Value::from(name),
            email: Value::from(email),
            company: company.map(Value::from),
            message: Value::from(message),
        }
    }
}

/// A sanitized, validated contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub company: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionAccepted {
    pub status: &'static str,
}

impl Default for SubmissionAccepted {
    fn default() -> Self {
        Self { status: "success" }
    }
}
