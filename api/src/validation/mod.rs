//! Input Validation Module
//!
//! Sanitization and validation of contact form submissions.
//!
//! # Overview
//!
//! 1. **Sanitizers** - per-field cleaning; a rejected value becomes `""`
//! 2. **Validators** - whole-submission pass/fail over sanitized fields
//! 3. **Extractors** - `ValidatedSubmission`, an Axum extractor running both
//!
//! # Usage
//!
//! ```ignore
//! use crate::validation::ValidatedSubmission;
//!
//! pub async fn submit(ValidatedSubmission(submission): ValidatedSubmission) -> impl IntoResponse {
//!     // submission is sanitized and validated
//! }
//! ```
//!
//! # Validation Error Response
//!
//! ```json
//! {"error": "Missing required fields"}
//! ```

pub mod extractors;
pub mod sanitizers;
pub mod validators;

pub use extractors::ValidatedSubmission;
pub use sanitizers::{escape_html, is_email_shaped, sanitize, sanitize_optional};
pub use validators::{validate, ValidationError};
