//! Custom Axum extractor for validated contact submissions
//!
//! `ValidatedSubmission` parses the JSON body into a [`RawSubmission`], runs
//! it through [`validate`], and hands the handler a clean [`Submission`].
//! Any failure short-circuits into an [`ApiError`] with a 400 status.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};

use super::validators::validate;
use crate::error::ApiError;
use crate::metrics;
use crate::models::{RawSubmission, Submission};

pub const INVALID_PAYLOAD_MESSAGE: &str = "Invalid JSON payload";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Payload too large";

pub struct ValidatedSubmission(pub Submission);

#[async_trait]
impl<S> FromRequest<S> for ValidatedSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<RawSubmission>::from_request(req, state)
            .await
            .map_err(|err| {
                metrics::record_submission("rejected");

                if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    tracing::warn!("Rejected oversized contact request body");
                    return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_MESSAGE);
                }

                let reason = match &err {
                    JsonRejection::JsonDataError(_) => "body is not a JSON object",
                    JsonRejection::JsonSyntaxError(_) => "JSON syntax error",
                    JsonRejection::MissingJsonContentType(_) => "missing application/json content type",
                    JsonRejection::BytesRejection(_) => "failed to read request body",
                    _ => "unreadable payload",
                };
                tracing::warn!(reason, "Rejected contact request body");
                ApiError::bad_request(INVALID_PAYLOAD_MESSAGE)
            })?;

        let submission = validate(&raw).map_err(|err| {
            metrics::record_submission("rejected");
            ApiError::from(err)
        })?;

        Ok(ValidatedSubmission(submission))
    }
}

impl std::ops::Deref for ValidatedSubmission {
    type Target = Submission;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn json_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/contact")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_valid_submission() {
        let req = json_request(r#"{"name":"Alice","email":"alice@example.com","message":"Hi"}"#);
        let ValidatedSubmission(submission) = ValidatedSubmission::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(submission.name, "Alice");
        assert_eq!(submission.company, "");
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let req = json_request(r#"{"name":"","email":"a@b.co","message":"Hi"}"#);
        let err = ValidatedSubmission::from_request(req, &()).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Missing required fields");
    }

    #[tokio::test]
    async fn test_syntax_error_rejected() {
        let req = json_request("{not json");
        let err = ValidatedSubmission::from_request(req, &()).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), INVALID_PAYLOAD_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_content_type_rejected() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/contact")
            .body(Body::from(r#"{"name":"Alice"}"#))
            .unwrap();
        let err = ValidatedSubmission::from_request(req, &()).await.err().unwrap();
        assert_eq!(err.message(), INVALID_PAYLOAD_MESSAGE);
    }
}
