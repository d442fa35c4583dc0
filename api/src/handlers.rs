use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    metrics,
    models::SubmissionAccepted,
    state::AppState,
    validation::ValidatedSubmission,
};

/// `POST /contact`
pub async fn submit_contact(
    State(state): State<AppState>,
    ValidatedSubmission(submission): ValidatedSubmission,
) -> ApiResult<Json<SubmissionAccepted>> {
    if let Err(err) = state.dispatcher.dispatch(&submission).await {
        tracing::error!(
            error = %err,
            cause = ?std::error::Error::source(&err),
            "Failed to dispatch contact notifications"
        );
        metrics::record_submission("failed");
        return Err(ApiError::internal());
    }

    tracing::info!("Contact submission accepted");
    metrics::record_submission("accepted");
    Ok(Json(SubmissionAccepted::default()))
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = metrics::gather_metrics(&state.registry);
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

pub async fn route_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
