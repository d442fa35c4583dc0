use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, state::AppState};

pub fn contact_routes() -> Router<AppState> {
    Router::new().route(
        "/contact",
        post(handlers::submit_contact).fallback(handlers::method_not_allowed),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route(
        "/health",
        get(handlers::health_check).fallback(handlers::method_not_allowed),
    )
}

pub fn observability_routes() -> Router<AppState> {
    Router::new().route(
        "/metrics",
        get(handlers::metrics_endpoint).fallback(handlers::method_not_allowed),
    )
}
