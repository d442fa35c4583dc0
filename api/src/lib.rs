pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod notification;
pub mod observability;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod validation;

use axum::extract::{DefaultBodyLimit, MatchedPath};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::rate_limit::RateLimitState;
use crate::state::AppState;

/// Largest request body accepted on any route
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Assemble the full HTTP surface: routes, rate limiting, CORS, security
/// headers and request logging.
pub fn build_router(state: AppState, rate_limit: RateLimitState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin `{origin}`");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(routes::contact_routes())
        .merge(routes::health_routes())
        .merge(routes::observability_routes())
        .fallback(handlers::route_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            rate_limit,
            rate_limit::rate_limit_middleware,
        ))
        .layer(cors)
        .layer(security_header("x-content-type-options", "nosniff"))
        .layer(security_header("x-frame-options", "DENY"))
        .layer(security_header("referrer-policy", "no-referrer"))
        .layer(security_header("content-security-policy", "default-src 'none'"))
        .layer(middleware::from_fn(request_logger))
        .with_state(state)
}

fn security_header(name: &'static str, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static(name),
        HeaderValue::from_static(value),
    )
}

async fn request_logger(
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    metrics::observe_http(method.as_str(), &route, status, elapsed.as_secs_f64());
    tracing::info!("{method} {uri} {status} {}ms", elapsed.as_millis());

    response
}
