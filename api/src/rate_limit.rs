use std::{
    collections::HashMap,
    env,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, MatchedPath, State},
    http::{header::RETRY_AFTER, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

const DEFAULT_MAX_REQUESTS: u32 = 5;
const DEFAULT_WINDOW_SECONDS: u64 = 15 * 60;

const HEADER_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait before sending again";

/// Fixed-window limiter keyed by client IP and endpoint.
///
/// Only state-changing requests are counted; preflights, health checks and
/// metric scrapes pass straight through.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<RateLimitConfig>,
    buckets: Arc<Mutex<HashMap<BucketKey, BucketState>>>,
}

impl RateLimitState {
    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }

    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_request<B>(&self, request: &Request<B>) -> Option<RateLimitDecision> {
        if !is_write_method(request.method()) {
            return None;
        }

        let limit = self.config.max_requests;
        let key = BucketKey {
            ip: extract_client_ip(request, self.config.trust_forwarded),
            endpoint_key: endpoint_key(request),
        };
        let now = Instant::now();

        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");

        // Drop windows that have fully expired so the table stays bounded.
        let window = self.config.window;
        buckets.retain(|_, bucket| now.duration_since(bucket.window_start) < window);

        let bucket = buckets.entry(key).or_insert_with(|| BucketState {
            window_start: now,
            count: 0,
        });

        let remaining_window = window.saturating_sub(now.duration_since(bucket.window_start));
        let reset_seconds = ceil_duration_to_seconds(remaining_window).max(1);

        if bucket.count >= limit {
            return Some(RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_seconds,
            });
        }

        bucket.count += 1;
        Some(RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(bucket.count),
            reset_seconds,
        })
    }
}

pub struct RateLimitConfig {
    max_requests: u32,
    window: Duration,
    /// Key clients by `x-forwarded-for` / `x-real-ip`. Only safe behind a
    /// proxy that overwrites these headers.
    trust_forwarded: bool,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window: window.max(Duration::from_secs(1)),
            trust_forwarded: false,
        }
    }

    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    fn from_env() -> Self {
        let max_requests = env_u32("RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS);
        let window_seconds = env_u64("RATE_LIMIT_WINDOW_SECONDS", DEFAULT_WINDOW_SECONDS);
        let trust_forwarded = env_flag("TRUST_PROXY_HEADERS");

        tracing::info!(
            max_requests,
            window_seconds,
            trust_forwarded,
            "Rate limiter configured"
        );

        Self::new(max_requests, Duration::from_secs(window_seconds))
            .trust_forwarded_headers(trust_forwarded)
    }
}

#[derive(Hash, Eq, PartialEq)]
struct BucketKey {
    ip: String,
    endpoint_key: String,
}

struct BucketState {
    window_start: Instant,
    count: u32,
}

struct RateLimitDecision {
    allowed: bool,
    limit: u32,
    remaining: u32,
    reset_seconds: u64,
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(decision) = rate_limiter.check_request(&request) else {
        return next.run(request).await;
    };

    if !decision.allowed {
        tracing::warn!(
            ip = %extract_client_ip(&request, rate_limiter.config.trust_forwarded),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        let mut response =
            ApiError::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE).into_response();
        attach_rate_limit_headers(&mut response, &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&decision.reset_seconds.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("1")),
        );
        return response;
    }

    let mut response = next.run(request).await;
    attach_rate_limit_headers(&mut response, &decision);
    response
}

fn attach_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_LIMIT,
        HeaderValue::from_str(&decision.limit.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_REMAINING,
        HeaderValue::from_str(&decision.remaining.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_RESET,
        HeaderValue::from_str(&decision.reset_seconds.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("1")),
    );
}

fn extract_client_ip<B>(request: &Request<B>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_x_forwarded_for)
        {
            return ip.to_string();
        }

        if let Some(ip) = request
            .headers()
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_ip_addr)
        {
            return ip.to_string();
        }
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

fn parse_x_forwarded_for(raw: &str) -> Option<IpAddr> {
    raw.split(',').map(str::trim).find_map(parse_ip_addr)
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn is_write_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn endpoint_key<B>(request: &Request<B>) -> String {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str())
        .unwrap_or_else(|| request.uri().path());
    format!("{} {}", request.method(), path)
}

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("Invalid value for {key} (`{raw}`), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("Invalid value for {key} (`{raw}`), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_flag(key: &str) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

fn ceil_duration_to_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::Service;

    fn test_app(max_requests: u32, window: Duration) -> Router<()> {
        app_with_config(RateLimitConfig::new(max_requests, window).trust_forwarded_headers(true))
    }

    fn app_with_config(config: RateLimitConfig) -> Router<()> {
        let limiter = RateLimitState::new(config);

        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/contact", post(|| async { "sent" }))
            .layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ))
    }

    async fn call(app: &Router<()>, request: Request<Body>) -> Response {
        let mut svc = app.clone();
        svc.call(request).await.unwrap()
    }

    fn post_from(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/contact")
            .method("POST")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn returns_429_after_limit() {
        let app = test_app(5, Duration::from_secs(900));

        for _ in 0..5 {
            let response = call(&app, post_from("203.0.113.10")).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = call(&app, post_from("203.0.113.10")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(RETRY_AFTER));
        assert!(response.headers().contains_key("x-correlation-id"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], RATE_LIMITED_MESSAGE);
    }

    #[tokio::test]
    async fn includes_rate_limit_headers() {
        let app = test_app(2, Duration::from_secs(60));

        let response = call(&app, post_from("198.51.100.22")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HEADER_RATE_LIMIT_LIMIT], "2");
        assert_eq!(response.headers()[HEADER_RATE_LIMIT_REMAINING], "1");
        assert!(response.headers().contains_key(HEADER_RATE_LIMIT_RESET));
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let app = test_app(1, Duration::from_secs(60));

        assert_eq!(call(&app, post_from("192.0.2.1")).await.status(), StatusCode::OK);
        assert_eq!(
            call(&app, post_from("192.0.2.1")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(call(&app, post_from("192.0.2.2")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn allows_requests_again_after_window_reset() {
        let app = test_app(1, Duration::from_secs(1));

        assert_eq!(call(&app, post_from("192.0.2.44")).await.status(), StatusCode::OK);
        assert_eq!(
            call(&app, post_from("192.0.2.44")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(call(&app, post_from("192.0.2.44")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reads_are_not_counted() {
        let app = test_app(1, Duration::from_secs(60));

        for _ in 0..10 {
            let response = call(
                &app,
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .header("x-forwarded-for", "198.51.100.99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(!response.headers().contains_key(HEADER_RATE_LIMIT_LIMIT));
        }

        assert_eq!(call(&app, post_from("198.51.100.99")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_headers_ignored_unless_trusted() {
        let app = app_with_config(RateLimitConfig::new(1, Duration::from_secs(60)));

        assert_eq!(call(&app, post_from("192.0.2.10")).await.status(), StatusCode::OK);
        // Rotating the header does not open a new bucket.
        assert_eq!(
            call(&app, post_from("192.0.2.11")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn client_ip_falls_back_to_peer_address() {
        let mut request = post_from("198.51.100.1");
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000))));

        assert_eq!(extract_client_ip(&request, false), "10.0.0.9");
        assert_eq!(extract_client_ip(&request, true), "198.51.100.1");
    }

    #[test]
    fn parses_forwarded_chain() {
        assert_eq!(
            parse_x_forwarded_for("unknown, 203.0.113.5, 10.0.0.1"),
            Some("203.0.113.5".parse().unwrap())
        );
        assert_eq!(parse_ip_addr("127.0.0.1:8080"), Some("127.0.0.1".parse().unwrap()));
    }
}
