use once_cell::sync::Lazy;
use prometheus::{opts, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Registry, TextEncoder};

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! histogram_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| {
            HistogramVec::new(HistogramOpts::new($name, $help).buckets(LATENCY_BUCKETS.to_vec()), $labels)
                .unwrap()
        })
    };
}

const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "path", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> =
    histogram_vec!("http_request_duration_seconds", "HTTP request latency", &["method", "path"]);

// ── Contact form ────────────────────────────────────────────────────────────
pub static SUBMISSIONS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("submissions_total", "Contact form submissions by outcome", &["outcome"]);
pub static SANITIZER_REJECTIONS: Lazy<IntCounterVec> =
    counter_vec!("sanitizer_rejections_total", "Field values rejected by the sanitizer", &["field"]);

// ── Mail ────────────────────────────────────────────────────────────────────
pub static EMAILS_SENT: Lazy<IntCounterVec> =
    counter_vec!("emails_sent_total", "Notification emails handed to the transport", &["kind"]);
pub static EMAIL_FAILURES: Lazy<IntCounterVec> =
    counter_vec!("email_failures_total", "Notification emails that failed to send", &["kind"]);

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(SUBMISSIONS_TOTAL.clone()))?;
    r.register(Box::new(SANITIZER_REJECTIONS.clone()))?;
    r.register(Box::new(EMAILS_SENT.clone()))?;
    r.register(Box::new(EMAIL_FAILURES.clone()))?;
    Ok(())
}

pub fn gather_metrics(r: &Registry) -> String {
    let encoder = TextEncoder::new();
    let families = r.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).unwrap_or_default();
    String::from_utf8(buf).unwrap_or_default()
}

pub fn observe_http(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_submission(outcome: &str) {
    SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_rejection(field: &str) {
    SANITIZER_REJECTIONS.with_label_values(&[field]).inc();
}

pub fn record_email(kind: &str, delivered: bool) {
    if delivered {
        EMAILS_SENT.with_label_values(&[kind]).inc();
    } else {
        EMAIL_FAILURES.with_label_values(&[kind]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new_custom(Some("test".into()), None).unwrap();
        register_all(&registry).unwrap();
        record_submission("accepted");
        record_email("admin", true);
        let text = gather_metrics(&registry);
        assert!(text.contains("test_submissions_total"));
        assert!(text.contains("test_emails_sent_total"));
    }

    #[test]
    fn test_metric_names_prefixed() {
        let registry = Registry::new_custom(Some("prefixed".into()), None).unwrap();
        register_all(&registry).unwrap();
        observe_http("GET", "/health", 200, 0.001);
        for fam in registry.gather() {
            assert!(
                fam.get_name().starts_with("prefixed_"),
                "metric {} missing prefix",
                fam.get_name()
            );
        }
    }
}
