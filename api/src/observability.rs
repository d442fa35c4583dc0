use anyhow::Result;
use prometheus::Registry;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::metrics;

const LOG_FILE_PREFIX: &str = "contact-api.log";

pub struct Observability {
    pub registry: Registry,
    /// Flushes the file writer on drop; keep alive for the process lifetime
    _file_guard: Option<WorkerGuard>,
}

impl Observability {
    /// Install the global subscriber and build the metrics registry.
    ///
    /// `LOG_FORMAT=json` switches console output to JSON. When `LOG_DIR` is
    /// set, logs are also written to a daily-rolling file in that directory.
    pub fn init() -> Result<Self> {
        let registry = Registry::new_custom(Some("contact".into()), None)?;
        metrics::register_all(&registry)?;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "contact_api=info,tower_http=info".into());

        let json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console_layer = if json {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        let (file_layer, file_guard) = match std::env::var("LOG_DIR") {
            Ok(dir) if !dir.trim().is_empty() => {
                std::fs::create_dir_all(&dir)?;
                let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed();
                (Some(layer), Some(guard))
            }
            _ => (None, None),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!(json, file_logging = file_guard.is_some(), "Observability stack initialized");
        Ok(Self {
            registry,
            _file_guard: file_guard,
        })
    }
}
