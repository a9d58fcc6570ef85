//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Define the per-request log capability injected into the server
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - Request logging is fire-and-forget: nothing it returns is consumed

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// One line per handled request or preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLog {
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub remote_address: String,
}

/// Sink for per-request log entries.
pub trait RequestLogger: Send + Sync + 'static {
    fn request(&self, entry: &RequestLog);
}

/// Default logger: one `info` event per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn request(&self, entry: &RequestLog) {
        tracing::info!(
            method = %entry.method,
            path = %entry.path,
            status = entry.status_code,
            remote_address = %entry.remote_address,
            "[{}] {} {} ({})",
            entry.status_code,
            entry.method,
            entry.path,
            entry.remote_address,
        );
    }
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
