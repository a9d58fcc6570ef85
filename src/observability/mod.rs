//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher produces, per terminal response:
//!     → logging.rs (RequestLogger entry: method, path, status, remote)
//!     → metrics.rs (counter + latency histogram)
//!
//! tower-http layers produce:
//!     → request spans carrying x-request-id
//! ```
//!
//! # Design Decisions
//! - The request logger is injected, not global; the tracing-backed one is
//!   only the default
//! - Transport diagnostics go through tracing, never stdout

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, RequestLog, RequestLogger, TracingRequestLogger};
