//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (look up Origin among registered options)
//!     → OPTIONS: answered here with 204, pipeline skipped
//!     → otherwise: headers merged into whatever the pipeline returns
//! ```

pub mod cors;

pub use cors::{CorsOption, CorsPolicy};
