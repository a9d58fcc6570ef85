//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Server::listen / Server::serve:
//!     Merge registries → Freeze dispatcher → Bind → Spawn accept loop
//!
//! Shutdown (shutdown.rs):
//!     ServerHandle::close() or Ctrl+C (signals.rs)
//!     → Stop accepting → Drain in-flight requests → Exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
