//! Handler subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers<A>::handle::<E>(worker)     (before listen)
//!     → registry.rs (typed worker erased into HandlerEntry)
//!     → Server merges its own registry with every with_handlers() registry
//!     → Dispatcher scans entries, first match wins
//! ```

pub mod registry;

pub use registry::Handlers;
pub(crate) use registry::{HandlerEntry, Invocation};
