//! Schema subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint types (PATH, METHOD, Body, Reply)
//!     → table.rs (SchemaTable<A>: endpoint → method → request schema)
//!     → flattened once into RouteSchema[] when the server is built
//!
//! Per request:
//!     payload (serde_json::Value)
//!     → validate.rs (RequestSchema::safe_parse: accept or reject)
//!     → Endpoint::Body (typed body handed to the worker)
//!
//! Per reply:
//!     Endpoint::Reply
//!     → endpoint.rs (Reply::status + Reply::to_payload)
//! ```
//!
//! # Design Decisions
//! - The API marker type `A` ties endpoints, tables and handler registries
//!   together so mismatches fail to compile
//! - Validation only reports success or failure; detail is never surfaced
//! - A reply's payload type is chosen by its status code at compile time

pub mod endpoint;
pub mod table;
pub mod validate;

pub use endpoint::{Endpoint, Json, Reply};
pub use table::{RouteSchema, SchemaTable};
pub use validate::{AnyPayload, JsonSchema, RequestSchema, SchemaError, TypedSchema};
