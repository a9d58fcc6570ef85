//! Type-safe JSON API server.
//!
//! An API is described once as a [`SchemaTable`] of [`Endpoint`] types.
//! Workers are registered against those endpoints, and the [`Server`]
//! validates, converts and dispatches every request to them.

pub mod cached;
pub mod config;
pub mod convert;
pub mod error;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod schema;
pub mod security;

pub use config::ServerConfig;
pub use convert::{ConvertError, Converter, ConverterChain};
pub use error::DispatchError;
pub use handler::Handlers;
pub use http::{Request, Server, ServerError, ServerHandle, SetCookie};
pub use lifecycle::Shutdown;
pub use observability::{RequestLog, RequestLogger};
pub use schema::{Endpoint, Json, Reply, SchemaTable};
pub use security::CorsOption;
