//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request ID, tracing)
//!     → dispatch.rs (method gate, resolve, validate, convert)
//!         → body.rs (target, query payload, JSON body)
//!         → request.rs (per-request facade handed to the worker)
//!     → response.rs (status, headers, cookies, JSON text)
//!     → Send to client
//! ```

pub mod body;
pub mod cookie;
pub mod dispatch;
pub mod remote_addr;
pub mod request;
pub mod response;
pub mod server;

pub use cookie::{Cookie, SameSite, SetCookie};
pub use dispatch::Dispatcher;
pub use request::{Request, RequestHead, DEFAULT_CACHE_CONTROL};
pub use server::{Server, ServerError, ServerHandle};
