//! Dispatch error taxonomy.
//!
//! Every failure the pipeline can produce collapses into one of four terminal
//! statuses. The reason string is for operators only: clients receive the
//! fixed status text and nothing else.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

/// Terminal failure of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Bad content type, unparseable JSON, or a payload the schema rejected.
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    /// No schema entry for the endpoint and method.
    #[error("no schema for {method} {path}")]
    NotFound { method: String, path: String },

    /// The schema declares the route but no handler was registered.
    #[error("no handler registered for {method} {path}")]
    NotImplemented { method: String, path: String },

    /// Bad target, missing reply, handler failure, or unserializable reply.
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl DispatchError {
    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Self::InternalFailure(reason.into())
    }

    /// Status code sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::InternalFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed plain-text body sent to the client.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "400 Bad Request",
            Self::NotFound { .. } => "404 Not Found",
            Self::NotImplemented { .. } => "501 Not Implemented",
            Self::InternalFailure(_) => "500 Internal Server Error",
        }
    }

    /// Build the client-facing response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.message()));
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
