//! Cross-origin resource sharing.
//!
//! # Responsibilities
//! - Hold one option per allowed origin
//! - Produce the `Access-Control-*` headers for a request's `Origin`
//!
//! # Design Decisions
//! - Exact string match on `Origin`; no wildcards or patterns
//! - The first option registered for an origin wins
//! - Options only accumulate; nothing is ever removed

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Methods granted by the shorthand `cors("https://origin")` form.
pub const DEFAULT_METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Allowed headers, methods and credential flag for one origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CorsOption {
    pub origin: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub credential: bool,
}

impl CorsOption {
    /// All methods, any header, credentials allowed.
    pub fn permissive(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            headers: vec!["*".to_string()],
            methods: DEFAULT_METHODS.iter().map(|m| (*m).to_string()).collect(),
            credential: true,
        }
    }

    /// Headers to attach when this option matched.
    pub fn headers_for(&self, origin: &HeaderValue) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        insert_joined(
            &mut headers,
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            &self.headers,
        );
        insert_joined(
            &mut headers,
            header::ACCESS_CONTROL_ALLOW_METHODS,
            &self.methods,
        );
        if self.credential {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers
    }
}

fn insert_joined(headers: &mut HeaderMap, name: HeaderName, values: &[String]) {
    match HeaderValue::from_str(&values.join(", ")) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "Skipping CORS header with invalid characters"),
    }
}

impl From<&str> for CorsOption {
    fn from(origin: &str) -> Self {
        Self::permissive(origin)
    }
}

impl From<String> for CorsOption {
    fn from(origin: String) -> Self {
        Self::permissive(origin)
    }
}

/// Accumulated CORS options.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    options: Vec<CorsOption>,
}

impl CorsPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, option: CorsOption) {
        self.options.push(option);
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// CORS headers for a request, or `None` when there is no `Origin`
    /// header or no option for it.
    pub fn headers_for(&self, request_headers: &HeaderMap) -> Option<HeaderMap> {
        let origin = request_headers.get(header::ORIGIN)?;
        let option = self
            .options
            .iter()
            .find(|option| origin.as_bytes() == option.origin.as_bytes())?;
        Some(option.headers_for(origin))
    }
}
