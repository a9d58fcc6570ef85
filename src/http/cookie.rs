//! Cookie header codec.
//!
//! # Responsibilities
//! - Parse an incoming `Cookie` header into name/value pairs
//! - Encode one outgoing cookie into a `Set-Cookie` directive
//!
//! # Design Decisions
//! - Incoming pairs carry no attributes
//! - A segment that does not split into exactly two parts on `=` is dropped;
//!   values containing `=` are not reconstructed
//! - Outgoing attributes are emitted only when present, in a fixed order
//! - One directive per cookie; directives are never merged

use chrono::{DateTime, Utc};
use std::fmt;

/// A cookie received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Split a `Cookie` header value into its pairs.
pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split("; ")
        .filter_map(|segment| {
            let parts: Vec<&str> = segment.split('=').collect();
            match parts.as_slice() {
                [name, value] => Some(Cookie {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// A cookie to send back with `Set-Cookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
    pub http_only: bool,
}

impl SetCookie {
    /// A bare `name=value` cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            max_age: None,
            domain: None,
            path: None,
            same_site: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Render the `Set-Cookie` header value.
    pub fn encode(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];
        if let Some(expires) = self.expires {
            parts.push(format!(
                "Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }
        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(path) = &self.path {
            parts.push(format!("Path={path}"));
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={same_site}"));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.join("; ")
    }
}
