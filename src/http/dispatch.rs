//! Request dispatch pipeline.
//!
//! # Data Flow
//! ```text
//! OPTIONS ───────────────────────────────────────────────→ 204
//! GET / DELETE (non-JSON) → query payload ─┐
//! JSON content type       → body payload  ─┤
//! anything else           → 400            │
//!                                          ↓
//!        resolve (404 / 501) → safe_parse (400) → to_object (400)
//!            → worker (500 on error, panic, timeout, no reply)
//!            → to_payload + serialize (500) → reply status
//!
//! every terminal response → CORS headers → request log → metrics
//! ```
//!
//! # Design Decisions
//! - Exactly one response per request: every stage returns a
//!   `DispatchError` instead of writing to the client
//! - Route and handler lookups are linear, first match wins

use axum::{
    body::Body,
    http::{request::Parts, Method},
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::body::{is_json, read_json, Target};
use super::remote_addr::resolve_remote_address;
use super::request::RequestHead;
use super::response::{package, preflight};
use crate::config::{LimitsConfig, TimeoutConfig};
use crate::convert::ConverterChain;
use crate::error::DispatchError;
use crate::handler::HandlerEntry;
use crate::observability::{metrics, RequestLog, RequestLogger};
use crate::schema::RouteSchema;
use crate::security::CorsPolicy;

/// Transport limits applied by the dispatcher.
#[derive(Debug, Clone)]
pub(crate) struct DispatchSettings {
    pub handler_timeout: Option<Duration>,
    pub body_read_timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

impl DispatchSettings {
    pub(crate) fn from_config(timeouts: &TimeoutConfig, limits: &LimitsConfig) -> Self {
        Self {
            handler_timeout: timeouts.handler(),
            body_read_timeout: timeouts.body_read(),
            max_body_bytes: limits.max_body_bytes,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default(), &LimitsConfig::default())
    }
}

/// Frozen routing state shared by every connection.
pub struct Dispatcher {
    pub(crate) routes: Vec<RouteSchema>,
    pub(crate) handlers: Vec<HandlerEntry>,
    pub(crate) converters: ConverterChain,
    pub(crate) cors: CorsPolicy,
    pub(crate) logger: Arc<dyn RequestLogger>,
    pub(crate) settings: DispatchSettings,
}

impl Dispatcher {
    /// Produce the single response for `request`.
    pub async fn dispatch(
        &self,
        request: axum::extract::Request,
        peer: Option<SocketAddr>,
    ) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let remote_address = resolve_remote_address(&parts.headers, peer);
        let cors = self.cors.headers_for(&parts.headers);

        let mut response = if method == Method::OPTIONS {
            preflight()
        } else {
            match self.process(parts, body, peer).await {
                Ok(response) => response,
                Err(e) => {
                    match &e {
                        DispatchError::InternalFailure(reason) => {
                            error!(method = %method, path = %path, reason = %reason, "Request failed")
                        }
                        other => debug!(method = %method, path = %path, error = %other, "Request rejected"),
                    }
                    e.into_response()
                }
            }
        };

        if let Some(cors) = cors {
            response.headers_mut().extend(cors);
        }

        let status = response.status().as_u16();
        self.logger.request(&RequestLog {
            method: method.to_string(),
            path,
            status_code: status,
            remote_address: remote_address.unwrap_or_else(|| "unknown".to_string()),
        });
        metrics::record_request(method.as_str(), status, start);

        response
    }

    async fn process(
        &self,
        parts: Parts,
        body: Body,
        peer: Option<SocketAddr>,
    ) -> Result<Response, DispatchError> {
        let target = Target::parse(&parts.uri)?;
        let json = is_json(&parts.headers);

        let payload = if parts.method == Method::GET || (parts.method == Method::DELETE && !json) {
            target.query
        } else if json {
            read_json(
                body,
                self.settings.max_body_bytes,
                self.settings.body_read_timeout,
            )
            .await?
        } else {
            return Err(DispatchError::MalformedInput(
                "content type is not application/json",
            ));
        };

        let (route, handler) = self.resolve(&parts.method, &target.path)?;

        let parsed = route
            .request
            .safe_parse(payload)
            .ok_or(DispatchError::MalformedInput("payload rejected by schema"))?;
        let object = self.converters.to_object(parsed).map_err(|e| {
            debug!(error = %e, "Converter rejected request payload");
            DispatchError::MalformedInput("payload rejected by converter")
        })?;

        let running = (handler.worker)(object, RequestHead::new(parts, peer));
        let invocation = match self.settings.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, running)
                .await
                .map_err(|_| DispatchError::internal(format!("handler timed out after {limit:?}")))??,
            None => running.await?,
        };

        package(invocation, &self.converters)
    }

    fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(&RouteSchema, &HandlerEntry), DispatchError> {
        let route = self.routes.iter().find(|r| r.matches(method, path));
        let handler = self.handlers.iter().find(|h| h.matches(method, path));
        match (route, handler) {
            (Some(route), Some(handler)) => Ok((route, handler)),
            (Some(_), None) => Err(DispatchError::NotImplemented {
                method: method.to_string(),
                path: path.to_string(),
            }),
            (None, _) => Err(DispatchError::NotFound {
                method: method.to_string(),
                path: path.to_string(),
            }),
        }
    }
}
