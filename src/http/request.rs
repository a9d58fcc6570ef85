//! Per-request facade handed to workers.
//!
//! # Responsibilities
//! - Carry the validated body and the raw request head
//! - Compute request metadata (user agent, client address, cookies) lazily,
//!   at most once per request
//! - Collect outgoing cookies, the cache-control directive and the reply
//!
//! # Design Decisions
//! - Owned by exactly one worker; never shared across tasks
//! - Reply state lives behind a slot the dispatcher keeps a handle to, so it
//!   can read the terminal state after the worker returns
//! - A second `reply` overwrites the first; the dispatcher only observes the
//!   state once the worker has finished

use axum::http::{header, request::Parts, HeaderMap, Method, Uri};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cached::Cached;
use crate::http::cookie::{parse_cookie_header, Cookie, SetCookie};
use crate::http::remote_addr::resolve_remote_address;
use crate::schema::Endpoint;

/// Cache-control directive sent when a worker does not choose one.
pub const DEFAULT_CACHE_CONTROL: &str = "no-store";

/// Raw request head plus the transport peer address.
#[derive(Debug)]
pub struct RequestHead {
    parts: Parts,
    peer: Option<SocketAddr>,
}

impl RequestHead {
    pub fn new(parts: Parts, peer: Option<SocketAddr>) -> Self {
        Self { parts, peer }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[derive(Debug)]
struct ReplyState<R> {
    reply: Option<R>,
    cookies: Vec<String>,
    cache_control: String,
}

/// Terminal state of a facade, read back by the dispatcher.
#[derive(Debug)]
pub(crate) struct Outcome<R> {
    pub reply: R,
    pub cookies: Option<Vec<String>>,
    pub cache_control: String,
}

/// Dispatcher-side handle onto a facade's reply state.
pub(crate) struct ReplySlot<R> {
    state: Arc<Mutex<ReplyState<R>>>,
}

impl<R> ReplySlot<R> {
    /// Take the recorded reply, or `None` if the worker never replied.
    pub(crate) fn extract(self) -> Option<Outcome<R>> {
        let mut state = self.state.lock();
        let reply = state.reply.take()?;
        let cookies = std::mem::take(&mut state.cookies);
        Some(Outcome {
            reply,
            cookies: if cookies.is_empty() { None } else { Some(cookies) },
            cache_control: std::mem::take(&mut state.cache_control),
        })
    }
}

/// Request/response facade for endpoint `E`.
pub struct Request<E: Endpoint> {
    body: E::Body,
    head: RequestHead,
    user_agent: Cached<Option<String>>,
    remote_address: Cached<Option<String>>,
    cookies: Cached<Vec<Cookie>>,
    state: Arc<Mutex<ReplyState<E::Reply>>>,
}

impl<E: Endpoint> Request<E> {
    pub(crate) fn new(body: E::Body, head: RequestHead) -> (Self, ReplySlot<E::Reply>) {
        let state = Arc::new(Mutex::new(ReplyState {
            reply: None,
            cookies: Vec::new(),
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
        }));
        let slot = ReplySlot {
            state: Arc::clone(&state),
        };
        let request = Self {
            body,
            head,
            user_agent: Cached::new(),
            remote_address: Cached::new(),
            cookies: Cached::new(),
            state,
        };
        (request, slot)
    }

    /// The validated request body.
    pub fn body(&self) -> &E::Body {
        &self.body
    }

    /// The raw request head.
    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.head.peer_addr()
    }

    /// `User-Agent` header, read on first access.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent
            .get(|| {
                self.head
                    .headers()
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .as_deref()
    }

    /// Client address, resolved on first access.
    pub fn remote_address(&self) -> Option<&str> {
        self.remote_address
            .get(|| resolve_remote_address(self.head.headers(), self.head.peer_addr()))
            .as_deref()
    }

    /// First incoming cookie named exactly `name`.
    ///
    /// The `Cookie` header is parsed once, on the first lookup.
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies
            .get(|| {
                let joined = self
                    .head
                    .headers()
                    .get_all(header::COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect::<Vec<_>>()
                    .join("; ");
                parse_cookie_header(&joined)
            })
            .iter()
            .find(|cookie| cookie.name == name)
    }

    /// Queue a `Set-Cookie` directive. Cookies are not deduplicated by name.
    pub fn set_cookie(&self, cookie: SetCookie) {
        self.state.lock().cookies.push(cookie.encode());
    }

    /// Replace the `Cache-Control` directive.
    pub fn set_cache_control(&self, value: impl Into<String>) {
        self.state.lock().cache_control = value.into();
    }

    /// Record the response. A later call replaces an earlier one.
    pub fn reply(&self, reply: E::Reply) {
        self.state.lock().reply = Some(reply);
    }
}
