//! Handler registry.
//!
//! # Responsibilities
//! - Bind typed workers to endpoints of one API
//! - Erase worker types so the dispatcher can hold them in one list
//!
//! # Design Decisions
//! - Append-only, ordered; merging concatenates and the first match wins
//! - Entries are visible to the server only
//! - The erased worker owns the typed half of the pipeline: body decoding,
//!   facade construction, worker call, reply extraction and payload
//!   serialization

use axum::http::Method;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::http::request::{Request, RequestHead};
use crate::schema::{Endpoint, Reply};

/// What a worker produced, with the payload already in JSON form.
#[derive(Debug)]
pub(crate) struct Invocation {
    pub status: u16,
    pub payload: Value,
    pub cookies: Option<Vec<String>>,
    pub cache_control: String,
}

pub(crate) type BoxWorker = Arc<
    dyn Fn(Value, RequestHead) -> BoxFuture<'static, Result<Invocation, DispatchError>>
        + Send
        + Sync,
>;

/// One `(endpoint, method, worker)` binding.
#[derive(Clone)]
pub(crate) struct HandlerEntry {
    pub endpoint: &'static str,
    pub method: Method,
    pub worker: BoxWorker,
}

impl HandlerEntry {
    pub(crate) fn matches(&self, method: &Method, endpoint: &str) -> bool {
        self.endpoint == endpoint && self.method == *method
    }
}

/// Ordered collection of workers for the API marker `A`.
pub struct Handlers<A> {
    entries: Vec<HandlerEntry>,
    _api: PhantomData<fn() -> A>,
}

impl<A> Handlers<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            _api: PhantomData,
        }
    }

    /// Register `worker` for endpoint `E`.
    ///
    /// The worker receives the facade for one request and must record its
    /// response with [`Request::reply`]. Returning an error, panicking, or
    /// finishing without a reply all produce a 500.
    pub fn handle<E, F, Fut>(&mut self, worker: F) -> &mut Self
    where
        E: Endpoint<Api = A>,
        F: Fn(Request<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let worker = Arc::new(worker);
        let erased: BoxWorker = Arc::new(
            move |payload: Value,
                  head: RequestHead|
                  -> BoxFuture<'static, Result<Invocation, DispatchError>> {
                invoke::<E, F, Fut>(Arc::clone(&worker), payload, head).boxed()
            },
        );
        self.entries.push(HandlerEntry {
            endpoint: E::PATH,
            method: E::METHOD,
            worker: erased,
        });
        self
    }

    /// Append every entry of `other` after this registry's entries.
    pub fn merge(&mut self, other: Handlers<A>) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<HandlerEntry> {
        self.entries
    }
}

impl<A> Default for Handlers<A> {
    fn default() -> Self {
        Self::new()
    }
}

async fn invoke<E, F, Fut>(
    worker: Arc<F>,
    payload: Value,
    head: RequestHead,
) -> Result<Invocation, DispatchError>
where
    E: Endpoint,
    F: Fn(Request<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let body: E::Body = serde_json::from_value(payload).map_err(|e| {
        tracing::debug!(endpoint = E::PATH, error = %e, "Body does not match endpoint type");
        DispatchError::MalformedInput("body does not match endpoint type")
    })?;

    let (request, slot) = Request::<E>::new(body, head);
    // The call itself runs inside the guard: workers may panic before
    // returning their future.
    let running = async move { worker(request).await };
    match AssertUnwindSafe(running).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(DispatchError::internal(format!("handler failed: {e:#}")));
        }
        Err(_) => return Err(DispatchError::internal("handler panicked")),
    }

    let outcome = slot
        .extract()
        .ok_or_else(|| DispatchError::internal("handler completed without replying"))?;
    let payload = outcome
        .reply
        .to_payload()
        .map_err(|e| DispatchError::internal(format!("reply not serializable: {e}")))?;

    Ok(Invocation {
        status: outcome.reply.status(),
        payload,
        cookies: outcome.cookies,
        cache_control: outcome.cache_control,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Json;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;
    use serde_json::json;

    struct Api;

    #[derive(Deserialize)]
    struct Greeting {
        name: String,
    }

    struct Greet;
    impl Endpoint for Greet {
        type Api = Api;
        const PATH: &'static str = "/greet";
        const METHOD: Method = Method::POST;
        type Body = Greeting;
        type Reply = Json<200, String>;
    }

    fn head() -> RequestHead {
        let (parts, ()) = HttpRequest::builder()
            .method(Method::POST)
            .uri("/greet")
            .body(())
            .unwrap()
            .into_parts();
        RequestHead::new(parts, None)
    }

    fn first_worker(handlers: Handlers<Api>) -> BoxWorker {
        handlers.into_entries().remove(0).worker
    }

    #[tokio::test]
    async fn typed_worker_round_trip() {
        let mut handlers = Handlers::<Api>::new();
        handlers.handle(|req: Request<Greet>| async move {
            req.reply(Json(format!("hello {}", req.body().name)));
            Ok(())
        });

        let invocation = first_worker(handlers)(json!({"name": "ada"}), head())
            .await
            .unwrap();
        assert_eq!(invocation.status, 200);
        assert_eq!(invocation.payload, json!("hello ada"));
        assert_eq!(invocation.cookies, None);
    }

    #[tokio::test]
    async fn failures_map_to_internal() {
        let mut handlers = Handlers::<Api>::new();
        handlers
            .handle(|_req: Request<Greet>| async move { Ok(()) })
            .handle(|_req: Request<Greet>| async move { Err(anyhow::anyhow!("db down")) })
            .handle(|_req: Request<Greet>| async move {
                let missing: Option<()> = None;
                missing.expect("worker bug");
                Ok(())
            });

        for entry in handlers.into_entries() {
            let err = (entry.worker)(json!({"name": "x"}), head()).await.unwrap_err();
            assert!(matches!(err, DispatchError::InternalFailure(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn panic_before_first_await_maps_to_internal() {
        let mut handlers = Handlers::<Api>::new();
        handlers.handle(|req: Request<Greet>| {
            let count: u32 = req.body().name.parse().expect("numeric name");
            async move {
                req.reply(Json(count.to_string()));
                Ok(())
            }
        });

        let err = first_worker(handlers)(json!({"name": "ada"}), head())
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::internal("handler panicked"));
    }

    #[tokio::test]
    async fn mismatched_body_is_malformed() {
        let mut handlers = Handlers::<Api>::new();
        handlers.handle::<Greet, _, _>(|_req| async move { Ok(()) });

        let err = first_worker(handlers)(json!({"nom": 1}), head())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::MalformedInput("body does not match endpoint type")
        );
    }

    #[test]
    fn merge_preserves_order() {
        let mut first = Handlers::<Api>::new();
        first.handle::<Greet, _, _>(|_req| async move { Ok(()) });
        let mut second = Handlers::<Api>::new();
        second.handle::<Greet, _, _>(|_req| async move { Ok(()) });
        second.handle::<Greet, _, _>(|_req| async move { Ok(()) });

        first.merge(second);
        assert_eq!(first.len(), 3);
        assert!(first
            .into_entries()
            .iter()
            .all(|entry| entry.matches(&Method::POST, "/greet")));
    }
}
