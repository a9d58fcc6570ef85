//! HTTP server setup.
//!
//! # Responsibilities
//! - Collect the schema table, handler registries, converters and CORS
//!   options for one API
//! - Freeze them into a `Dispatcher` and mount it as the router fallback
//! - Wire up middleware (request ID, tracing)
//! - Bind, serve, and close
//!
//! # Design Decisions
//! - Registration happens before serving; `listen` and `serve` consume the
//!   server, so nothing can be registered once traffic flows
//! - Every path reaches the dispatcher: routing is by exact path and method
//!   against the schema table, not by axum's router
//! - Dropping the returned handle shuts the server down

use axum::{
    extract::{ConnectInfo, State},
    response::Response,
    Router,
};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::dispatch::{DispatchSettings, Dispatcher};
use super::request::Request;
use crate::config::ServerConfig;
use crate::convert::ConverterChain;
use crate::handler::Handlers;
use crate::lifecycle::Shutdown;
use crate::observability::{RequestLogger, TracingRequestLogger};
use crate::schema::{Endpoint, RouteSchema, SchemaTable};
use crate::security::{CorsOption, CorsPolicy};

/// Errors from binding or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    #[error("server task failed: {0}")]
    Task(String),
}

/// Type-safe JSON API server for the API marker `A`.
pub struct Server<A> {
    routes: Vec<RouteSchema>,
    handlers: Handlers<A>,
    converters: ConverterChain,
    cors: CorsPolicy,
    logger: Arc<dyn RequestLogger>,
    settings: DispatchSettings,
}

impl<A: 'static> Server<A> {
    /// Create a server for `schema` with default settings and no handlers.
    pub fn new(schema: SchemaTable<A>) -> Self {
        Self {
            routes: schema.flatten(),
            handlers: Handlers::new(),
            converters: ConverterChain::new(),
            cors: CorsPolicy::new(),
            logger: Arc::new(TracingRequestLogger),
            settings: DispatchSettings::default(),
        }
    }

    /// Run request payloads through `converters` before workers see them,
    /// and replies through them in reverse.
    pub fn with_converters(mut self, converters: ConverterChain) -> Self {
        self.converters = converters;
        self
    }

    /// Replace the per-request logger.
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Apply timeouts, limits and CORS options from a loaded config.
    pub fn with_config(mut self, config: &ServerConfig) -> Self {
        self.settings = DispatchSettings::from_config(&config.timeouts, &config.limits);
        for option in &config.cors {
            self.cors.push(option.clone());
        }
        self
    }

    /// Register a worker for endpoint `E` directly on the server.
    pub fn handle<E, F, Fut>(&mut self, worker: F) -> &mut Self
    where
        E: Endpoint<Api = A>,
        F: Fn(Request<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handlers.handle::<E, F, Fut>(worker);
        self
    }

    /// Append a registry's entries after those already registered.
    pub fn with_handlers(&mut self, registry: Handlers<A>) -> &mut Self {
        self.handlers.merge(registry);
        self
    }

    /// Add a CORS option. A bare origin string allows every method, any
    /// header, and credentials.
    pub fn cors(&mut self, option: impl Into<CorsOption>) -> &mut Self {
        self.cors.push(option.into());
        self
    }

    pub(crate) fn into_dispatcher(self) -> Dispatcher {
        Dispatcher {
            routes: self.routes,
            handlers: self.handlers.into_entries(),
            converters: self.converters,
            cors: self.cors,
            logger: self.logger,
            settings: self.settings,
        }
    }

    /// Freeze the registrations into an axum router.
    ///
    /// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`
    /// for socket addresses to reach the request logger.
    pub fn into_router(self) -> Router {
        let dispatcher = Arc::new(self.into_dispatcher());
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Bind `0.0.0.0:port` and start serving.
    pub async fn listen(self, port: u16) -> Result<ServerHandle, ServerError> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .await
            .map_err(ServerError::Bind)?;
        self.serve(listener).await
    }

    /// Start serving on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<ServerHandle, ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;
        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let shutdown = Shutdown::new();
        let signal = shutdown.signal();

        tracing::info!(address = %local_addr, "HTTP server starting");
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await;
            match &result {
                Ok(()) => tracing::info!("HTTP server stopped"),
                Err(e) => tracing::error!(error = %e, "HTTP server failed"),
            }
            result
        });

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }
}

async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: axum::extract::Request,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    dispatcher.dispatch(request, peer).await
}

/// Handle to a running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections. In-flight requests are allowed to finish.
    pub fn close(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the server task to end. Call [`close`](Self::close) first,
    /// or this waits for as long as the server runs.
    pub async fn closed(self) -> Result<(), ServerError> {
        let Self { shutdown, task, .. } = self;
        let result = task.await;
        drop(shutdown);
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ServerError::Serve(e)),
            Err(e) => Err(ServerError::Task(e.to_string())),
        }
    }

    /// Close and wait.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.close();
        self.closed().await
    }
}
