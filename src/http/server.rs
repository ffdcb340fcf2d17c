//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router from registered dispatchers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Stop gracefully on Ctrl+C or a shutdown broadcast
//!
//! Body size caps are not a middleware: each dispatcher picks its own cap
//! from the handler signature while buffering.

use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::{on, MethodFilter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::dispatch::Dispatcher;
use crate::lifecycle::wait_for_shutdown;

/// HTTP server serving a table of dispatchers.
pub struct HttpServer {
    routes: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and no routes.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            routes: Router::new(),
            config,
        }
    }

    /// Register `dispatcher` for `pattern` under the given methods.
    ///
    /// Patterns use Axum syntax (`/notes/{id}`). Registering the same
    /// pattern again with other methods merges the two.
    pub fn route(mut self, pattern: &str, methods: MethodFilter, dispatcher: Dispatcher) -> Self {
        tracing::debug!(pattern = %pattern, methods = ?methods, "Route registered");
        let handler = move |request: Request<Body>| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.serve(request).await }
        };
        self.routes = self.routes.route(pattern, on(methods, handler));
        self
    }

    pub fn get(self, pattern: &str, dispatcher: Dispatcher) -> Self {
        self.route(pattern, MethodFilter::GET, dispatcher)
    }

    pub fn post(self, pattern: &str, dispatcher: Dispatcher) -> Self {
        self.route(pattern, MethodFilter::POST, dispatcher)
    }

    pub fn put(self, pattern: &str, dispatcher: Dispatcher) -> Self {
        self.route(pattern, MethodFilter::PUT, dispatcher)
    }

    pub fn patch(self, pattern: &str, dispatcher: Dispatcher) -> Self {
        self.route(pattern, MethodFilter::PATCH, dispatcher)
    }

    pub fn delete(self, pattern: &str, dispatcher: Dispatcher) -> Self {
        self.route(pattern, MethodFilter::DELETE, dispatcher)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        self.routes
            .clone()
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// Ctrl+C or a message on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                wait_for_shutdown(shutdown).await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
