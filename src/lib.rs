//! Adaptive request dispatch for Axum services.
//!
//! Register an ordinary closure whose parameters are the data it needs
//! (a JSON body, path variables) and whose result is the handler that
//! serves the exchange. Per request the dispatcher decodes and validates
//! the body, converts path segments, invokes the closure and delegates to
//! the handler it returns. Failures are rendered through one error
//! renderer per `BodyRest`.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use dispatch::{BodyRest, DispatchError, Dispatcher, Json, MultipartForm};
pub use http::{HandlerFunc, HttpServer, InboundRequest, ResponseWriter};
pub use lifecycle::Shutdown;
