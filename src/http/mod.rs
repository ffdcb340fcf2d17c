//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, route table)
//!     → request.rs (buffer body, capture matched route pattern)
//!     → [dispatch layer binds and invokes the target handler]
//!     → response.rs (status, headers, body written by the handler)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::{HandlerFunc, ResponseWriter, ServeHttp};
pub use server::HttpServer;
