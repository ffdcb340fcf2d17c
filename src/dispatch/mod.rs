//! Adaptive request dispatch.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → dispatcher.rs (per-request entry point)
//!     → signature.rs (parameter descriptors of the target)
//!     → binder.rs (body + path segments → argument values)
//!         → validate.rs (required fields of JSON bodies)
//!         → multipart.rs (multipart/form-data bodies)
//!     → target handler invoked, must yield a HandlerFunc
//!     → HandlerFunc serves the exchange
//!
//! Any failure:
//!     → error.rs (status classification)
//!     → renderer.rs (registered ErrorRenderer or bare status)
//! ```
//!
//! # Design Decisions
//! - Target handlers are plain closures; their shape is captured by
//!   `TargetHandler` at registration, not inspected at runtime
//! - Client input problems become 400, handler contract problems become 500
//! - One error renderer per `BodyRest`, installed once

pub mod binder;
pub mod dispatcher;
pub mod error;
pub mod multipart;
pub mod renderer;
pub mod signature;
pub mod validate;

pub use binder::BindLimits;
pub use dispatcher::{BodyRest, Dispatcher};
pub use error::{ContractViolation, DispatchError, RegistrationError};
pub use multipart::{FilePart, MultipartForm};
pub use renderer::ErrorRenderer;
pub use signature::{
    HandlerOutput, Json, Param, ParamDescriptor, ScalarKind, Signature, TargetHandler,
};
