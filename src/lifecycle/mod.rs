//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → every subscribed server stops accepting → drain → exit
//!     Ctrl+C  → same path, one server at a time
//!     Drop    → waiters resolve as abandoned
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - `wait_for_shutdown` races Ctrl+C against the broadcast and reports
//!   which one fired

pub mod shutdown;

pub use shutdown::{wait_for_shutdown, Shutdown, ShutdownCause};
