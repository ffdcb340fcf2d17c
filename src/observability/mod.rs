//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch / http produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (dispatch counters and latency histogram)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every dispatch failure log line
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
