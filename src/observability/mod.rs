//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Mirror handler:
//!     → sink.rs (one JSON flow record per request, stdout)
//!
//! Every other subsystem:
//!     → logging.rs (tracing events: startup, drain, read errors)
//! ```
//!
//! # Design Decisions
//! - Flow records have a fixed, versioned schema for downstream parsers
//! - Operational events go through `tracing`, flow records do not
//! - The flow sink is passed in explicitly, never looked up globally

pub mod logging;
pub mod sink;

pub use sink::{CaptureSink, FlowSink, JsonLineSink};
