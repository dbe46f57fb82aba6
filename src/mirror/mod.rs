//! Request reduction subsystem.
//!
//! # Data Flow
//! ```text
//! Request head + body
//!     → size.rs (request line, header block, body drain)
//!     → redact.rs (credential masking, sensitive header redaction)
//!     → record.rs (FlowRecord, immutable)
//!     → FlowSink (one JSON line)
//! ```
//!
//! # Design Decisions
//! - Sizes approximate HTTP/1.1 wire format; they are not byte-exact
//! - Bodies are streamed and counted, never buffered
//! - Records are fully built before they are emitted

pub mod record;
pub mod redact;
pub mod size;

pub use record::{FlowRecord, FlowStats, HttpInfo, Measurement, Metadata};
pub use redact::{mask_credential, RedactionPolicy, REDACTED};
pub use size::{drain_body, header_size, request_line_size, BodyDrain, DrainError, RequestSize};
