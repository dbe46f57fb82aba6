//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (with deadlines)
//!     → server.rs (hyper-util auto builder, header cap, drain)
//!     → Axum router (single catch-all route)
//!     → handler.rs (size, redact, emit record, 200)
//! ```

pub mod handler;
pub mod server;

pub use handler::{mirror_handler, MirrorState};
pub use server::{MirrorServer, ServerError};
