//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → deadline.rs (read/write deadlines on the socket)
//!     → connection.rs (lifetime tracking for drain)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - A stalled peer is cut off at the socket, below HTTP

pub mod connection;
pub mod deadline;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use deadline::DeadlineStream;
pub use listener::{ConnectionPermit, Listener, ListenerError};
