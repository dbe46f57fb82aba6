//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State (state.rs):
//!     Starting → Serving → Draining → Stopped
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain connections (bounded) → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown is an injectable signal, not a runtime hook
//! - Shutdown has timeout: connections still open after the grace period are abandoned

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::{DrainOutcome, Shutdown, ShutdownSignal};
pub use state::{ServerState, StateMachine};
