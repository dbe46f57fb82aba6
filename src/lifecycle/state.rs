//! Server lifecycle state machine.
//!
//! ```text
//! Starting ──bind ok──▶ Serving ──signal──▶ Draining ──idle or grace expiry──▶ Stopped
//! ```

use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

impl ServerState {
    /// Whether `next` is the single legal successor of `self`.
    pub fn can_advance_to(self, next: ServerState) -> bool {
        matches!(
            (self, next),
            (ServerState::Starting, ServerState::Serving)
                | (ServerState::Serving, ServerState::Draining)
                | (ServerState::Draining, ServerState::Stopped)
        )
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Starting => "starting",
            ServerState::Serving => "serving",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Publishes state transitions to any number of observers.
#[derive(Debug)]
pub struct StateMachine {
    tx: watch::Sender<ServerState>,
}

impl StateMachine {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Starting);
        Self { tx }
    }

    pub fn current(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }

    /// Move to `next`. Illegal transitions are ignored and logged.
    pub fn advance(&self, next: ServerState) -> bool {
        let current = self.current();
        if !current.can_advance_to(next) {
            tracing::warn!(from = %current, to = %next, "Ignoring illegal state transition");
            return false;
        }
        self.tx.send_replace(next);
        tracing::debug!(from = %current, to = %next, "Server state changed");
        true
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
