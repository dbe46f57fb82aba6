//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sink.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the mirror sink.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SinkConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Connection deadlines and shutdown grace period.
    pub timeouts: TimeoutConfig,

    /// Transport-level request limits.
    pub limits: LimitsConfig,

    /// Operational logging and flow record options.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Read deadline in seconds. Bounds the header read, the body drain and
    /// any single stalled socket read.
    pub read_secs: u64,

    /// Write deadline in seconds for any single stalled socket write.
    pub write_secs: u64,

    /// How long in-flight connections may keep running after a shutdown
    /// signal before they are abandoned.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 5,
            write_secs: 5,
            shutdown_grace_secs: 5,
        }
    }
}

/// Transport-level limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum bytes accepted for the request line and headers.
    /// Larger heads are answered with 431 before reaching the handler.
    pub max_header_bytes: usize,
}

/// Smallest header buffer hyper accepts for HTTP/1 parsing.
pub const MIN_HEADER_BYTES: usize = 8192;

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 1 << 20, // 1 MiB
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Operational log level (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Add every request header (redacted) to the flow record.
    pub capture_headers: bool,

    /// Header names redacted in addition to the built-in sensitive set.
    pub extra_sensitive_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            capture_headers: false,
            extra_sensitive_headers: Vec::new(),
        }
    }
}
