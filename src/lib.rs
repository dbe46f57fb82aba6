//! Passive traffic-mirror sink library.
//!
//! Accepts mirrored HTTP requests, measures them, redacts credentials and
//! writes one JSON flow record per request.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mirror;
pub mod net;
pub mod observability;

pub use config::schema::SinkConfig;
pub use http::MirrorServer;
pub use lifecycle::Shutdown;
