//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Build the catch-all Axum router around the mirror handler
//! - Serve each accepted connection with HTTP/1.1 and HTTP/2 via hyper-util
//! - Apply read/write deadlines and the header size cap per connection
//! - Drive the Starting → Serving → Draining → Stopped state machine

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit},
    Router,
};
use hyper::{body::Incoming, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::config::SinkConfig;
use crate::http::handler::{mirror_handler, MirrorState};
use crate::lifecycle::{DrainOutcome, ServerState, Shutdown, ShutdownSignal, StateMachine};
use crate::mirror::RedactionPolicy;
use crate::net::{ConnectionPermit, ConnectionTracker, DeadlineStream, Listener};
use crate::observability::FlowSink;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Shortest possible HTTP/1 header line on the wire: `a:\r\n`.
const MIN_HEADER_LINE_BYTES: usize = 4;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the mirror sink.
pub struct MirrorServer {
    router: Router,
    config: SinkConfig,
    state: StateMachine,
}

impl MirrorServer {
    /// Create a new server writing flow records to `sink`.
    pub fn new(config: SinkConfig, sink: Arc<dyn FlowSink>) -> Self {
        let state = MirrorState {
            sink,
            policy: Arc::new(RedactionPolicy::new(config.logging.extra_sensitive_headers.as_slice())),
            capture_headers: config.logging.capture_headers,
            read_timeout: config.timeouts.read(),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            state: StateMachine::new(),
        }
    }

    /// Build the Axum router: one catch-all route, no body limit.
    fn build_router(state: MirrorState) -> Router {
        Router::new()
            .fallback(mirror_handler)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(TraceLayer::new_for_http())
    }

    /// Connection builder carrying the header cap and header read deadline.
    ///
    /// The byte cap is the only limit on the header block: the HTTP/1 header
    /// count is raised to as many lines as could fit under it.
    fn connection_builder(&self) -> auto::Builder<TokioExecutor> {
        let max_header_bytes = self.config.limits.max_header_bytes;
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.timeouts.read())
            .max_buf_size(max_header_bytes)
            .max_headers(max_header_bytes / MIN_HEADER_LINE_BYTES);
        builder
            .http2()
            .timer(TokioTimer::new())
            .max_header_list_size(u32::try_from(max_header_bytes).unwrap_or(u32::MAX));
        builder
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Serve until `shutdown` fires, then drain.
    ///
    /// The listener is closed as soon as the signal arrives, so new
    /// connections are refused. Open connections are asked to finish their
    /// current request and close; whatever is still running after the grace
    /// period is abandoned.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<DrainOutcome, ServerError> {
        let addr = listener.local_addr()?;
        let builder = self.connection_builder();
        let tracker = ConnectionTracker::new();
        let drain = Shutdown::new();

        self.state.advance(ServerState::Serving);
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            read_timeout_secs = self.config.timeouts.read_secs,
            write_timeout_secs = self.config.timeouts.write_secs,
            max_header_bytes = self.config.limits.max_header_bytes,
            "Mirror sink serving"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_connection(&builder, &tracker, &drain, stream, peer, permit);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        self.state.advance(ServerState::Draining);
        tracing::info!(
            in_flight = tracker.active_count(),
            grace_secs = self.config.timeouts.shutdown_grace_secs,
            "Shutting down server..."
        );
        drain.trigger();

        let grace = self.config.timeouts.shutdown_grace();
        let outcome = match tokio::time::timeout(grace, tracker.wait_idle()).await {
            Ok(()) => DrainOutcome::Completed,
            Err(_) => {
                let abandoned = tracker.active_count();
                tracing::warn!(abandoned, "Server forced to shutdown");
                DrainOutcome::TimedOut { abandoned }
            }
        };

        self.state.advance(ServerState::Stopped);
        tracing::info!("HTTP server stopped");
        Ok(outcome)
    }

    fn spawn_connection(
        &self,
        builder: &auto::Builder<TokioExecutor>,
        tracker: &ConnectionTracker,
        drain: &Shutdown,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
    ) {
        let io = TokioIo::new(DeadlineStream::new(
            stream,
            self.config.timeouts.read(),
            self.config.timeouts.write(),
        ));

        let router = self.router.clone();
        let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
            request.extensions_mut().insert(ConnectInfo(peer));
            router.clone().oneshot(request)
        });

        let builder = builder.clone();
        let guard = tracker.track();
        let mut drain = drain.subscribe();

        tokio::spawn(async move {
            let _permit = permit;
            let connection_id = guard.id();

            let conn = builder.serve_connection(io, service);
            tokio::pin!(conn);

            let mut draining = false;
            let result = loop {
                tokio::select! {
                    result = conn.as_mut() => break result,
                    _ = drain.recv(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            };

            if let Err(e) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    peer_addr = %peer,
                    error = %e,
                    "Connection ended with error"
                );
            }
            drop(guard);
        });
    }
}
