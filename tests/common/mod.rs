//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mirror_sink::config::SinkConfig;
use mirror_sink::http::ServerError;
use mirror_sink::lifecycle::{DrainOutcome, ServerState, Shutdown};
use mirror_sink::net::Listener;
use mirror_sink::observability::CaptureSink;
use mirror_sink::MirrorServer;

/// A running sink on an ephemeral port.
#[allow(dead_code)]
pub struct TestSink {
    pub addr: SocketAddr,
    pub sink: Arc<CaptureSink>,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<ServerState>,
    pub handle: JoinHandle<Result<DrainOutcome, ServerError>>,
}

/// Start a sink with default config adjusted by `configure`.
pub async fn start_sink(configure: impl FnOnce(&mut SinkConfig)) -> TestSink {
    let mut config = SinkConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    configure(&mut config);

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let sink = Arc::new(CaptureSink::new());
    let shutdown = Shutdown::new();
    let server = MirrorServer::new(config, sink.clone());
    let mut state = server.state();

    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    state
        .wait_for(|s| *s == ServerState::Serving)
        .await
        .unwrap();

    TestSink {
        addr,
        sink,
        shutdown,
        state,
        handle,
    }
}

/// Write `request` on a fresh connection and read until the server closes it.
///
/// Returns whatever arrived before EOF or a connection error.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_response(&mut stream).await
}

#[allow(dead_code)]
pub async fn read_response(stream: &mut TcpStream) -> String {
    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => response.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&response).into_owned()
}

/// Wait until the sink holds at least `count` records.
#[allow(dead_code)]
pub async fn wait_for_records(sink: &CaptureSink, count: usize, within: Duration) {
    tokio::time::timeout(within, async {
        while sink.len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {count} records, got {}", sink.len()));
}
