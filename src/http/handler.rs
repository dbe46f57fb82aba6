//! The mirror handler: reduce one request to a flow record and acknowledge it.
//!
//! The gateway discards whatever we answer, so the handler never fails the
//! request. Body read problems are logged and the record is still emitted,
//! with the byte count reached before the failure.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
};

use crate::mirror::{
    drain_body, header_size, request_line_size, size, FlowRecord, Measurement, RedactionPolicy,
    RequestSize,
};
use crate::observability::FlowSink;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct MirrorState {
    pub sink: Arc<dyn FlowSink>,
    pub policy: Arc<RedactionPolicy>,
    pub capture_headers: bool,
    /// Absolute deadline for draining one body, measured from handler start.
    pub read_timeout: Duration,
}

/// Catch-all route: always answers 200 with an empty body.
///
/// The work runs in its own task so that a connection torn down by a
/// deadline cannot cancel it halfway; the dying connection shows up as a
/// body read error and the record is still emitted.
pub async fn mirror_handler(State(state): State<MirrorState>, request: Request<Body>) -> StatusCode {
    if let Err(e) = tokio::spawn(mirror_request(state, request)).await {
        tracing::error!(error = %e, "Mirror task failed");
    }
    StatusCode::OK
}

/// Measure one request, then emit its flow record.
pub async fn mirror_request(state: MirrorState, request: Request<Body>) {
    let start = Instant::now();

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();

    let target = size::request_target(&parts.uri, parts.version);
    let request_line = request_line_size(
        parts.method.as_str(),
        &target,
        size::proto_str(parts.version),
    );
    let headers = header_size(&parts.headers);

    let deadline = tokio::time::Instant::from_std(start) + state.read_timeout;
    let drained = drain_body(body, deadline).await;
    if let Some(e) = &drained.error {
        tracing::warn!(
            error = %e,
            bytes_read = drained.bytes,
            method = %parts.method,
            uri = %target,
            "Failed to read body"
        );
    }

    let measurement = Measurement {
        size: RequestSize {
            request_line,
            headers,
            body: drained.bytes,
        },
        latency: start.elapsed(),
        client,
    };

    let record = FlowRecord::build(&parts, measurement, &state.policy, state.capture_headers);
    state.sink.emit(&record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::REDACTED;
    use crate::observability::CaptureSink;
    use axum::body::Bytes;
    use axum::Router;
    use tower::ServiceExt;

    fn app(sink: Arc<CaptureSink>, capture_headers: bool) -> Router {
        let state = MirrorState {
            sink,
            policy: Arc::new(RedactionPolicy::default()),
            capture_headers,
            read_timeout: Duration::from_secs(5),
        };
        Router::new().fallback(mirror_handler).with_state(state)
    }

    #[tokio::test]
    async fn health_probe_sizes() {
        let sink = Arc::new(CaptureSink::new());
        let response = app(sink.clone(), false)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let flow = &records[0].flow;
        assert_eq!(flow.total_request_size, 24);
        assert_eq!(flow.header_size, 2);
        assert_eq!(flow.body_size, 0);
        assert_eq!(flow.total_request_size - flow.header_size - flow.body_size, 22);
        assert_eq!(flow.client_ip, "");
    }

    #[tokio::test]
    async fn body_is_counted_and_included_in_total() {
        let sink = Arc::new(CaptureSink::new());
        let request = Request::post("/ingest")
            .header("content-type", "application/json")
            .body(Body::from(vec![b'a'; 10_000]))
            .unwrap();
        app(sink.clone(), false).oneshot(request).await.unwrap();

        let records = sink.records();
        let flow = &records[0].flow;
        assert_eq!(flow.body_size, 10_000);
        // "content-type: application/json\r\n" + "\r\n"
        assert_eq!(flow.header_size, (12 + 16 + 4) + 2);
        assert_eq!(
            flow.total_request_size,
            request_line_size("POST", "/ingest", "HTTP/1.1") + flow.header_size + 10_000
        );
    }

    #[tokio::test]
    async fn read_error_still_logs_and_acknowledges() {
        let sink = Arc::new(CaptureSink::new());
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("peer went away")),
        ];
        let request = Request::put("/upload")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let response = app(sink.clone(), false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flow.body_size, 7);
    }

    #[tokio::test]
    async fn sensitive_values_never_reach_the_sink() {
        let sink = Arc::new(CaptureSink::new());
        let request = Request::get("/")
            .header("authorization", "Bearer abcdefghijklmno")
            .header("cookie", "session=xyz")
            .header("x-auth-token", "tok-998877")
            .body(Body::empty())
            .unwrap();
        app(sink.clone(), true).oneshot(request).await.unwrap();

        let records = sink.records();
        let record = &records[0];
        assert_eq!(record.metadata.authorization, "Bearer abc...mno");
        assert!(record.metadata.has_cookie);

        let headers = record.metadata.headers.as_ref().unwrap();
        assert_eq!(headers["authorization"], "Bearer abc...mno");
        assert_eq!(headers["cookie"], REDACTED);
        assert_eq!(headers["x-auth-token"], REDACTED);

        let json = serde_json::to_string(record).unwrap();
        assert!(!json.contains("session=xyz"));
        assert!(!json.contains("tok-998877"));
    }

    #[tokio::test]
    async fn peer_address_comes_from_connect_info() {
        let sink = Arc::new(CaptureSink::new());
        let peer: SocketAddr = "192.0.2.10:43210".parse().unwrap();
        let mut request = Request::get("/").body(Body::empty()).unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        app(sink.clone(), false).oneshot(request).await.unwrap();
        assert_eq!(sink.records()[0].flow.client_ip, "192.0.2.10:43210");
    }
}
