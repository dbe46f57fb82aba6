//! Wire-size estimation for mirrored requests.
//!
//! Sizes are notional: they approximate HTTP/1.1 wire bytes from the parsed
//! request rather than counting the bytes that actually crossed the socket.
//! HTTP/2 requests have no literal request line and carry HPACK-compressed
//! headers, so for them the figures describe an equivalent HTTP/1.1 request.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Uri, Version};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::time::Instant;

/// Bytes added per header line: ": " plus CRLF.
const HEADER_LINE_OVERHEAD: usize = 4;

/// Size components of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestSize {
    pub request_line: u64,
    pub headers: u64,
    pub body: u64,
}

impl RequestSize {
    pub fn total(&self) -> u64 {
        self.request_line + self.headers + self.body
    }
}

/// `METHOD SP target SP proto CRLF`
pub fn request_line_size(method: &str, target: &str, proto: &str) -> u64 {
    (method.len() + 1 + target.len() + 1 + proto.len() + 2) as u64
}

/// Sum of `name: value\r\n` over every header entry, plus the terminating
/// blank line. Repeated names count once per value.
///
/// `Host` is counted like any other header, so for HTTP/1 the figure is
/// `len("host") + 4 + len(host)` bytes above a sink that strips it first.
pub fn header_size(headers: &HeaderMap) -> u64 {
    let lines: u64 = headers
        .iter()
        .map(|(name, value)| (name.as_str().len() + value.len() + HEADER_LINE_OVERHEAD) as u64)
        .sum();
    lines + 2
}

/// Protocol token as it would appear on an HTTP/1 request line.
pub fn proto_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// The request target as the client sent it.
///
/// HTTP/1 keeps whatever form arrived (origin, absolute or authority form).
/// HTTP/2 always carries a full URI built from pseudo-headers, so only the
/// `:path` part is used.
pub fn request_target(uri: &Uri, version: Version) -> String {
    if matches!(version, Version::HTTP_2 | Version::HTTP_3) {
        return uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
    }
    uri.to_string()
}

/// Why a body drain stopped early.
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("body read failed: {0}")]
    Read(#[from] axum::Error),

    #[error("body read deadline exceeded after {0:?}")]
    Deadline(Duration),
}

/// Result of draining a request body.
#[derive(Debug)]
pub struct BodyDrain {
    /// Data bytes read before the body ended or failed.
    pub bytes: u64,
    pub error: Option<DrainError>,
}

/// Read the whole body into nothing, counting data bytes.
///
/// Frames are dropped as soon as they are counted, so memory use does not
/// depend on body length. Stops at the first error or once `deadline` passes.
pub async fn drain_body(body: Body, deadline: Instant) -> BodyDrain {
    let started = Instant::now();
    let mut stream = body.into_data_stream();
    let mut bytes = 0u64;

    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(Ok(chunk))) => bytes += chunk.len() as u64,
            Ok(Some(Err(e))) => {
                return BodyDrain {
                    bytes,
                    error: Some(DrainError::Read(e)),
                }
            }
            Ok(None) => return BodyDrain { bytes, error: None },
            Err(_) => {
                return BodyDrain {
                    bytes,
                    error: Some(DrainError::Deadline(started.elapsed())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.append(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn health_check_request_line() {
        assert_eq!(request_line_size("GET", "/health", "HTTP/1.1"), 22);
    }

    #[test]
    fn empty_header_block_is_terminator_only() {
        assert_eq!(header_size(&HeaderMap::new()), 2);
    }

    #[test]
    fn header_size_counts_each_entry() {
        let map = headers(&[("host", "example.com"), ("accept", "*/*")]);
        // "host: example.com\r\n" = 19, "accept: */*\r\n" = 13, final CRLF = 2
        assert_eq!(header_size(&map), 19 + 13 + 2);
    }

    #[test]
    fn repeated_names_are_separate_lines() {
        let map = headers(&[("x-tag", "a"), ("x-tag", "bb")]);
        assert_eq!(header_size(&map), (5 + 1 + 4) + (5 + 2 + 4) + 2);
    }

    #[test]
    fn header_size_ignores_insertion_order() {
        let forward = headers(&[("a", "1"), ("bb", "22"), ("ccc", "333")]);
        let reverse = headers(&[("ccc", "333"), ("bb", "22"), ("a", "1")]);
        assert_eq!(header_size(&forward), header_size(&reverse));
    }

    #[test]
    fn total_is_sum_of_parts() {
        let size = RequestSize {
            request_line: 22,
            headers: 2,
            body: 40,
        };
        assert_eq!(size.total(), 64);
    }

    #[test]
    fn proto_tokens() {
        assert_eq!(proto_str(Version::HTTP_10), "HTTP/1.0");
        assert_eq!(proto_str(Version::HTTP_11), "HTTP/1.1");
        assert_eq!(proto_str(Version::HTTP_2), "HTTP/2.0");
    }

    #[test]
    fn target_keeps_query() {
        let uri: Uri = "/search?q=rust".parse().unwrap();
        assert_eq!(request_target(&uri, Version::HTTP_11), "/search?q=rust");
    }

    #[test]
    fn h2_target_is_path_only() {
        let uri: Uri = "https://example.com/a/b?c=d".parse().unwrap();
        assert_eq!(request_target(&uri, Version::HTTP_2), "/a/b?c=d");
        assert_eq!(
            request_target(&uri, Version::HTTP_11),
            "https://example.com/a/b?c=d"
        );
    }

    #[tokio::test]
    async fn drain_counts_streamed_chunks() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = (0..64)
            .map(|_| Ok(Bytes::from(vec![7u8; 1024])))
            .collect();
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let drained = drain_body(body, Instant::now() + Duration::from_secs(5)).await;
        assert_eq!(drained.bytes, 64 * 1024);
        assert!(drained.error.is_none());
    }

    #[tokio::test]
    async fn drain_reports_partial_count_on_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"hello")),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"never read")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let drained = drain_body(body, Instant::now() + Duration::from_secs(5)).await;
        assert_eq!(drained.bytes, 5);
        assert!(matches!(drained.error, Some(DrainError::Read(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_stops_at_deadline() {
        let head = futures_util::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
            b"abc",
        ))]);
        let stalled = head.chain(futures_util::stream::pending::<Result<Bytes, std::io::Error>>());
        let body = Body::from_stream(stalled);

        let drained = drain_body(body, Instant::now() + Duration::from_secs(5)).await;
        assert_eq!(drained.bytes, 3);
        assert!(matches!(drained.error, Some(DrainError::Deadline(_))));
    }
}
