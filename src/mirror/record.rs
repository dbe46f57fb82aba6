//! The flow record: one immutable summary per mirrored request.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use serde::{Serialize, Serializer};

use crate::mirror::redact::RedactionPolicy;
use crate::mirror::size::{proto_str, request_target, RequestSize};

/// Size, timing and peer of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStats {
    pub total_request_size: u64,
    pub header_size: u64,
    pub body_size: u64,
    /// Serialized as integer nanoseconds.
    #[serde(serialize_with = "serialize_nanos")]
    pub latency: Duration,
    pub client_ip: String,
}

/// Request-line and descriptive header fields, unredacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpInfo {
    pub method: String,
    pub host: String,
    pub uri: String,
    pub proto: String,
    pub user_agent: String,
    pub referer: String,
}

/// Forwarding/tracing headers and redacted credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub x_forwarded_for: String,
    pub x_request_id: String,
    pub x_envoy_original_path: String,
    pub authorization: String,
    pub has_cookie: bool,
    /// Every header after redaction; only present when header capture is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

/// Immutable summary of one mirrored request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRecord {
    pub flow: FlowStats,
    pub http: HttpInfo,
    pub metadata: Metadata,
}

/// Everything measured about a request before it becomes a record.
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    pub size: RequestSize,
    pub latency: Duration,
    pub client: Option<SocketAddr>,
}

impl FlowRecord {
    /// Build the record for a request head, applying `policy` to every
    /// credential-bearing field.
    pub fn build(
        parts: &Parts,
        measurement: Measurement,
        policy: &RedactionPolicy,
        capture_headers: bool,
    ) -> Self {
        let headers = &parts.headers;

        let host = match headers.get(header::HOST) {
            Some(value) => header_text(value).into_owned(),
            None => parts
                .uri
                .authority()
                .map(|a| a.as_str().to_string())
                .unwrap_or_default(),
        };

        let authorization = first(headers, &header::AUTHORIZATION);
        let authorization = policy
            .apply(header::AUTHORIZATION.as_str(), &authorization)
            .into_owned();

        Self {
            flow: FlowStats {
                total_request_size: measurement.size.total(),
                header_size: measurement.size.headers,
                body_size: measurement.size.body,
                latency: measurement.latency,
                client_ip: measurement
                    .client
                    .map(|addr| addr.to_string())
                    .unwrap_or_default(),
            },
            http: HttpInfo {
                method: parts.method.as_str().to_string(),
                host,
                uri: request_target(&parts.uri, parts.version),
                proto: proto_str(parts.version).to_string(),
                user_agent: first(headers, &header::USER_AGENT),
                referer: first(headers, &header::REFERER),
            },
            metadata: Metadata {
                x_forwarded_for: first(headers, &HeaderName::from_static("x-forwarded-for")),
                x_request_id: first(headers, &HeaderName::from_static("x-request-id")),
                x_envoy_original_path: first(
                    headers,
                    &HeaderName::from_static("x-envoy-original-path"),
                ),
                authorization,
                has_cookie: headers.contains_key(header::COOKIE),
                headers: capture_headers.then(|| captured_headers(headers, policy)),
            },
        }
    }
}

fn serialize_nanos<S: Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX))
}

/// Header bytes as text. Non-UTF-8 bytes are replaced rather than dropped.
fn header_text(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

fn first(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .map(|v| header_text(v).into_owned())
        .unwrap_or_default()
}

/// Redacted view of every header. Repeated names are joined with ", ".
fn captured_headers(headers: &HeaderMap, policy: &RedactionPolicy) -> BTreeMap<String, String> {
    let mut captured: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let text = header_text(value);
        let shown = policy.apply(name.as_str(), &text);
        captured
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&shown);
            })
            .or_insert_with(|| shown.into_owned());
    }
    captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::redact::REDACTED;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    fn measurement() -> Measurement {
        Measurement {
            size: RequestSize {
                request_line: 22,
                headers: 2,
                body: 0,
            },
            latency: Duration::from_micros(150),
            client: Some("10.0.0.7:51234".parse().unwrap()),
        }
    }

    #[test]
    fn bare_request_has_empty_header_fields() {
        let head = parts(Request::get("/health").body(()).unwrap());
        let record = FlowRecord::build(&head, measurement(), &RedactionPolicy::default(), false);

        assert_eq!(record.flow.total_request_size, 24);
        assert_eq!(record.flow.client_ip, "10.0.0.7:51234");
        assert_eq!(record.http.method, "GET");
        assert_eq!(record.http.uri, "/health");
        assert_eq!(record.http.proto, "HTTP/1.1");
        assert_eq!(record.http.host, "");
        assert_eq!(record.metadata.authorization, "");
        assert!(!record.metadata.has_cookie);
        assert!(record.metadata.headers.is_none());
    }

    #[test]
    fn forwarding_headers_are_copied_verbatim() {
        let head = parts(
            Request::post("/api/orders?id=3")
                .header("host", "shop.internal")
                .header("user-agent", "envoy")
                .header("referer", "https://shop.example/cart")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("x-request-id", "7f1c")
                .header("x-envoy-original-path", "/orders?id=3")
                .body(())
                .unwrap(),
        );
        let record = FlowRecord::build(&head, measurement(), &RedactionPolicy::default(), false);

        assert_eq!(record.http.host, "shop.internal");
        assert_eq!(record.http.uri, "/api/orders?id=3");
        assert_eq!(record.http.user_agent, "envoy");
        assert_eq!(record.http.referer, "https://shop.example/cart");
        assert_eq!(record.metadata.x_forwarded_for, "203.0.113.9, 10.0.0.1");
        assert_eq!(record.metadata.x_request_id, "7f1c");
        assert_eq!(record.metadata.x_envoy_original_path, "/orders?id=3");
    }

    #[test]
    fn credentials_are_masked_and_cookie_is_presence_only() {
        let head = parts(
            Request::get("/")
                .header("authorization", "Bearer abcdefghijklmno")
                .header("cookie", "session=xyz")
                .body(())
                .unwrap(),
        );
        let record = FlowRecord::build(&head, measurement(), &RedactionPolicy::default(), false);

        assert_eq!(record.metadata.authorization, "Bearer abc...mno");
        assert!(record.metadata.has_cookie);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("session=xyz"));
        assert!(!json.contains("abcdefghijklmno"));
    }

    #[test]
    fn captured_headers_are_redacted() {
        let head = parts(
            Request::get("/")
                .header("cookie", "session=xyz")
                .header("x-api-key", "k-123")
                .header("accept", "text/html")
                .header("accept", "application/json")
                .body(())
                .unwrap(),
        );
        let record = FlowRecord::build(&head, measurement(), &RedactionPolicy::default(), true);
        let headers = record.metadata.headers.unwrap();

        assert_eq!(headers["cookie"], REDACTED);
        assert_eq!(headers["x-api-key"], REDACTED);
        assert_eq!(headers["accept"], "text/html, application/json");
    }

    #[test]
    fn latency_serializes_as_nanoseconds() {
        let head = parts(Request::get("/").body(()).unwrap());
        let record = FlowRecord::build(&head, measurement(), &RedactionPolicy::default(), false);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["flow"]["latency"], 150_000);
        assert!(value["metadata"].get("headers").is_none());
    }
}
