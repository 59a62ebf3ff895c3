//! Request logging middleware with correlation ids and redaction.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Response header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const REDACTED: &str = "[REDACTED]";

/// Bodies above this size are replayed to the handler but not logged.
const MAX_LOGGED_BODY_BYTES: usize = 64 * 1024;

/// Case-insensitive substrings marking a header or body field as
/// sensitive.
const SENSITIVE_MARKERS: &[&str] = &[
    "authorization",
    "cookie",
    "x-api-key",
    "password",
    "token",
    "secret",
    "key",
    "auth",
    "credentials",
];

/// Correlation id attached to the request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Request logging middleware.
///
/// Assigns a correlation id, logs the redacted request, and on
/// completion logs status and latency with a performance category.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let request_id = generate_request_id();

    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = client_ip(&request);
    let user_agent = header_str(request.headers(), header::USER_AGENT.as_str())
        .unwrap_or("Unknown")
        .to_string();
    let content_length = header_str(request.headers(), header::CONTENT_LENGTH.as_str())
        .unwrap_or("0")
        .to_string();
    let redacted_headers = redact_headers(request.headers());

    let (mut request, logged_body) = buffer_body_for_logging(request).await;
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    info!(
        target: "http",
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        query = uri.query().unwrap_or(""),
        ip = %client_ip,
        user_agent = %user_agent,
        content_length = %content_length,
        headers = %redacted_headers,
        body = logged_body.as_deref().unwrap_or(""),
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let performance = categorize_performance(latency_ms);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if status >= 500 {
        error!(
            target: "http",
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status,
            latency_ms,
            performance,
            ip = %client_ip,
            "Request failed"
        );
    } else if status >= 400 {
        warn!(
            target: "http",
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status,
            latency_ms,
            performance,
            ip = %client_ip,
            "Request completed with client error"
        );
    } else {
        info!(
            target: "http",
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status,
            latency_ms,
            performance,
            ip = %client_ip,
            "Request completed"
        );
    }

    if latency_ms > 1000 {
        warn!(
            target: "http",
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            latency_ms,
            threshold_ms = 1000u64,
            "Slow response detected"
        );
    }

    response
}

/// Generates a 16-hex-character correlation id.
fn generate_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// Resolves the client IP, preferring proxy headers over the socket
/// address.
fn client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = header_str(request.headers(), "x-forwarded-for") {
        return forwarded.to_string();
    }
    if let Some(real_ip) = header_str(request.headers(), "x-real-ip") {
        return real_ip.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "Unknown".to_string(), |info| info.0.ip().to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Whether a header or body field name is sensitive.
fn is_sensitive(name: &str) -> bool {
    let name = name.to_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Renders headers as a JSON object with sensitive values redacted.
fn redact_headers(headers: &HeaderMap) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        let rendered = if is_sensitive(name.as_str()) {
            REDACTED.to_string()
        } else {
            value.to_str().unwrap_or("<binary>").to_string()
        };
        map.insert(name.as_str().to_string(), serde_json::Value::String(rendered));
    }
    serde_json::Value::Object(map)
}

/// Redacts sensitive top-level fields of a JSON object in place.
fn redact_json(value: &mut serde_json::Value) {
    if let serde_json::Value::Object(map) = value {
        for (key, field) in map.iter_mut() {
            if is_sensitive(key) {
                *field = serde_json::Value::String(REDACTED.to_string());
            }
        }
    }
}

/// Buffers the request body for logging on mutating methods, replaying
/// it unchanged to the handler. Non-JSON and oversized bodies are
/// replayed but not logged.
async fn buffer_body_for_logging(request: Request<Body>) -> (Request<Body>, Option<String>) {
    let logs_body = matches!(request.method().as_str(), "POST" | "PUT" | "PATCH");
    if !logs_body {
        return (request, None);
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to buffer request body for logging: {}", e);
            return (Request::from_parts(parts, Body::empty()), None);
        }
    };

    let logged = if bytes.is_empty() || bytes.len() > MAX_LOGGED_BODY_BYTES {
        None
    } else {
        serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .map(|mut value| {
                redact_json(&mut value);
                value.to_string()
            })
    };

    (Request::from_parts(parts, Body::from(bytes)), logged)
}

/// Buckets a response latency into a performance category.
fn categorize_performance(latency_ms: u64) -> &'static str {
    if latency_ms < 100 {
        "excellent"
    } else if latency_ms < 300 {
        "good"
    } else if latency_ms < 1000 {
        "acceptable"
    } else if latency_ms < 2000 {
        "slow"
    } else {
        "very_slow"
    }
}
