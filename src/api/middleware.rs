//! API Middleware (Request Id, Cache, Security Headers, Logging)

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::handlers::AppState;
use crate::utils::constants::{CORRELATION_ID_HEADER, NO_STORE_STRICT, REQUEST_ID_HEADER};

/// Longest caller-supplied id that is kept
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id of the current request, available as an extension
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn usable_id(value: &HeaderValue) -> Option<String> {
    let id = value.to_str().ok()?.trim();
    (!id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN).then(|| id.to_string())
}

/// Echo `x-request-id` / `x-correlation-id` or generate one.
///
/// The id is written back into the inbound headers so the proxy forwards
/// it, and onto the response unless the upstream already set one.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers();
    let correlation = headers.get(CORRELATION_ID_HEADER).cloned();
    let id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(usable_id)
        .or_else(|| correlation.as_ref().and_then(usable_id))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let value = HeaderValue::from_str(&id).ok();
    if let Some(value) = &value {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }
    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).await;

    let out = response.headers_mut();
    if let Some(value) = value {
        out.entry(REQUEST_ID_HEADER).or_insert(value);
    }
    if let Some(correlation) = correlation {
        out.entry(CORRELATION_ID_HEADER).or_insert(correlation);
    }
    response
}

/// Every response is uncacheable
pub async fn no_cache_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static(NO_STORE_STRICT));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

/// Browser hardening headers, HSTS only in production
pub async fn security_headers_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), microphone=(), geolocation=(), payment=(), usb=(), interest-cohort=()",
        ),
    );
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));

    if state.config.is_production() {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
        );
    }

    response
}

/// Request logging middleware
pub async fn logging_middleware(
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::HeaderMap, middleware, routing::get, Router};
    use tower::ServiceExt;

    // Echoes the id the handler saw so tests can check the inbound injection
    async fn echo(headers: HeaderMap) -> String {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo))
            .layer(middleware::from_fn(no_cache_middleware))
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn call(headers: &[(&str, &str)]) -> (HeaderMap, String) {
        let mut builder = axum::http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_request_id_echoed_and_injected() {
        let (headers, seen) = call(&[(REQUEST_ID_HEADER, "abc-1")]).await;
        assert_eq!(seen, "abc-1");
        assert_eq!(headers[REQUEST_ID_HEADER], "abc-1");
    }

    #[tokio::test]
    async fn test_correlation_id_used_when_request_id_missing() {
        let (headers, seen) = call(&[(CORRELATION_ID_HEADER, "corr-9")]).await;
        assert_eq!(seen, "corr-9");
        assert_eq!(headers[REQUEST_ID_HEADER], "corr-9");
        assert_eq!(headers[CORRELATION_ID_HEADER], "corr-9");
    }

    #[tokio::test]
    async fn test_oversized_id_replaced_with_uuid() {
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let (headers, seen) = call(&[(REQUEST_ID_HEADER, long.as_str())]).await;
        assert_ne!(seen, long);
        assert!(uuid::Uuid::parse_str(&seen).is_ok());
        assert_eq!(headers[REQUEST_ID_HEADER], seen.as_str());
    }

    #[tokio::test]
    async fn test_no_cache_headers() {
        let (headers, _) = call(&[]).await;
        assert_eq!(headers[header::CACHE_CONTROL], NO_STORE_STRICT);
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
    }
}
