//! Backend forwarding proxy
//!
//! Forwards an inbound request to the configured scan backend:
//! - the base URL goes through the SSRF guard before anything is dialed
//! - inbound and upstream headers are filtered against fixed allow-lists
//! - redirects are never followed; a 3xx is reported as blocked
//! - `cache-control: no-store` is forced in both directions
//!
//! Candidate probing tries several historical route shapes in order and
//! records every attempt in a [`CandidateReport`].

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::url_guard::{UrlPurpose, UrlValidator};
use crate::models::config::GatewayConfig;
use crate::models::errors::{AppError, ErrorCode};
use crate::providers::http::{build_client, exchange, RawResponse, TransportError};
use crate::utils::constants::{
    CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, FORWARD_REQUEST_HEADERS, FORWARD_RESPONSE_HEADERS,
    HOP_BY_HOP_HEADERS, NO_STORE, RATE_LIMIT_HEADER_PREFIX, REQUEST_ID_HEADER,
};

/// Where the backend base URL stands after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    /// Nothing configured, fallback may take over
    Absent,
    /// Configured but rejected by the validator
    Invalid(String),
    /// Normalized base URL, safe to dial
    Valid(String),
}

/// One request to replay against the backend
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardRequest {
    pub fn new(method: Method, query: Option<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            query: query.filter(|q| !q.is_empty()),
            headers,
            body,
        }
    }
}

/// Result of [`BackendProxy::forward`]
#[derive(Debug)]
pub enum ProxyOutcome {
    /// No backend configured; caller decides whether to fall back
    NotConfigured,
    /// Backend configured but invalid; fail closed
    InvalidConfig(AppError),
    /// Preflight answered locally
    Preflight(Response),
    /// Upstream response relayed to the caller
    Forwarded(Response),
    /// Transport failure or blocked redirect
    Failed(AppError),
}

/// Shape of an upstream body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Json,
    Html,
    NonJson,
}

/// Classify an upstream body from its content type and bytes
pub fn classify(content_type: &str, body: &[u8]) -> BodyKind {
    let ct = content_type.to_ascii_lowercase();
    let parses = || serde_json::from_slice::<serde_json::Value>(body).is_ok();

    if ct.contains("application/json") || ct.contains("+json") {
        return if parses() { BodyKind::Json } else { BodyKind::NonJson };
    }
    if ct.contains("text/html") || looks_like_html(body) {
        return BodyKind::Html;
    }

    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    if matches!(first, Some(b'{') | Some(b'[')) && parses() {
        BodyKind::Json
    } else {
        BodyKind::NonJson
    }
}

fn looks_like_html(body: &[u8]) -> bool {
    let head: Vec<u8> = body
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(15)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    head.starts_with(b"<!doctype html") || head.starts_with(b"<html")
}

/// What happened on one candidate path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Answered { status: u16, body: BodyKind },
    Failed { code: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateAttempt {
    pub path: String,
    pub outcome: AttemptOutcome,
}

/// Ordered record of a candidate probe
#[derive(Debug, Default)]
pub struct CandidateReport {
    pub attempts: Vec<CandidateAttempt>,
    /// First JSON response, whatever its status
    pub winner: Option<RawResponse>,
    /// Last non-success outcome, set whenever there is no winner
    pub last_error: Option<AppError>,
}

/// Final reading of a [`CandidateReport`]
#[derive(Debug)]
pub enum CandidateVerdict {
    Winner(RawResponse),
    /// Probing stopped on a failure that forbids fallback
    Blocked(AppError),
    /// Every candidate was wrong or unreachable
    Exhausted(AppError),
}

impl CandidateReport {
    fn record(&mut self, path: &str, outcome: AttemptOutcome) {
        self.attempts.push(CandidateAttempt {
            path: path.to_string(),
            outcome,
        });
    }

    pub fn verdict(self) -> CandidateVerdict {
        if let Some(winner) = self.winner {
            return CandidateVerdict::Winner(winner);
        }
        let error = self
            .last_error
            .unwrap_or_else(|| AppError::upstream_unreachable("no backend candidates"));
        if error.code.permits_fallback() {
            CandidateVerdict::Exhausted(error)
        } else {
            CandidateVerdict::Blocked(error)
        }
    }
}

/// Proxy bound to one configuration
pub struct BackendProxy<'a> {
    config: &'a GatewayConfig,
    validator: UrlValidator,
}

impl<'a> BackendProxy<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self {
            config,
            validator: UrlValidator::new(config),
        }
    }

    /// Validate the configured base URL
    pub fn target(&self) -> BackendTarget {
        match self.config.backend_base.as_deref() {
            None => BackendTarget::Absent,
            Some(raw) => match self.validator.validate(raw, UrlPurpose::Backend).into_result() {
                Ok(base) => BackendTarget::Valid(base),
                Err(reason) => BackendTarget::Invalid(reason),
            },
        }
    }

    /// Forward `request` to `{base}{path}` and relay the answer.
    ///
    /// The backend must be configured and valid before anything is answered,
    /// preflights included.
    pub async fn forward(&self, path: &str, request: &ForwardRequest) -> ProxyOutcome {
        let base = match self.target() {
            BackendTarget::Absent => return ProxyOutcome::NotConfigured,
            BackendTarget::Invalid(reason) => {
                return ProxyOutcome::InvalidConfig(AppError::invalid_backend_url(reason))
            }
            BackendTarget::Valid(base) => base,
        };

        if request.method == Method::OPTIONS {
            let origin = request
                .headers
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok());
            return ProxyOutcome::Preflight(self.preflight(origin));
        }

        match self.send(&base, path, request).await {
            Ok(raw) => ProxyOutcome::Forwarded(relay(raw)),
            Err(err) => ProxyOutcome::Failed(err),
        }
    }

    /// Try each path in order; stop at the first JSON answer or a redirect
    pub async fn probe_candidates(
        &self,
        base: &str,
        paths: &[&str],
        request: &ForwardRequest,
    ) -> CandidateReport {
        let mut report = CandidateReport::default();

        for &path in paths {
            let raw = match self.send(base, path, request).await {
                Ok(raw) => raw,
                Err(err) => {
                    debug!(path, code = err.code_str(), "Backend candidate failed");
                    report.record(path, AttemptOutcome::Failed { code: err.code_str() });
                    let stop = !err.code.permits_fallback();
                    report.last_error = Some(err);
                    if stop {
                        break;
                    }
                    continue;
                }
            };

            let kind = classify(raw.content_type(), &raw.body);
            debug!(path, status = raw.status.as_u16(), body = ?kind, "Backend candidate answered");
            report.record(
                path,
                AttemptOutcome::Answered {
                    status: raw.status.as_u16(),
                    body: kind,
                },
            );

            match kind {
                BodyKind::Json => {
                    report.winner = Some(raw);
                    report.last_error = None;
                    break;
                }
                BodyKind::Html => {
                    report.last_error = Some(AppError::upstream_invalid_json(format!(
                        "backend returned HTML on {path}"
                    )));
                }
                BodyKind::NonJson => {
                    report.last_error = Some(AppError::upstream_invalid_json(format!(
                        "backend returned a non-JSON body on {path}"
                    )));
                }
            }
        }

        report
    }

    /// 204 preflight; the origin is only echoed when it passes validation
    pub fn preflight(&self, origin: Option<&str>) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin.filter(|o| self.validator.origin_allowed(o)) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(header::VARY, HeaderValue::from_static("origin"));
            }
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        (StatusCode::NO_CONTENT, headers).into_response()
    }

    /// One outbound exchange, redirect and transport failures mapped to errors
    async fn send(
        &self,
        base: &str,
        path: &str,
        request: &ForwardRequest,
    ) -> Result<RawResponse, AppError> {
        let url = upstream_url(base, path, request.query.as_deref());
        let client = build_client().map_err(|e| AppError::internal(e.to_string()))?;

        let mut outbound = client
            .request(request.method.clone(), url)
            .headers(forward_headers(&request.headers));
        if request.method != Method::GET && request.method != Method::HEAD {
            outbound = outbound.body(request.body.clone());
        }

        let raw = exchange(outbound, self.config.backend_timeout)
            .await
            .map_err(|err| match err {
                TransportError::Timeout(d) => {
                    AppError::upstream_timeout(format!("backend did not answer within {d:?}"))
                }
                TransportError::Unreachable(msg) => AppError::upstream_unreachable(msg),
                TransportError::BodyTooLarge(limit) => {
                    AppError::upstream_invalid_json(format!("backend body exceeds {limit} bytes"))
                }
            })?;

        if raw.status.is_redirection() {
            warn!(path, status = raw.status.as_u16(), "🚫 Backend redirect blocked");
            return Err(AppError::redirect_blocked(raw.status.as_u16()));
        }

        Ok(raw)
    }
}

/// `{base}{path}?{query}` with exactly one slash between base and path
pub fn upstream_url(base: &str, path: &str, query: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let mut url = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push(if path.contains('?') { '&' } else { '?' });
        url.push_str(query);
    }
    url
}

/// Allow-listed inbound headers, plus a request id and `no-store`
pub fn forward_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in FORWARD_REQUEST_HEADERS {
        if let Some(value) = inbound.get(name) {
            out.insert(HeaderName::from_static(name), value.clone());
        }
    }
    if !out.contains_key(REQUEST_ID_HEADER) {
        if let Ok(id) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
            out.insert(HeaderName::from_static(REQUEST_ID_HEADER), id);
        }
    }
    out.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    out
}

/// Upstream headers the caller may see
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in upstream {
        let key = name.as_str();
        if HOP_BY_HOP_HEADERS.contains(&key) {
            continue;
        }
        if FORWARD_RESPONSE_HEADERS.contains(&key) || key.starts_with(RATE_LIMIT_HEADER_PREFIX) {
            out.append(name.clone(), value.clone());
        }
    }
    out.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    out
}

/// Status and body verbatim, headers filtered
pub fn relay(raw: RawResponse) -> Response {
    let headers = filter_response_headers(&raw.headers);
    (raw.status, headers, Body::from(raw.body)).into_response()
}

impl ProxyOutcome {
    /// Render outcomes that need no further decision
    pub fn into_response_or(self, not_configured: impl FnOnce() -> Response) -> Response {
        match self {
            Self::NotConfigured => not_configured(),
            Self::InvalidConfig(err) | Self::Failed(err) => err.into_response(),
            Self::Preflight(resp) | Self::Forwarded(resp) => resp,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::InvalidConfig(err) | Self::Failed(err) => Some(err.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GatewayConfig {
        GatewayConfig::default()
            .with_backend(server.uri())
            .allow_loopback_for_tests()
    }

    fn get_request() -> ForwardRequest {
        ForwardRequest::new(Method::GET, None, HeaderMap::new(), Bytes::new())
    }

    #[test]
    fn test_upstream_url() {
        assert_eq!(upstream_url("https://a.io/", "/api/scan", None), "https://a.io/api/scan");
        assert_eq!(upstream_url("https://a.io", "scan", Some("mint=x")), "https://a.io/scan?mint=x");
        assert_eq!(upstream_url("https://a.io", "/p?a=1", Some("b=2")), "https://a.io/p?a=1&b=2");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("application/json; charset=utf-8", b"{\"a\":1}"), BodyKind::Json);
        assert_eq!(classify("application/json", b"not json"), BodyKind::NonJson);
        assert_eq!(classify("text/html", b"{}"), BodyKind::Html);
        assert_eq!(classify("", b"  <!DOCTYPE html><html>"), BodyKind::Html);
        assert_eq!(classify("text/plain", b"[1,2]"), BodyKind::Json);
        assert_eq!(classify("text/plain", b"hello"), BodyKind::NonJson);
    }

    #[test]
    fn test_forward_headers_allow_list() {
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer t"));
        inbound.insert("cookie", HeaderValue::from_static("session=1"));
        inbound.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        inbound.insert("cache-control", HeaderValue::from_static("max-age=60"));

        let out = forward_headers(&inbound);
        assert_eq!(out["authorization"], "Bearer t");
        assert!(out.get("cookie").is_none());
        assert!(out.get("x-forwarded-for").is_none());
        assert_eq!(out[header::CACHE_CONTROL], NO_STORE);
        assert!(out.contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_forward_headers_keeps_request_id() {
        let mut inbound = HeaderMap::new();
        inbound.insert("x-request-id", HeaderValue::from_static("abc"));
        assert_eq!(forward_headers(&inbound)[REQUEST_ID_HEADER], "abc");
    }

    #[test]
    fn test_filter_response_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert("content-type", HeaderValue::from_static("application/json"));
        upstream.insert("x-ratelimit-remaining", HeaderValue::from_static("9"));
        upstream.insert("retry-after", HeaderValue::from_static("3"));
        upstream.insert("set-cookie", HeaderValue::from_static("a=b"));
        upstream.insert("connection", HeaderValue::from_static("keep-alive"));
        upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        upstream.insert("cache-control", HeaderValue::from_static("public, max-age=600"));

        let out = filter_response_headers(&upstream);
        assert_eq!(out["content-type"], "application/json");
        assert_eq!(out["x-ratelimit-remaining"], "9");
        assert_eq!(out["retry-after"], "3");
        assert!(out.get("set-cookie").is_none());
        assert!(out.get("connection").is_none());
        assert!(out.get("transfer-encoding").is_none());
        assert_eq!(out[header::CACHE_CONTROL], NO_STORE);
    }

    #[test]
    fn test_target_states() {
        let absent = GatewayConfig::default();
        assert_eq!(BackendProxy::new(&absent).target(), BackendTarget::Absent);

        let invalid = GatewayConfig::default().with_backend("http://169.254.169.254");
        assert!(matches!(BackendProxy::new(&invalid).target(), BackendTarget::Invalid(_)));

        let valid = GatewayConfig::default().with_backend("https://api.example.com/api/");
        assert_eq!(
            BackendProxy::new(&valid).target(),
            BackendTarget::Valid("https://api.example.com".to_string())
        );
    }

    #[test]
    fn test_preflight_origin_scoping() {
        let mut config = GatewayConfig::default();
        config.environment = crate::models::config::Environment::Production;
        let proxy = BackendProxy::new(&config);

        let ok = proxy.preflight(Some("https://app.example.com"));
        assert_eq!(ok.status(), StatusCode::NO_CONTENT);
        assert_eq!(ok.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(ok.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], CORS_ALLOW_METHODS);

        let private = proxy.preflight(Some("http://192.168.1.10"));
        assert!(private.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let none = proxy.preflight(None);
        assert!(none.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_forward_relays_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/apply"))
            .and(header_is("cache-control", "no-store"))
            .respond_with(
                ResponseTemplate::new(418)
                    .set_body_json(json!({ "teapot": true }))
                    .insert_header("x-ratelimit-limit", "10")
                    .insert_header("set-cookie", "s=1"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let outcome = BackendProxy::new(&config).forward("/api/apply", &get_request()).await;
        let response = match outcome {
            ProxyOutcome::Forwarded(r) => r,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert!(response.headers().get("set-cookie").is_none());
        assert_eq!(response.headers()[header::CACHE_CONTROL], NO_STORE);
    }

    #[tokio::test]
    async fn test_forward_blocks_redirect() {
        let target = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&target)
            .await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", target.uri().as_str()))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let outcome = BackendProxy::new(&config).forward("/api/apply", &get_request()).await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::UpstreamRedirectBlocked));
    }

    #[tokio::test]
    async fn test_forward_not_configured_and_invalid() {
        let absent = GatewayConfig::default();
        let outcome = BackendProxy::new(&absent).forward("/api/apply", &get_request()).await;
        assert!(matches!(outcome, ProxyOutcome::NotConfigured));

        let invalid = GatewayConfig::default().with_backend("http://localhost:3000");
        let outcome = BackendProxy::new(&invalid).forward("/api/apply", &get_request()).await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::ConfigInvalidBackendUrl));
    }

    #[tokio::test]
    async fn test_options_checks_backend_first() {
        let options = ForwardRequest::new(Method::OPTIONS, None, HeaderMap::new(), Bytes::new());

        let absent = GatewayConfig::default();
        let outcome = BackendProxy::new(&absent).forward("/api/apply", &options).await;
        assert!(matches!(outcome, ProxyOutcome::NotConfigured));

        let invalid = GatewayConfig::default().with_backend("http://169.254.169.254");
        let outcome = BackendProxy::new(&invalid).forward("/api/apply", &options).await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::ConfigInvalidBackendUrl));

        // Valid backend: answered locally, nothing is dialed
        let server = MockServer::start().await;
        Mock::given(method("OPTIONS"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let config = config_for(&server);
        let outcome = BackendProxy::new(&config).forward("/api/apply", &options).await;
        let ProxyOutcome::Preflight(response) = outcome else {
            panic!("expected a preflight");
        };
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_probe_skips_html_and_takes_json() {
        let server = MockServer::start().await;
        Mock::given(path("/api/scan"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>nope</html>", "text/html"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/scan"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "success": false })))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let proxy = BackendProxy::new(&config);
        let report = proxy
            .probe_candidates(&server.uri(), &["/api/scan", "/scan"], &get_request())
            .await;

        assert_eq!(report.attempts.len(), 2);
        assert_eq!(
            report.attempts[0].outcome,
            AttemptOutcome::Answered { status: 200, body: BodyKind::Html }
        );
        match report.verdict() {
            CandidateVerdict::Winner(raw) => assert_eq!(raw.status, StatusCode::NOT_FOUND),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_exhaustion_permits_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<!doctype html>", "text/html"))
            .expect(2)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let report = BackendProxy::new(&config)
            .probe_candidates(&server.uri(), &["/api/scan", "/scan"], &get_request())
            .await;
        match report.verdict() {
            CandidateVerdict::Exhausted(err) => assert_eq!(err.code, ErrorCode::UpstreamInvalidJson),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_stops_on_redirect() {
        let server = MockServer::start().await;
        Mock::given(path("/api/scan"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "http://10.0.0.1/"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/scan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let report = BackendProxy::new(&config)
            .probe_candidates(&server.uri(), &["/api/scan", "/scan"], &get_request())
            .await;
        assert_eq!(report.attempts.len(), 1);
        match report.verdict() {
            CandidateVerdict::Blocked(err) => assert_eq!(err.code, ErrorCode::UpstreamRedirectBlocked),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }
}
