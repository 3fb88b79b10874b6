//! API Request Handlers

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{rejection::QueryRejection, Query, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::middleware::RequestId;
use super::types::*;
use crate::core::normalize::normalize_scan_response;
use crate::core::proxy::{relay, BackendProxy, ForwardRequest, ProxyOutcome};
use crate::core::scan::{FallbackReason, ScanDecision, ScanService};
use crate::models::config::GatewayConfig;
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    APPLY_BACKEND_PATH, MAX_FORWARD_BODY_BYTES, MAX_SCAN_BODY_BYTES, NO_STORE, NO_STORE_STRICT,
    SCAN_CANDIDATE_PATHS,
};

/// Shared application state
pub struct AppState {
    pub config: GatewayConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Buffer an inbound body, rejecting anything over `limit` bytes
async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> AppResult<Bytes> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(AppError::payload_too_large(limit));
    }

    // A buffered body only fails here when it runs past the limit
    to_bytes(body, limit)
        .await
        .map_err(|_| AppError::payload_too_large(limit))
}

/// Query rejections become a JSON 400 instead of axum's plain-text body
fn scan_query(query: Result<Query<ScanQuery>, QueryRejection>) -> AppResult<ScanQuery> {
    query.map(|Query(query)| query).map_err(|rejection| {
        AppError::bad_request(format!("invalid query string: {}", rejection.body_text()))
    })
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

/// Render a scan decision
fn render_decision(decision: ScanDecision, normalize: bool, mint: &str) -> Response {
    match decision {
        ScanDecision::Upstream { response, attempts } => {
            debug!(attempts = attempts.len(), status = response.status.as_u16(), "Backend answered scan");
            if normalize && response.status.is_success() {
                if let Ok(raw) = serde_json::from_slice::<serde_json::Value>(&response.body) {
                    let report = normalize_scan_response(&raw, mint);
                    return ApiResponse::with_meta(
                        report,
                        ScanMeta {
                            source: "backend",
                            reason: None,
                        },
                    )
                    .into_response();
                }
            }
            relay(response)
        }
        ScanDecision::Fallback { report, reason, .. } => ApiResponse::with_meta(
            report,
            ScanMeta {
                source: "onchain",
                reason: Some(reason.as_str()),
            },
        )
        .into_response(),
        ScanDecision::Reject(err) => err.into_response(),
    }
}

// ============================================
// Scan
// ============================================

/// POST /api/scan
pub async fn scan_post(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScanQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let query = match scan_query(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };

    let bytes = match read_body(&headers, body, MAX_SCAN_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => return err.into_response(),
    };

    let mint = match extract_mint(&bytes) {
        Ok(mint) => mint,
        Err(err) => return err.into_response(),
    };
    let mint = match validate_mint(mint.as_deref()) {
        Ok(mint) => mint,
        Err(invalid) => return invalid.into_response(),
    };

    info!(mint = %mint, "🔍 Scan requested");

    let mut forward_headers = headers;
    forward_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let payload = Bytes::from(json!({ "mint": mint }).to_string());
    let request = ForwardRequest::new(Method::POST, None, forward_headers, payload);

    let decision = ScanService::new(&state.config).decide(&mint, &request).await;
    render_decision(decision, query.wants_normalized(), &mint)
}

/// GET /api/scan?mint=
pub async fn scan_get(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScanQuery>, QueryRejection>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let query = match scan_query(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    let mint = match validate_mint(query.mint.as_deref()) {
        Ok(mint) => mint,
        Err(invalid) => return invalid.into_response(),
    };

    let request = ForwardRequest::new(Method::GET, raw_query, headers, Bytes::new());
    let outcome = BackendProxy::new(&state.config)
        .forward(SCAN_CANDIDATE_PATHS[0], &request)
        .await;

    match outcome {
        ProxyOutcome::NotConfigured if state.config.fallback_enabled => {
            let decision = ScanService::new(&state.config)
                .fallback(&mint, FallbackReason::BackendNotConfigured, Vec::new(), None)
                .await;
            render_decision(decision, false, &mint)
        }
        other => other.into_response_or(|| AppError::backend_not_configured().into_response()),
    }
}

/// OPTIONS /api/scan
pub async fn preflight(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    BackendProxy::new(&state.config).preflight(origin(&headers))
}

// ============================================
// Apply
// ============================================

/// GET|POST|OPTIONS /api/apply
pub async fn apply(
    State(state): State<Arc<AppState>>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let bytes = if method == Method::GET || method == Method::OPTIONS {
        Bytes::new()
    } else {
        match read_body(&headers, body, MAX_FORWARD_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(err) => return err.into_response(),
        }
    };

    let request = ForwardRequest::new(method, raw_query, headers, bytes);
    BackendProxy::new(&state.config)
        .forward(APPLY_BACKEND_PATH, &request)
        .await
        .into_response_or(|| AppError::backend_not_configured().into_response())
}

// ============================================
// Health & Ping
// ============================================

/// GET|HEAD /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let data = HealthData {
        ok: true,
        ts: chrono::Utc::now().to_rfc3339(),
        deployment_id: state.config.deployment_id.clone(),
        commit: state.config.commit.clone(),
        env: state.config.environment.as_str(),
    };
    debug!(uptime_seconds = state.uptime_seconds(), "Health check");
    ApiResponse::success(data).into_response()
}

/// GET /api/ping
pub async fn ping() -> Json<PingData> {
    Json(PingData {
        ok: true,
        message: "API routes are working",
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

// ============================================
// Launchpad
// ============================================

/// GET /api/launchpad/ping
pub async fn launchpad_ping(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Response {
    let mode = state.config.launchpad_mode.as_str();
    let meta = LaunchpadMeta { request_id, mode };

    let mut response = if state.config.launchpad_enabled {
        let data = LaunchpadPing {
            ok: true,
            mode,
            ts: chrono::Utc::now().to_rfc3339(),
        };
        (StatusCode::OK, Json(ApiResponse::with_meta(data, meta))).into_response()
    } else {
        let err = AppError::feature_disabled();
        let body = json!({
            "success": false,
            "error": err.code_str(),
            "meta": meta,
        });
        (err.status(), Json(body)).into_response()
    };

    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}

/// OPTIONS /api/launchpad/ping
pub async fn launchpad_options() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}

/// Known route, unsupported method
pub async fn method_not_allowed() -> Response {
    AppError::method_not_allowed().into_response()
}

/// Unknown routes
pub async fn not_found() -> Response {
    let body = json!({ "success": false, "error": "NOT_FOUND" });
    let mut response = (StatusCode::NOT_FOUND, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE_STRICT));
    response
}
