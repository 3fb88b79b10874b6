//! Scan orchestration
//!
//! Decides, per request, between the backend answer, the on-chain fallback
//! and an error. The decision is a value so handlers and tests can inspect
//! which path won and why.

use tracing::{info, warn};

use crate::core::fallback::OnChainFallback;
use crate::core::proxy::{BackendProxy, BackendTarget, CandidateAttempt, CandidateVerdict, ForwardRequest};
use crate::models::config::GatewayConfig;
use crate::models::errors::{AppError, ErrorCode};
use crate::models::types::ScanReport;
use crate::providers::http::RawResponse;
use crate::utils::constants::SCAN_CANDIDATE_PATHS;

/// Why the fallback produced the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No backend base URL configured
    BackendNotConfigured,
    /// Every backend candidate failed with this code
    BackendUnavailable(ErrorCode),
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendNotConfigured => ErrorCode::ConfigBackendNotConfigured.as_str(),
            Self::BackendUnavailable(code) => code.as_str(),
        }
    }
}

/// Outcome of one scan request
#[derive(Debug)]
pub enum ScanDecision {
    /// JSON answer from the backend, relayed verbatim
    Upstream {
        response: RawResponse,
        attempts: Vec<CandidateAttempt>,
    },
    /// Degraded report built from on-chain data
    Fallback {
        report: ScanReport,
        reason: FallbackReason,
        attempts: Vec<CandidateAttempt>,
    },
    /// Surface this error, no further attempts
    Reject(AppError),
}

impl ScanDecision {
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Reject(err) => Some(err.code),
            _ => None,
        }
    }
}

pub struct ScanService<'a> {
    config: &'a GatewayConfig,
}

impl<'a> ScanService<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    /// Route a scan for `mint`.
    ///
    /// Absent backend falls back (or 501 when the fallback is disabled). An
    /// invalid backend is rejected without touching the fallback. A valid
    /// backend is probed over the candidate paths; a redirect is final, while
    /// HTML, non-JSON, timeout or connection failures hand over to the
    /// fallback.
    pub async fn decide(&self, mint: &str, request: &ForwardRequest) -> ScanDecision {
        let proxy = BackendProxy::new(self.config);

        let base = match proxy.target() {
            BackendTarget::Absent => {
                if !self.config.fallback_enabled {
                    return ScanDecision::Reject(AppError::backend_not_configured());
                }
                return self
                    .fallback(mint, FallbackReason::BackendNotConfigured, Vec::new(), None)
                    .await;
            }
            BackendTarget::Invalid(reason) => {
                warn!(reason = %reason, "Backend URL rejected, failing closed");
                return ScanDecision::Reject(AppError::invalid_backend_url(reason));
            }
            BackendTarget::Valid(base) => base,
        };

        let report = proxy
            .probe_candidates(&base, &SCAN_CANDIDATE_PATHS, request)
            .await;
        let attempts = report.attempts.clone();

        match report.verdict() {
            CandidateVerdict::Winner(response) => ScanDecision::Upstream { response, attempts },
            CandidateVerdict::Blocked(err) => ScanDecision::Reject(err),
            CandidateVerdict::Exhausted(err) => {
                if !self.config.fallback_enabled {
                    return ScanDecision::Reject(err);
                }
                warn!(code = err.code_str(), attempts = attempts.len(), "Backend candidates exhausted");
                let reason = FallbackReason::BackendUnavailable(err.code);
                self.fallback(mint, reason, attempts, Some(err)).await
            }
        }
    }

    /// Run the on-chain fallback; a failure surfaces `upstream_error` if set
    pub async fn fallback(
        &self,
        mint: &str,
        reason: FallbackReason,
        attempts: Vec<CandidateAttempt>,
        upstream_error: Option<AppError>,
    ) -> ScanDecision {
        info!(reason = reason.as_str(), "🔗 Using on-chain fallback");
        match OnChainFallback::new(self.config).scan(mint).await {
            Ok(report) => ScanDecision::Fallback {
                report,
                reason,
                attempts,
            },
            Err(err) => ScanDecision::Reject(upstream_error.unwrap_or(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method};

    fn request() -> ForwardRequest {
        ForwardRequest::new(Method::POST, None, HeaderMap::new(), Bytes::from_static(b"{}"))
    }

    #[tokio::test]
    async fn test_absent_backend_without_fallback_is_501() {
        let mut config = GatewayConfig::default();
        config.fallback_enabled = false;
        let decision = ScanService::new(&config).decide("Mint111", &request()).await;
        assert_eq!(decision.error_code(), Some(ErrorCode::ConfigBackendNotConfigured));
    }

    #[tokio::test]
    async fn test_invalid_backend_fails_closed() {
        let config = GatewayConfig::default().with_backend("http://127.0.0.1:9999");
        let decision = ScanService::new(&config).decide("Mint111", &request()).await;
        assert_eq!(decision.error_code(), Some(ErrorCode::ConfigInvalidBackendUrl));
    }

    #[tokio::test]
    async fn test_invalid_rpc_means_mint_not_found() {
        let config = GatewayConfig::default().with_rpc("https://192.168.0.10");
        let decision = ScanService::new(&config).decide("Mint111", &request()).await;
        assert_eq!(decision.error_code(), Some(ErrorCode::MintAccountNotFound));
    }

    #[test]
    fn test_fallback_reason_strings() {
        assert_eq!(FallbackReason::BackendNotConfigured.as_str(), "CFG_BACKEND_NOT_CONFIGURED");
        assert_eq!(
            FallbackReason::BackendUnavailable(ErrorCode::UpstreamInvalidJson).as_str(),
            "UPSTREAM_INVALID_JSON"
        );
    }
}
