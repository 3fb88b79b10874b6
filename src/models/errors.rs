//! Centralized Error Handling Module
//!
//! Every failure the gateway can surface carries a unique error code.
//! The code is what callers see in the `error` field of the JSON envelope;
//! the message is only echoed back when it is known to be safe.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - CFG_xxx: configuration errors (backend URL)
//! - UPSTREAM_xxx: transport and content errors from the backend
//! - API_xxx: local input errors
//! - MINT_xxx: on-chain fallback errors

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::utils::constants::NO_STORE_STRICT;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Whether `message` may be returned to the caller verbatim
    pub expose_message: bool,
}

impl AppError {
    /// Create a new AppError (message stays internal)
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            expose_message: false,
        }
    }

    /// Create an AppError whose message is safe to show the caller
    pub fn safe(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            expose_message: true,
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Configuration Errors
    // ============================================
    /// No backend base URL configured and fallback disabled
    ConfigBackendNotConfigured,
    /// Backend base URL present but rejected by the validator
    ConfigInvalidBackendUrl,

    // ============================================
    // Upstream Errors
    // ============================================
    /// Upstream did not answer before the deadline
    UpstreamTimeout,
    /// Connection / transport failure
    UpstreamUnreachable,
    /// Upstream answered with a 3xx
    UpstreamRedirectBlocked,
    /// Upstream answered with HTML or another non-JSON body
    UpstreamInvalidJson,

    // ============================================
    // API Errors
    // ============================================
    /// Body was not JSON and no mint could be recovered
    ApiInvalidJson,
    /// Mint missing or not a base58 address
    ApiInvalidMint,
    /// Body larger than the accepted ceiling
    ApiPayloadTooLarge,
    /// Malformed query string
    ApiBadRequest,
    /// Route exists but not for this method
    ApiMethodNotAllowed,
    /// Feature flag is off
    ApiFeatureDisabled,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // On-chain Fallback Errors
    // ============================================
    /// Mint account missing, undecodable or unreachable over RPC
    MintAccountNotFound,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigBackendNotConfigured => "CFG_BACKEND_NOT_CONFIGURED",
            Self::ConfigInvalidBackendUrl => "CFG_INVALID_BACKEND_URL",

            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::UpstreamUnreachable => "UPSTREAM_UNREACHABLE",
            Self::UpstreamRedirectBlocked => "UPSTREAM_REDIRECT_BLOCKED",
            Self::UpstreamInvalidJson => "UPSTREAM_INVALID_JSON",

            Self::ApiInvalidJson => "API_INVALID_JSON",
            Self::ApiInvalidMint => "API_INVALID_MINT",
            Self::ApiPayloadTooLarge => "API_PAYLOAD_TOO_LARGE",
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiMethodNotAllowed => "API_METHOD_NOT_ALLOWED",
            Self::ApiFeatureDisabled => "FEATURE_DISABLED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::MintAccountNotFound => "MINT_ACCOUNT_NOT_FOUND",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiInvalidJson
            | Self::ApiInvalidMint
            | Self::ApiBadRequest
            | Self::ConfigInvalidBackendUrl => 400,
            Self::ApiMethodNotAllowed => 405,
            Self::ApiPayloadTooLarge => 413,
            Self::ConfigBackendNotConfigured => 501,
            Self::ApiFeatureDisabled => 503,
            Self::UpstreamTimeout
            | Self::UpstreamUnreachable
            | Self::UpstreamRedirectBlocked
            | Self::UpstreamInvalidJson
            | Self::MintAccountNotFound => 502,
            Self::ApiInternalError => 500,
        }
    }

    /// Whether the failure allows the on-chain fallback to take over
    pub fn permits_fallback(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout | Self::UpstreamUnreachable | Self::UpstreamInvalidJson
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn backend_not_configured() -> Self {
        Self::new(ErrorCode::ConfigBackendNotConfigured, "backend base URL not configured")
    }

    /// Validator messages are fixed strings, safe to echo
    pub fn invalid_backend_url(reason: impl Into<String>) -> Self {
        Self::safe(ErrorCode::ConfigInvalidBackendUrl, reason)
    }

    pub fn upstream_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamTimeout, msg)
    }

    pub fn upstream_unreachable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamUnreachable, msg)
    }

    pub fn redirect_blocked(status: u16) -> Self {
        Self::safe(
            ErrorCode::UpstreamRedirectBlocked,
            format!("upstream attempted a redirect (HTTP {status}); redirects are not followed"),
        )
    }

    pub fn upstream_invalid_json(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamInvalidJson, msg)
    }

    pub fn invalid_json() -> Self {
        Self::safe(ErrorCode::ApiInvalidJson, "request body is not valid JSON")
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::safe(
            ErrorCode::ApiPayloadTooLarge,
            format!("request body exceeds {limit} bytes"),
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::safe(ErrorCode::ApiBadRequest, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::safe(ErrorCode::ApiMethodNotAllowed, "method not allowed on this route")
    }

    pub fn feature_disabled() -> Self {
        Self::new(ErrorCode::ApiFeatureDisabled, "feature disabled")
    }

    pub fn mint_not_found() -> Self {
        Self::safe(ErrorCode::MintAccountNotFound, "mint account not found")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code_str(), error = %self, "request failed");
        }

        let mut body = json!({
            "success": false,
            "error": self.code.as_str(),
        });
        if self.expose_message {
            body["detail"] = json!(self.message);
        }

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE_STRICT));
        response
    }
}
