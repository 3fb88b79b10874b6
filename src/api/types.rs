//! API Request/Response Types

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::errors::{AppError, ErrorCode};
use crate::utils::constants::NO_STORE_STRICT;

/// Success envelope: `{ success: true, response, meta? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize, M: Serialize = ()> {
    pub success: bool,
    pub response: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<M>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(response: T) -> Self {
        Self {
            success: true,
            response,
            meta: None,
        }
    }
}

impl<T: Serialize, M: Serialize> ApiResponse<T, M> {
    pub fn with_meta(response: T, meta: M) -> Self {
        Self {
            success: true,
            response,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize, M: Serialize> IntoResponse for ApiResponse<T, M> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(self)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE_STRICT));
        response
    }
}

// ============================================
// Scan
// ============================================

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub mint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub mint: Option<String>,
    /// `1` / `true` asks for the canonical report instead of the raw payload
    pub normalize: Option<String>,
}

impl ScanQuery {
    pub fn wants_normalized(&self) -> bool {
        matches!(
            self.normalize.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("yes")
        )
    }
}

/// `meta` of a scan answered by the gateway itself
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMeta {
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// One problem with the submitted mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintIssue {
    pub field: &'static str,
    pub message: &'static str,
}

impl MintIssue {
    fn mint(message: &'static str) -> Self {
        Self {
            field: "mint",
            message,
        }
    }
}

/// 400 with the structured issue list
#[derive(Debug)]
pub struct InvalidMint(pub Vec<MintIssue>);

impl IntoResponse for InvalidMint {
    fn into_response(self) -> Response {
        let code = ErrorCode::ApiInvalidMint;
        let body = serde_json::json!({
            "success": false,
            "error": code.as_str(),
            "issues": self.0,
        });
        let mut response = (StatusCode::BAD_REQUEST, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE_STRICT));
        response
    }
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const MINT_MIN_LEN: usize = 32;
const MINT_MAX_LEN: usize = 44;

/// Trimmed mint if it is a base58 address of 32 to 44 characters
pub fn validate_mint(raw: Option<&str>) -> Result<String, InvalidMint> {
    let mint = raw.map(str::trim).unwrap_or("");
    if mint.is_empty() {
        return Err(InvalidMint(vec![MintIssue::mint("mint is required")]));
    }

    let mut issues = Vec::new();
    if !(MINT_MIN_LEN..=MINT_MAX_LEN).contains(&mint.len()) {
        issues.push(MintIssue::mint("mint must be 32 to 44 characters"));
    }
    if !mint.chars().all(|c| BASE58_ALPHABET.contains(c)) {
        issues.push(MintIssue::mint("mint must be base58"));
    }

    if issues.is_empty() {
        Ok(mint.to_string())
    } else {
        Err(InvalidMint(issues))
    }
}

/// Pull `mint` out of a scan body.
///
/// Well-formed JSON is read normally. Otherwise the raw text is searched for
/// a `"mint": "..."` pair; if none is found the body is rejected as invalid
/// JSON. `Ok(None)` means the body parsed but carried no mint.
pub fn extract_mint(body: &[u8]) -> Result<Option<String>, AppError> {
    if let Ok(req) = serde_json::from_slice::<ScanRequest>(body) {
        return Ok(req.mint);
    }
    if serde_json::from_slice::<serde_json::Value>(body).is_ok() {
        // Valid JSON of another shape, e.g. `"mint": 5`
        return Ok(None);
    }
    scan_raw_mint(&String::from_utf8_lossy(body))
        .map(Some)
        .ok_or_else(AppError::invalid_json)
}

fn scan_raw_mint(text: &str) -> Option<String> {
    const KEY: &str = "\"mint\"";
    let mut rest = text;
    while let Some(pos) = rest.find(KEY) {
        rest = &rest[pos + KEY.len()..];
        let Some(after_colon) = rest.trim_start().strip_prefix(':') else {
            continue;
        };
        let Some(value) = after_colon.trim_start().strip_prefix('"') else {
            continue;
        };
        if let Some(end) = value.find('"') {
            return Some(value[..end].to_string());
        }
    }
    None
}

// ============================================
// Health & Ping
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub ok: bool,
    pub ts: String,
    pub deployment_id: Option<String>,
    pub commit: Option<String>,
    pub env: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PingData {
    pub ok: bool,
    pub message: &'static str,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct LaunchpadPing {
    pub ok: bool,
    pub mode: &'static str,
    pub ts: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchpadMeta {
    pub request_id: String,
    pub mode: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn test_validate_mint() {
        assert_eq!(validate_mint(Some(format!("  {MINT} ").as_str())).unwrap(), MINT);

        let missing = validate_mint(None).unwrap_err();
        assert_eq!(missing.0, vec![MintIssue::mint("mint is required")]);

        let short = validate_mint(Some("abc")).unwrap_err();
        assert_eq!(short.0.len(), 1);

        // 0, O, I and l are outside the alphabet
        let bad = validate_mint(Some("0OIl111111111111111111111111111111")).unwrap_err();
        assert_eq!(bad.0, vec![MintIssue::mint("mint must be base58")]);
    }

    #[test]
    fn test_extract_mint_json() {
        let body = format!(r#"{{"mint":"{MINT}","extra":1}}"#);
        assert_eq!(extract_mint(body.as_bytes()).unwrap().as_deref(), Some(MINT));
        assert_eq!(extract_mint(b"{}").unwrap(), None);
        assert_eq!(extract_mint(br#"{"mint":5}"#).unwrap(), None);
    }

    #[test]
    fn test_extract_mint_tolerant() {
        let body = format!(r#"{{"mint" : "{MINT}", trailing garbage"#);
        assert_eq!(extract_mint(body.as_bytes()).unwrap().as_deref(), Some(MINT));

        let err = extract_mint(b"mint=abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiInvalidJson);
    }

    #[test]
    fn test_scan_query_flag() {
        let q = ScanQuery {
            mint: None,
            normalize: Some("1".to_string()),
        };
        assert!(q.wants_normalized());
        let q = ScanQuery {
            mint: None,
            normalize: None,
        };
        assert!(!q.wants_normalized());
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::with_meta(
            1,
            ScanMeta {
                source: "onchain",
                reason: Some("CFG_BACKEND_NOT_CONFIGURED"),
            },
        ))
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["response"], 1);
        assert_eq!(json["meta"]["source"], "onchain");

        let plain = serde_json::to_value(ApiResponse::success("x")).unwrap();
        assert!(plain.get("meta").is_none());
    }
}
