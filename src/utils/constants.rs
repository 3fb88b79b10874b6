//! Gateway Constants
//!
//! Single source of truth for defaults, limits and header allow-lists.
//! No literal of this kind should live outside this module.

// ============================================
// ENDPOINT DEFAULTS
// ============================================

/// Public mainnet RPC used when `SOLANA_RPC_URL` is unset
pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Backend candidate paths for a scan, in preference order
pub const SCAN_CANDIDATE_PATHS: [&str; 2] = ["/api/scan", "/scan"];

/// Backend path for the apply form
pub const APPLY_BACKEND_PATH: &str = "/api/apply";

/// Hostnames of cloud metadata services
pub const METADATA_HOSTNAMES: [&str; 3] = [
    "metadata.google.internal",
    "metadata.goog",
    "metadata",
];

// ============================================
// TIMEOUTS & LIMITS
// ============================================

/// Default backend proxy timeout in milliseconds
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 20_000;

/// Default RPC timeout in milliseconds
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 10_000;

/// Lower bound for any outbound timeout
pub const MIN_TIMEOUT_MS: u64 = 1_000;

/// Largest inbound scan body accepted (inclusive)
pub const MAX_SCAN_BODY_BYTES: usize = 8 * 1024;

/// Largest body relayed on generic forwarding routes
pub const MAX_FORWARD_BODY_BYTES: usize = 1024 * 1024;

/// Largest upstream body buffered from the backend or the RPC
pub const MAX_UPSTREAM_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Holders counted in the concentration metric
pub const TOP_HOLDER_COUNT: usize = 10;

/// Concentration above which a finding is raised
pub const CONCENTRATION_ATTENTION_PCT: f64 = 50.0;

/// Concentration above which the finding is high severity
pub const CONCENTRATION_HIGH_PCT: f64 = 80.0;

// ============================================
// HEADERS
// ============================================

/// Cache directive forced on forwarded traffic
pub const NO_STORE: &str = "no-store";

/// Cache directive for responses generated locally
pub const NO_STORE_STRICT: &str = "no-store, no-cache, must-revalidate";

/// Inbound headers copied to the backend request
pub const FORWARD_REQUEST_HEADERS: [&str; 7] = [
    "accept",
    "content-type",
    "authorization",
    "x-request-id",
    "x-correlation-id",
    "x-api-key",
    "accept-language",
];

/// Upstream response headers relayed to the caller
pub const FORWARD_RESPONSE_HEADERS: [&str; 3] = ["content-type", "x-request-id", "retry-after"];

/// Prefix of relayed rate-limit headers
pub const RATE_LIMIT_HEADER_PREFIX: &str = "x-ratelimit-";

/// Connection-scoped headers never relayed in either direction
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Methods advertised on preflight responses
pub const CORS_ALLOW_METHODS: &str = "GET,POST,OPTIONS";

/// Headers advertised on preflight responses
pub const CORS_ALLOW_HEADERS: &str = "content-type, authorization, x-request-id, x-api-key";

/// Request id header name
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id header name
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// User agent on outbound calls
pub const USER_AGENT: &str = concat!("shield-gateway/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lists_are_lowercase() {
        for h in FORWARD_REQUEST_HEADERS
            .iter()
            .chain(FORWARD_RESPONSE_HEADERS.iter())
            .chain(HOP_BY_HOP_HEADERS.iter())
        {
            assert_eq!(*h, h.to_ascii_lowercase());
        }
    }

    #[test]
    fn test_no_overlap_between_allow_and_hop_lists() {
        for h in FORWARD_RESPONSE_HEADERS {
            assert!(!HOP_BY_HOP_HEADERS.contains(&h));
        }
    }
}
