//! Shield Gateway Library
//!
//! Request-forwarding gateway in front of a token-risk scoring backend:
//! - SSRF-hardened validation of every configured endpoint
//! - Backend forwarding with header allow-lists, timeouts and redirect blocking
//! - Candidate-path probing with HTML / non-JSON detection
//! - On-chain Solana fallback (mint account decoding, holder concentration)
//! - Normalization of backend payloads into one report shape

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    normalize_scan_response, BackendProxy, OnChainFallback, ScanDecision, ScanService, UrlPurpose,
    UrlValidator, ValidationResult,
};
pub use models::{AppError, AppResult, ErrorCode, GatewayConfig, ScanReport};
pub use providers::SolanaRpcClient;
pub use utils::MintDecoder;
