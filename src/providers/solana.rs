//! Solana Provider Module
//!
//! Read-only JSON-RPC 2.0 client used by the on-chain fallback:
//! - `getAccountInfo` (base64 encoding) for the raw mint account
//! - `getTokenLargestAccounts` for the top holder list
//!
//! The endpoint is validated before the client exists, every call carries its
//! own deadline, and a 3xx answer is a failure rather than something to follow.

use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::core::url_guard::{UrlPurpose, UrlValidator};
use crate::models::config::GatewayConfig;
use crate::models::types::TokenHolderAccount;
use crate::providers::http::{build_client, exchange, TransportError};

// ============================================
// ERRORS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("RPC endpoint rejected: {0}")]
    InvalidEndpoint(String),
    #[error("RPC call timed out")]
    Timeout,
    #[error("RPC transport failure: {0}")]
    Transport(String),
    #[error("RPC endpoint answered with redirect {0}")]
    Redirect(u16),
    #[error("RPC endpoint answered with HTTP {0}")]
    Status(u16),
    #[error("RPC response is not a JSON-RPC envelope")]
    InvalidResponse,
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl From<TransportError> for RpcError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => Self::Timeout,
            TransportError::Unreachable(msg) => Self::Transport(msg),
            TransportError::BodyTooLarge(_) => Self::InvalidResponse,
        }
    }
}

// ============================================
// SOLANA RPC TYPES
// ============================================

/// `{ context, value }` wrapper used by most account methods
#[derive(Debug, Clone, Deserialize)]
struct RpcValue<T> {
    value: T,
}

#[derive(Debug, Clone, Deserialize)]
struct AccountInfo {
    data: AccountData,
}

/// Account data: `["<b64>", "base64"]` or a bare string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AccountData {
    Encoded(Vec<String>),
    Raw(String),
}

impl AccountData {
    fn into_base64(self) -> Option<String> {
        match self {
            Self::Encoded(parts) => parts.into_iter().next(),
            Self::Raw(s) => Some(s),
        }
    }
}

/// Entry of `getTokenLargestAccounts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LargestAccount {
    address: String,
    amount: String,
    decimals: u8,
}

// ============================================
// SOLANA RPC CLIENT
// ============================================

/// Solana RPC Client bound to one validated endpoint
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    rpc_url: String,
    timeout: Duration,
}

impl SolanaRpcClient {
    /// Validate the configured endpoint and bind to it
    pub fn connect(config: &GatewayConfig) -> Result<Self, RpcError> {
        let rpc_url = UrlValidator::new(config)
            .validate(&config.rpc_url, UrlPurpose::Rpc)
            .into_result()
            .map_err(RpcError::InvalidEndpoint)?;

        Ok(Self {
            rpc_url,
            timeout: config.rpc_timeout,
        })
    }

    /// Execute JSON-RPC call
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let client = build_client()?;
        let request = client
            .post(&self.rpc_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&payload);

        let response = exchange(request, self.timeout).await?;
        let status = response.status.as_u16();
        debug!(method, status, "Solana RPC call");

        if response.status.is_redirection() {
            return Err(RpcError::Redirect(status));
        }
        if !response.status.is_success() {
            return Err(RpcError::Status(status));
        }

        let json: Value =
            serde_json::from_slice(&response.body).map_err(|_| RpcError::InvalidResponse)?;

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Rpc(error.to_string()));
        }

        let result = json.get("result").ok_or(RpcError::InvalidResponse)?;

        serde_json::from_value(result.clone()).map_err(|_| RpcError::InvalidResponse)
    }

    /// Raw mint account data as base64, `None` if the account does not exist
    pub async fn get_mint_account_data(&self, mint: &str) -> Result<Option<String>, RpcError> {
        let params = json!([mint, { "encoding": "base64" }]);
        let result: RpcValue<Option<AccountInfo>> = self.call("getAccountInfo", params).await?;
        Ok(result.value.and_then(|info| info.data.into_base64()))
    }

    /// Largest token accounts for `mint`, largest first
    pub async fn get_token_largest_accounts(
        &self,
        mint: &str,
    ) -> Result<Vec<TokenHolderAccount>, RpcError> {
        let params = json!([mint]);
        let result: RpcValue<Vec<LargestAccount>> =
            self.call("getTokenLargestAccounts", params).await?;

        Ok(result
            .value
            .into_iter()
            .map(|a| TokenHolderAccount {
                address: a.address,
                amount: a.amount,
                decimals: a.decimals,
            })
            .collect())
    }
}
