//! Gateway configuration
//!
//! Built once at the process boundary and handed to the core by reference.
//! Nothing under `core/` reads the environment itself.

use std::time::Duration;
use tracing::info;

use crate::utils::constants::{
    DEFAULT_BACKEND_TIMEOUT_MS, DEFAULT_RPC_TIMEOUT_MS, DEFAULT_SOLANA_RPC_URL, MIN_TIMEOUT_MS,
};

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "production" || s == "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Launchpad ping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchpadMode {
    Stub,
    Real,
}

impl LaunchpadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Real => "real",
        }
    }
}

/// Runtime configuration for the gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Primary backend base URL, untrusted until validated
    pub backend_base: Option<String>,
    /// Solana RPC endpoint, untrusted until validated
    pub rpc_url: String,
    pub environment: Environment,
    /// Accept `http` RPC endpoints outside production
    pub allow_http_rpc_in_dev: bool,
    /// Permit the on-chain fallback when no backend is configured or it fails
    pub fallback_enabled: bool,
    pub backend_timeout: Duration,
    pub rpc_timeout: Duration,
    pub launchpad_enabled: bool,
    pub launchpad_mode: LaunchpadMode,
    pub deployment_id: Option<String>,
    pub commit: Option<String>,
    pub host: String,
    pub port: u16,
    /// Accept literal 127.0.0.0/8 targets. Never set from the environment.
    pub allow_loopback: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend_base: None,
            rpc_url: DEFAULT_SOLANA_RPC_URL.to_string(),
            environment: Environment::Development,
            allow_http_rpc_in_dev: true,
            fallback_enabled: true,
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            launchpad_enabled: false,
            launchpad_mode: LaunchpadMode::Stub,
            deployment_id: None,
            commit: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
            allow_loopback: false,
        }
    }
}

impl GatewayConfig {
    /// Load from process environment
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        info!(
            environment = config.environment.as_str(),
            backend_configured = config.backend_base.is_some(),
            fallback_enabled = config.fallback_enabled,
            "🔧 Gateway configuration loaded"
        );
        config
    }

    /// Load from an arbitrary key lookup (tests inject maps here)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| match get(key).map(|v| v.to_ascii_lowercase()) {
            Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
            None => default,
        };
        let millis = |key: &str, default: u64| {
            let ms = get(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(default);
            Duration::from_millis(ms.max(MIN_TIMEOUT_MS))
        };

        let defaults = Self::default();

        Self {
            backend_base: get("BAGS_SHIELD_API_BASE").or_else(|| get("SHIELD_API_BASE")),
            rpc_url: get("SOLANA_RPC_URL").unwrap_or(defaults.rpc_url),
            environment: Environment::parse(
                get("APP_ENV").or_else(|| get("NODE_ENV")).as_deref(),
            ),
            allow_http_rpc_in_dev: flag("ALLOW_HTTP_RPC_IN_DEV", defaults.allow_http_rpc_in_dev),
            fallback_enabled: flag("ONCHAIN_FALLBACK_ENABLED", defaults.fallback_enabled),
            backend_timeout: millis("BACKEND_TIMEOUT_MS", DEFAULT_BACKEND_TIMEOUT_MS),
            rpc_timeout: millis("RPC_TIMEOUT_MS", DEFAULT_RPC_TIMEOUT_MS),
            launchpad_enabled: flag("LAUNCHPAD_ENABLED", false),
            launchpad_mode: match get("LAUNCHPAD_MODE").map(|v| v.to_ascii_lowercase()) {
                Some(m) if m == "real" => LaunchpadMode::Real,
                _ => LaunchpadMode::Stub,
            },
            deployment_id: get("DEPLOYMENT_ID"),
            commit: get("GIT_COMMIT_SHA"),
            host: get("SHIELD_HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .or_else(|| get("SHIELD_PORT"))
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            allow_loopback: false,
        }
    }

    pub fn with_backend(mut self, base: impl Into<String>) -> Self {
        self.backend_base = Some(base.into());
        self
    }

    pub fn with_rpc(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Lets tests point the gateway at local mock servers
    pub fn allow_loopback_for_tests(mut self) -> Self {
        self.allow_loopback = true;
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}
