//! Endpoint URL validation (SSRF guard)
//!
//! Every outbound call whose target comes from configuration goes through
//! [`UrlValidator::validate`] first. A rejected URL is never dialed.
//!
//! Rules are applied in order and the first failure wins:
//! 1. empty input
//! 2. normalization (trailing `/` and a trailing `/api` are stripped)
//! 3. absolute URL parse
//! 4. embedded credentials
//! 5. scheme (per purpose and environment)
//! 6. hostname deny-list (localhost, loopback literals, metadata hosts)
//! 7. private / reserved IPv4 ranges
//! 8. loopback / link-local / unique-local IPv6
//!
//! Hostnames are checked as written. A public name that later resolves to a
//! private address is not caught here.

use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::warn;
use url::{Host, Url};

use crate::models::config::GatewayConfig;
use crate::utils::constants::METADATA_HOSTNAMES;

/// What the URL will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPurpose {
    /// Primary scan backend (http or https)
    Backend,
    /// Solana JSON-RPC endpoint (https, http only outside production)
    Rpc,
}

/// Outcome of validating one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Canonical URL to dial, only present when `valid`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
}

impl ValidationResult {
    fn ok(normalized: String) -> Self {
        Self {
            valid: true,
            error: None,
            normalized: Some(normalized),
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            valid: false,
            error: Some(reason.to_string()),
            normalized: None,
        }
    }

    /// The URL to dial, or the rejection reason
    pub fn into_result(self) -> Result<String, String> {
        match (self.valid, self.normalized) {
            (true, Some(url)) => Ok(url),
            _ => Err(self.error.unwrap_or_else(|| "Invalid URL".to_string())),
        }
    }
}

/// Validator bound to one deployment mode
#[derive(Debug, Clone, Copy)]
pub struct UrlValidator {
    production: bool,
    allow_http_rpc_in_dev: bool,
    allow_loopback: bool,
}

impl UrlValidator {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            production: config.is_production(),
            allow_http_rpc_in_dev: config.allow_http_rpc_in_dev,
            allow_loopback: config.allow_loopback,
        }
    }

    /// Classify `raw` as safe or unsafe to contact
    pub fn validate(&self, raw: &str, purpose: UrlPurpose) -> ValidationResult {
        let result = self.validate_inner(raw, purpose);
        if let Some(reason) = &result.error {
            warn!(purpose = ?purpose, reason = %reason, "🛡️ Endpoint URL rejected");
        }
        result
    }

    fn validate_inner(&self, raw: &str, purpose: UrlPurpose) -> ValidationResult {
        let input = raw.trim();
        if input.is_empty() {
            return ValidationResult::reject("URL is required");
        }

        let mut normalized = input.trim_end_matches('/');
        if let Some(stripped) = normalized.strip_suffix("/api") {
            normalized = stripped;
        }

        let url = match Url::parse(normalized) {
            Ok(url) => url,
            Err(_) => return ValidationResult::reject("Invalid URL format"),
        };

        if !url.username().is_empty() || url.password().is_some() {
            return ValidationResult::reject("URL with userinfo not allowed");
        }

        if let Err(reason) = self.check_scheme(url.scheme(), purpose) {
            return ValidationResult::reject(reason);
        }

        if let Err(reason) = self.check_host(url.host()) {
            return ValidationResult::reject(reason);
        }

        ValidationResult::ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn check_scheme(&self, scheme: &str, purpose: UrlPurpose) -> Result<(), &'static str> {
        match purpose {
            UrlPurpose::Rpc => {
                let http_ok = !self.production && self.allow_http_rpc_in_dev;
                if scheme == "https" || (http_ok && scheme == "http") {
                    Ok(())
                } else {
                    Err("RPC URL must be HTTPS (or HTTP in dev)")
                }
            }
            UrlPurpose::Backend => {
                if scheme == "http" || scheme == "https" {
                    Ok(())
                } else {
                    Err("Only http and https protocols are allowed")
                }
            }
        }
    }

    fn check_host(&self, host: Option<Host<&str>>) -> Result<(), &'static str> {
        match host {
            None => Err("Invalid hostname"),
            Some(Host::Domain(domain)) => check_domain(domain),
            Some(Host::Ipv4(ip)) => self.check_ipv4(ip),
            Some(Host::Ipv6(ip)) => self.check_ipv6(ip),
        }
    }

    fn check_ipv4(&self, ip: Ipv4Addr) -> Result<(), &'static str> {
        if self.allow_loopback && ip.is_loopback() {
            return Ok(());
        }
        if ip.is_unspecified() || ip == Ipv4Addr::LOCALHOST {
            return Err("Internal IP not allowed");
        }
        if is_private_ipv4(ip) {
            return Err("Private IPv4 range not allowed");
        }
        Ok(())
    }

    fn check_ipv6(&self, ip: Ipv6Addr) -> Result<(), &'static str> {
        if let Some(mapped) = ip.to_ipv4_mapped() {
            return self.check_ipv4(mapped);
        }
        if ip.is_loopback() || ip.is_unspecified() {
            return Err("Internal IP not allowed");
        }
        if is_private_ipv6(ip) {
            return Err("Private IPv6 range not allowed");
        }
        Ok(())
    }

    /// Whether a browser `Origin` may be echoed on a CORS response
    pub fn origin_allowed(&self, origin: &str) -> bool {
        let url = match Url::parse(origin.trim()) {
            Ok(url) => url,
            Err(_) => return false,
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        if !self.production {
            return url.host().is_some();
        }
        let strict = Self {
            allow_loopback: false,
            ..*self
        };
        strict.check_host(url.host()).is_ok()
    }
}

fn check_domain(domain: &str) -> Result<(), &'static str> {
    let host = domain.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return Err("Invalid hostname");
    }
    if host == "localhost" || host.ends_with(".localhost") {
        return Err("Localhost not allowed");
    }
    if METADATA_HOSTNAMES.contains(&host.as_str()) {
        return Err("Metadata endpoint not allowed");
    }
    Ok(())
}

/// Private, loopback, link-local and carrier-grade NAT ranges
pub fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 0                                  // 0.0.0.0/8
        || a == 10                          // 10.0.0.0/8
        || a == 127                         // 127.0.0.0/8
        || (a == 169 && b == 254)           // 169.254.0.0/16
        || (a == 172 && (16..=31).contains(&b)) // 172.16.0.0/12
        || (a == 192 && b == 168)           // 192.168.0.0/16
        || (a == 100 && (64..=127).contains(&b)) // 100.64.0.0/10
}

/// Loopback, link-local (fe80::/10) and unique-local (fc00::/7)
pub fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback() || (first & 0xffc0) == 0xfe80 || (first & 0xfe00) == 0xfc00
}
