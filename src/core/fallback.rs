//! On-chain fallback
//!
//! Builds a degraded scan report straight from the ledger when the primary
//! backend is absent or unusable. The report never carries a shield score.

use chrono::Utc;
use tracing::{info, warn};

use crate::models::config::GatewayConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    AuthoritiesSection, Finding, HoldersSection, MintAccountRecord, RiskLabel, ScanReport,
    Severity, SupplyMetadataSection, TimestampsSection, TokenHolderAccount,
};
use crate::providers::solana::SolanaRpcClient;
use crate::utils::constants::{CONCENTRATION_ATTENTION_PCT, CONCENTRATION_HIGH_PCT};
use crate::utils::decoder::MintDecoder;

pub struct OnChainFallback<'a> {
    config: &'a GatewayConfig,
}

impl<'a> OnChainFallback<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    /// Best-effort report for `mint`.
    ///
    /// An invalid RPC endpoint, a missing account and undecodable account
    /// data all end in `MINT_ACCOUNT_NOT_FOUND`. A failed holder lookup only
    /// leaves the concentration unknown.
    pub async fn scan(&self, mint: &str) -> AppResult<ScanReport> {
        let client = match SolanaRpcClient::connect(self.config) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "On-chain fallback has no usable RPC endpoint");
                return Err(AppError::mint_not_found());
            }
        };

        let (account, holders) = tokio::join!(
            client.get_mint_account_data(mint),
            client.get_token_largest_accounts(mint),
        );

        let encoded = match account {
            Ok(Some(data)) => data,
            Ok(None) => return Err(AppError::mint_not_found()),
            Err(e) => {
                warn!(error = %e, "getAccountInfo failed");
                return Err(AppError::mint_not_found());
            }
        };

        let record = MintDecoder::decode_base64(mint, &encoded).map_err(|e| {
            warn!(error = %e, "Mint account data could not be decoded");
            AppError::mint_not_found()
        })?;

        let holders = holders.unwrap_or_else(|e| {
            warn!(error = %e, "getTokenLargestAccounts failed");
            Vec::new()
        });

        let report = build_report(&record, &holders, Utc::now().timestamp_millis());
        info!(
            findings = report.findings.len(),
            top10 = ?report.holders.as_ref().and_then(|h| h.top10_concentration),
            "🔗 On-chain fallback report built"
        );
        Ok(report)
    }
}

/// Findings derived from the decoded mint and the concentration
pub fn derive_findings(record: &MintAccountRecord, top10: Option<f64>) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(authority) = &record.mint_authority {
        findings.push(
            Finding::new("mint_authority_present", "Mint authority present", Severity::High)
                .with_description("New supply can still be minted for this token")
                .with_details(format!("authority: {authority}")),
        );
    }

    if let Some(authority) = &record.freeze_authority {
        findings.push(
            Finding::new("freeze_authority_present", "Freeze authority present", Severity::Attention)
                .with_description("Token accounts can be frozen by the authority")
                .with_details(format!("authority: {authority}")),
        );
    }

    if let Some(pct) = top10.filter(|p| *p > CONCENTRATION_ATTENTION_PCT) {
        let severity = if pct > CONCENTRATION_HIGH_PCT {
            Severity::High
        } else {
            Severity::Attention
        };
        findings.push(
            Finding::new("holder_concentration_high", "High holder concentration", severity)
                .with_description("The ten largest accounts hold most of the supply")
                .with_details(format!("top 10 holders: {pct:.2}%")),
        );
    }

    findings
}

/// Assemble the degraded report
pub fn build_report(
    record: &MintAccountRecord,
    holders: &[TokenHolderAccount],
    scanned_at_ms: i64,
) -> ScanReport {
    let top10 = MintDecoder::top10_concentration(holders, &record.supply);

    let mut report = ScanReport::empty(record.mint.clone());
    report.risk_label = RiskLabel::Unknown;
    report.findings = derive_findings(record, top10);
    report.authorities = Some(AuthoritiesSection {
        freeze_authority: record.freeze_authority.clone(),
        mint_authority: record.mint_authority.clone(),
        update_authority: None,
    });
    report.holders = Some(HoldersSection {
        top10_concentration: top10,
        total_holders: None,
    });
    report.metadata = Some(SupplyMetadataSection {
        decimals: Some(record.decimals),
        supply: Some(record.supply.clone()),
        symbol: None,
        name: None,
    });
    report.timestamps = Some(TimestampsSection {
        scanned_at: Some(scanned_at_ms),
        evaluated_at: None,
    });
    report
}
