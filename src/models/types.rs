//! Core domain types shared by the proxy, the fallback and the normalizer

use serde::{Deserialize, Serialize};

/// Finding severity, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Attention,
    High,
    Critical,
}

impl Severity {
    /// Map the labels different backends use onto the canonical scale
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ok" | "low" | "info" | "none" | "safe" => Some(Self::Ok),
            "attention" | "medium" | "moderate" | "warning" | "warn" => Some(Self::Attention),
            "high" => Some(Self::High),
            "critical" | "severe" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Letter grade derived from the shield score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::A
        } else if score >= 70.0 {
            Self::B
        } else if score >= 55.0 {
            Self::C
        } else if score >= 40.0 {
            Self::D
        } else {
            Self::E
        }
    }
}

/// Coarse risk label shown next to the grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLabel {
    pub fn from_grade(grade: Option<Grade>) -> Self {
        match grade {
            Some(Grade::A) | Some(Grade::B) => Self::Low,
            Some(Grade::C) => Self::Medium,
            Some(Grade::D) => Self::High,
            Some(Grade::E) => Self::Critical,
            None => Self::Unknown,
        }
    }
}

/// One observation about a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub details: Option<String>,
}

impl Finding {
    pub fn new(id: impl Into<String>, title: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            severity: Some(severity),
            description: None,
            details: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Decoded SPL mint account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintAccountRecord {
    pub mint: String,
    /// Shortened display identifier, not the full public key
    pub mint_authority: Option<String>,
    /// Shortened display identifier, not the full public key
    pub freeze_authority: Option<String>,
    /// Raw supply in base units, decimal string
    pub supply: String,
    pub decimals: u8,
}

/// Entry of `getTokenLargestAccounts`, largest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolderAccount {
    pub address: String,
    /// Raw amount in base units, decimal string
    pub amount: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMeta {
    pub mint: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoritiesSection {
    pub freeze_authority: Option<String>,
    pub mint_authority: Option<String>,
    pub update_authority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquiditySection {
    pub locked: Option<bool>,
    pub amount: Option<f64>,
    pub pool_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldersSection {
    pub top10_concentration: Option<f64>,
    pub total_holders: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxesSection {
    pub buy_tax: Option<f64>,
    pub sell_tax: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyMetadataSection {
    pub decimals: Option<u8>,
    pub supply: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSection {
    pub method: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampsSection {
    /// Unix milliseconds
    pub scanned_at: Option<i64>,
    pub evaluated_at: Option<String>,
}

/// Canonical scan report. `mint` is always set; every other field is
/// serialized as `null` / `[]` when unknown rather than omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub mint: String,
    pub token_meta: Option<TokenMeta>,
    pub shield_score: Option<f64>,
    pub grade: Option<Grade>,
    pub risk_label: RiskLabel,
    pub findings: Vec<Finding>,
    pub authorities: Option<AuthoritiesSection>,
    pub liquidity: Option<LiquiditySection>,
    pub holders: Option<HoldersSection>,
    pub taxes: Option<TaxesSection>,
    pub metadata: Option<SupplyMetadataSection>,
    pub route: Option<RouteSection>,
    pub timestamps: Option<TimestampsSection>,
}

impl ScanReport {
    /// Report with nothing known beyond the mint
    pub fn empty(mint: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            token_meta: None,
            shield_score: None,
            grade: None,
            risk_label: RiskLabel::Unknown,
            findings: Vec::new(),
            authorities: None,
            liquidity: None,
            holders: None,
            taxes: None,
            metadata: None,
            route: None,
            timestamps: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_score(85.0), Grade::A);
        assert_eq!(Grade::from_score(84.9), Grade::B);
        assert_eq!(Grade::from_score(70.0), Grade::B);
        assert_eq!(Grade::from_score(55.0), Grade::C);
        assert_eq!(Grade::from_score(40.0), Grade::D);
        assert_eq!(Grade::from_score(0.0), Grade::E);
    }

    #[test]
    fn test_risk_label_from_grade() {
        assert_eq!(RiskLabel::from_grade(Some(Grade::B)), RiskLabel::Low);
        assert_eq!(RiskLabel::from_grade(Some(Grade::D)), RiskLabel::High);
        assert_eq!(RiskLabel::from_grade(None), RiskLabel::Unknown);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::from_label("MEDIUM"), Some(Severity::Attention));
        assert_eq!(Severity::from_label("low"), Some(Severity::Ok));
        assert_eq!(Severity::from_label("critical"), Some(Severity::Critical));
        assert_eq!(Severity::from_label("whatever"), None);
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn test_empty_report_serializes_nulls() {
        let json = serde_json::to_value(ScanReport::empty("Mint111")).unwrap();
        assert_eq!(json["mint"], "Mint111");
        assert!(json["shieldScore"].is_null());
        assert!(json["grade"].is_null());
        assert_eq!(json["riskLabel"], "Unknown");
        assert_eq!(json["findings"], serde_json::json!([]));
        assert!(json.get("holders").is_some());
        assert!(json["holders"].is_null());
    }
}
