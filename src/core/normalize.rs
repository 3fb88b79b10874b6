//! Response normalizer
//!
//! Reshapes the payloads different backend versions produce (and the
//! fallback report) into one [`ScanReport`]. Total: unknown shapes degrade
//! to an empty report, never to an error.

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::models::types::{
    AuthoritiesSection, Finding, Grade, HoldersSection, LiquiditySection, RiskLabel, RouteSection,
    ScanReport, Severity, SupplyMetadataSection, TaxesSection, TimestampsSection, TokenMeta,
};

type Object = Map<String, Value>;

/// Normalize a backend scan payload for `mint`
pub fn normalize_scan_response(raw: &Value, mint: &str) -> ScanReport {
    let Some(obj) = unwrap_envelope(raw) else {
        return ScanReport::empty(mint);
    };

    let shield_score = pick(obj, &["shieldScore", "score", "securityScore", "riskScore"]).and_then(number);
    let grade = shield_score.map(Grade::from_score);

    ScanReport {
        mint: mint.to_string(),
        token_meta: token_meta(obj),
        shield_score,
        grade,
        risk_label: RiskLabel::from_grade(grade),
        findings: findings(obj),
        authorities: authorities(obj),
        liquidity: liquidity(obj),
        holders: holders(obj),
        taxes: taxes(obj),
        metadata: metadata(obj),
        route: route(obj),
        timestamps: timestamps(obj),
    }
}

/// `{ success, response: {...} }` and `{ data: {...} }` wrap the report
fn unwrap_envelope(raw: &Value) -> Option<&Object> {
    let obj = raw.as_object()?;
    for key in ["response", "data"] {
        if let Some(inner) = obj.get(key).and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(obj)
}

/// First non-null value among `keys`
fn pick<'v>(obj: &'v Object, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn section<'v>(obj: &'v Object, keys: &[&str]) -> Option<&'v Object> {
    pick(obj, keys).and_then(Value::as_object)
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_of(obj: &Object, keys: &[&str]) -> Option<String> {
    pick(obj, keys).and_then(text)
}

fn number_of(obj: &Object, keys: &[&str]) -> Option<f64> {
    pick(obj, keys).and_then(number)
}

/// Authority fields may be an address or a `has*` flag
fn authority(v: &Value) -> Option<String> {
    match v {
        Value::Bool(true) => Some("present".to_string()),
        Value::Bool(false) => None,
        other => text(other),
    }
}

fn token_meta(obj: &Object) -> Option<TokenMeta> {
    let mint = text_of(obj, &["mint", "tokenMint"])?;
    Some(TokenMeta {
        mint,
        symbol: text_of(obj, &["symbol", "tokenSymbol"]),
        name: text_of(obj, &["name", "tokenName"]),
        image_url: text_of(obj, &["imageUrl", "logoURI", "image"]),
    })
}

fn findings(obj: &Object) -> Vec<Finding> {
    let Some(list) = pick(obj, &["findings", "risks", "issues", "warnings"]).and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let f = item.as_object()?;
            let id = text_of(f, &["id", "name"]);
            let title = text_of(f, &["title", "name", "label"]);
            if id.is_none() && title.is_none() {
                return None;
            }
            Some(Finding {
                id: id.unwrap_or_else(|| format!("finding-{idx}")),
                title: title.unwrap_or_else(|| "Finding".to_string()),
                severity: pick(f, &["severity", "level", "risk"])
                    .and_then(Value::as_str)
                    .and_then(Severity::from_label),
                description: text_of(f, &["description", "desc", "message"]),
                details: text_of(f, &["details", "info", "note"]),
            })
        })
        .collect()
}

fn authorities(obj: &Object) -> Option<AuthoritiesSection> {
    let a = section(obj, &["authorities", "authority", "permissions"])?;
    let out = AuthoritiesSection {
        freeze_authority: pick(a, &["freezeAuthority", "freeze", "hasFreezeAuthority"]).and_then(authority),
        mint_authority: pick(a, &["mintAuthority", "mint", "hasMintAuthority"]).and_then(authority),
        update_authority: pick(a, &["updateAuthority", "update", "hasUpdateAuthority"]).and_then(authority),
    };
    (out != AuthoritiesSection::default()).then_some(out)
}

fn liquidity(obj: &Object) -> Option<LiquiditySection> {
    let l = section(obj, &["liquidity", "liquidityInfo"])?;
    let out = LiquiditySection {
        locked: pick(l, &["locked", "isLocked"]).and_then(Value::as_bool),
        amount: number_of(l, &["amount", "value"]),
        pool_address: text_of(l, &["poolAddress", "pool", "address"]),
    };
    (out != LiquiditySection::default()).then_some(out)
}

fn holders(obj: &Object) -> Option<HoldersSection> {
    let h = section(obj, &["holders", "holderInfo", "distribution"])?;
    let out = HoldersSection {
        top10_concentration: number_of(h, &["top10Concentration", "concentration", "top10"]),
        total_holders: number_of(h, &["totalHolders", "count", "total"])
            .filter(|n| *n >= 0.0)
            .map(|n| n as u64),
    };
    (out != HoldersSection::default()).then_some(out)
}

fn taxes(obj: &Object) -> Option<TaxesSection> {
    let t = section(obj, &["taxes", "fees", "tokenTaxes"])?;
    let out = TaxesSection {
        buy_tax: number_of(t, &["buyTax", "buy", "buyFee"]),
        sell_tax: number_of(t, &["sellTax", "sell", "sellFee"]),
    };
    (out != TaxesSection::default()).then_some(out)
}

fn metadata(obj: &Object) -> Option<SupplyMetadataSection> {
    let empty = Object::new();
    let m = section(obj, &["metadata", "tokenMetadata", "tokenInfo"]).unwrap_or(&empty);
    let out = SupplyMetadataSection {
        decimals: number_of(m, &["decimals"])
            .filter(|d| (0.0..=255.0).contains(d))
            .map(|d| d as u8),
        supply: text_of(m, &["supply", "totalSupply", "maxSupply"]),
        symbol: text_of(m, &["symbol"]).or_else(|| text_of(obj, &["symbol"])),
        name: text_of(m, &["name"]).or_else(|| text_of(obj, &["name"])),
    };
    (out != SupplyMetadataSection::default()).then_some(out)
}

fn route(obj: &Object) -> Option<RouteSection> {
    let r = section(obj, &["route", "transactionRoute"])?;
    let out = RouteSection {
        method: text_of(r, &["method"]),
        path: text_of(r, &["path", "endpoint"]),
    };
    (out != RouteSection::default()).then_some(out)
}

fn timestamps(obj: &Object) -> Option<TimestampsSection> {
    let scanned_at = obj.get("scannedAt").and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.timestamp_millis()),
        _ => None,
    });
    let out = TimestampsSection {
        scanned_at,
        evaluated_at: text_of(obj, &["evaluatedAt", "evaluated_at", "timestamp"]),
    };
    (out != TimestampsSection::default()).then_some(out)
}
