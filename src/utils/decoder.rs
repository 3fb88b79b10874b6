//! Mint account decoder
//! Parses the fixed 82-byte SPL mint layout and computes holder concentration

use alloy_primitives::U256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

use crate::models::types::{MintAccountRecord, TokenHolderAccount};
use crate::utils::constants::TOP_HOLDER_COUNT;

/// Size of a mint account
pub const MINT_ACCOUNT_LEN: usize = 82;

// Field offsets
const MINT_AUTHORITY_TAG: usize = 0;
const MINT_AUTHORITY_KEY: usize = 1;
const SUPPLY: usize = 33;
const DECIMALS: usize = 41;
const FREEZE_AUTHORITY_TAG: usize = 43;
const FREEZE_AUTHORITY_KEY: usize = 44;
const KEY_LEN: usize = 32;

/// Length of the display identifier derived from an authority key
const AUTHORITY_ID_LEN: usize = 12;

/// Malformed mint account input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("account data is {len} bytes, expected at least {MINT_ACCOUNT_LEN}")]
    TooShort { len: usize },
    #[error("account data is not valid base64")]
    InvalidBase64,
}

/// Decoder for SPL mint accounts
pub struct MintDecoder;

impl MintDecoder {
    /// Decode raw account bytes. Trailing bytes beyond the layout are ignored.
    pub fn decode(mint: &str, data: &[u8]) -> Result<MintAccountRecord, DecodeError> {
        if data.len() < MINT_ACCOUNT_LEN {
            return Err(DecodeError::TooShort { len: data.len() });
        }

        let mut supply_bytes = [0u8; 8];
        supply_bytes.copy_from_slice(&data[SUPPLY..SUPPLY + 8]);
        // u64 covers the full 8-byte range, no precision loss
        let supply = u64::from_le_bytes(supply_bytes);

        Ok(MintAccountRecord {
            mint: mint.to_string(),
            mint_authority: Self::authority(data, MINT_AUTHORITY_TAG, MINT_AUTHORITY_KEY),
            freeze_authority: Self::authority(data, FREEZE_AUTHORITY_TAG, FREEZE_AUTHORITY_KEY),
            supply: supply.to_string(),
            decimals: data[DECIMALS],
        })
    }

    /// Decode a base64 `getAccountInfo` payload
    pub fn decode_base64(mint: &str, encoded: &str) -> Result<MintAccountRecord, DecodeError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| DecodeError::InvalidBase64)?;
        Self::decode(mint, &bytes)
    }

    /// Shortened, non-reversible identifier for an optional authority key
    fn authority(data: &[u8], tag_offset: usize, key_offset: usize) -> Option<String> {
        if data[tag_offset] == 0 {
            return None;
        }
        let key = &data[key_offset..key_offset + KEY_LEN];
        let mut encoded = BASE64.encode(key);
        encoded.truncate(AUTHORITY_ID_LEN);
        Some(encoded)
    }

    /// Top-10 holder concentration as a percentage with two decimals.
    ///
    /// Integer math throughout: `sum * 10000 / supply` is computed first and
    /// only the final basis-point value is turned into a float. Returns `None`
    /// for an empty holder list or a zero / unparseable supply. Unparseable
    /// holder amounts are skipped.
    pub fn top10_concentration(holders: &[TokenHolderAccount], total_supply: &str) -> Option<f64> {
        if holders.is_empty() {
            return None;
        }
        let total: U256 = total_supply.trim().parse().ok()?;
        if total.is_zero() {
            return None;
        }

        let top_sum = holders
            .iter()
            .take(TOP_HOLDER_COUNT)
            .filter_map(|h| h.amount.trim().parse::<U256>().ok())
            .fold(U256::ZERO, |acc, amount| acc.saturating_add(amount));

        let basis_points = top_sum.saturating_mul(U256::from(10_000u64)) / total;
        let basis_points: u64 = basis_points.try_into().unwrap_or(u64::MAX);

        let percentage = basis_points as f64 / 100.0;
        Some(percentage.clamp(0.0, 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(amount: &str) -> TokenHolderAccount {
        TokenHolderAccount {
            address: "Holder".to_string(),
            amount: amount.to_string(),
            decimals: 6,
        }
    }

    fn mint_bytes(supply: u64, decimals: u8, mint_auth: bool, freeze_auth: bool) -> Vec<u8> {
        let mut data = vec![0u8; MINT_ACCOUNT_LEN];
        if mint_auth {
            data[0] = 1;
            data[1..33].copy_from_slice(&[7u8; 32]);
        }
        data[33..41].copy_from_slice(&supply.to_le_bytes());
        data[41] = decimals;
        data[42] = 1;
        if freeze_auth {
            data[43] = 1;
            data[44..76].copy_from_slice(&[9u8; 32]);
        }
        data
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let data = vec![0u8; MINT_ACCOUNT_LEN - 1];
        assert_eq!(
            MintDecoder::decode("Mint", &data),
            Err(DecodeError::TooShort { len: 81 })
        );
        assert!(MintDecoder::decode("Mint", &[]).is_err());
    }

    #[test]
    fn test_exact_length_without_authorities() {
        let data = mint_bytes(1_000_000, 6, false, false);
        let record = MintDecoder::decode("Mint", &data).unwrap();
        assert_eq!(record.mint, "Mint");
        assert_eq!(record.mint_authority, None);
        assert_eq!(record.freeze_authority, None);
        assert_eq!(record.supply, "1000000");
        assert_eq!(record.decimals, 6);
    }

    #[test]
    fn test_authorities_are_shortened() {
        let data = mint_bytes(5, 9, true, true);
        let record = MintDecoder::decode("Mint", &data).unwrap();
        let mint_auth = record.mint_authority.unwrap();
        assert_eq!(mint_auth.len(), AUTHORITY_ID_LEN);
        assert_eq!(mint_auth, &BASE64.encode([7u8; 32])[..AUTHORITY_ID_LEN]);
        assert_eq!(record.freeze_authority.unwrap().len(), AUTHORITY_ID_LEN);
    }

    #[test]
    fn test_max_supply_is_exact() {
        let data = mint_bytes(u64::MAX, 0, false, false);
        let record = MintDecoder::decode("Mint", &data).unwrap();
        assert_eq!(record.supply, "18446744073709551615");
    }

    #[test]
    fn test_decode_base64() {
        let encoded = BASE64.encode(mint_bytes(42, 2, true, false));
        let record = MintDecoder::decode_base64("Mint", &encoded).unwrap();
        assert_eq!(record.supply, "42");
        assert!(record.mint_authority.is_some());
        assert_eq!(
            MintDecoder::decode_base64("Mint", "%%%"),
            Err(DecodeError::InvalidBase64)
        );
    }

    #[test]
    fn test_concentration_half() {
        let holders = vec![
            holder("2000000"),
            holder("1500000"),
            holder("1000000"),
            holder("500000"),
        ];
        assert_eq!(MintDecoder::top10_concentration(&holders, "10000000"), Some(50.0));
    }

    #[test]
    fn test_concentration_null_cases() {
        assert_eq!(MintDecoder::top10_concentration(&[holder("1")], "0"), None);
        assert_eq!(MintDecoder::top10_concentration(&[], "10000000"), None);
        assert_eq!(MintDecoder::top10_concentration(&[holder("1")], "abc"), None);
    }

    #[test]
    fn test_concentration_only_counts_top_ten() {
        let holders: Vec<_> = (0..15).map(|_| holder("100")).collect();
        // 10 * 100 / 10000 = 10%
        assert_eq!(MintDecoder::top10_concentration(&holders, "10000"), Some(10.0));
    }

    #[test]
    fn test_concentration_large_values_and_clamp() {
        let big = u64::MAX.to_string();
        let holders = vec![holder(&big), holder(&big)];
        assert_eq!(MintDecoder::top10_concentration(&holders, &big), Some(100.0));

        let third = vec![holder("1")];
        assert_eq!(MintDecoder::top10_concentration(&third, "3"), Some(33.33));
    }

    #[test]
    fn test_concentration_skips_bad_amounts() {
        let holders = vec![holder("abc"), holder("2500")];
        assert_eq!(MintDecoder::top10_concentration(&holders, "10000"), Some(25.0));
    }
}
