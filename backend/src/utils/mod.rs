//! # Utilities Module
//!
//! Helpers shared across the backend service.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

/// Both supported stablecoins use 6 decimals.
pub const STABLECOIN_DECIMALS: u32 = 6;

const UNIT: u64 = 10u64.pow(STABLECOIN_DECIMALS);

/// Format smallest units as a human-readable amount.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(format_amount(1_000_000, "USDC"), "1.00 USDC");
/// assert_eq!(format_amount(1_234_567_890, "USDT"), "1,234.56 USDT");
/// ```
///
/// Cents are truncated, never rounded up.
pub fn format_amount(amount: u64, symbol: &str) -> String {
    let whole = amount / UNIT;
    let cents = (amount % UNIT) / (UNIT / 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}.{:02} {}", grouped, cents, symbol)
}

/// Parse a base58 Solana public key.
pub fn parse_pubkey(value: &str) -> Result<Pubkey, String> {
    Pubkey::from_str(value.trim()).map_err(|e| format!("Invalid public key '{}': {}", value, e))
}

/// Truncate a string to a maximum length, adding "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0, "USDC"), "0.00 USDC");
        assert_eq!(format_amount(1_000_000, "USDC"), "1.00 USDC");
        assert_eq!(format_amount(1_500_000, "USDT"), "1.50 USDT");
        assert_eq!(format_amount(999_999, "USDT"), "0.99 USDT");
        assert_eq!(format_amount(1_234_567_890, "USDT"), "1,234.56 USDT");
        assert_eq!(format_amount(1_000_000_000_000, "USDC"), "1,000,000.00 USDC");
    }

    #[test]
    fn test_parse_pubkey() {
        assert!(parse_pubkey("9BXU2dMqE2qaGaySPnw51FTqfrC2U8jDzDwstGer2n6b").is_ok());
        assert!(parse_pubkey("invalid!").is_err());
        assert!(parse_pubkey("").is_err());
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }
}
