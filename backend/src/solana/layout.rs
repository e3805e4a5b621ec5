//! # On-Chain Account Layouts
//!
//! Decoders for the bridge program's accounts and the enums carried in its
//! instruction arguments. The backend does not link the program crate, so
//! the Borsh layouts are mirrored here by hand.
//!
//! ## Discriminators
//!
//! Anchor prefixes every account with the first 8 bytes of
//! `sha256("account:<Name>")` and every instruction with the first 8 bytes
//! of `sha256("global:<name>")`. Both are computed, not hard-coded.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::hash::hash;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors raised while decoding raw account bytes.
#[derive(Error, Debug, PartialEq)]
pub enum LayoutError {
    #[error("Account data too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Discriminator does not match {0}")]
    WrongDiscriminator(&'static str),

    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: &'static str, value: u8 },
}

/// First 8 bytes of `sha256("account:<name>")`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account", name)
}

/// First 8 bytes of `sha256("global:<name>")`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator("global", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = hash(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.to_bytes()[..8]);
    out
}

// ============================================
// ENUMS
// ============================================

/// Generates a Borsh-indexed enum with string conversions for the API.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident = $index:literal => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Borsh variant index.
            pub fn index(self) -> u8 {
                match self {
                    $(Self::$variant => $index),+
                }
            }

            pub fn from_index(value: u8) -> Result<Self, LayoutError> {
                match value {
                    $($index => Ok(Self::$variant),)+
                    _ => Err(LayoutError::InvalidEnum { field: $field, value }),
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("Unknown {}: {}", $field, other)),
                }
            }
        }
    };
}

wire_enum!(
    /// Stablecoin held in custody.
    StablecoinKind, "stablecoin" {
        Usdc = 0 => "USDC",
        Usdt = 1 => "USDT",
    }
);

wire_enum!(
    /// Fiat side of a swap. Never touches the chain.
    FiatCurrency, "fiat currency" {
        Ghs = 0 => "GHS",
        Usd = 1 => "USD",
    }
);

wire_enum!(
    /// Swap direction.
    TransactionKind, "transaction kind" {
        Onramp = 0 => "ONRAMP",
        Offramp = 1 => "OFFRAMP",
    }
);

wire_enum!(
    /// Lifecycle state of a swap record.
    SwapStatus, "swap status" {
        Created = 0 => "CREATED",
        Initiated = 1 => "INITIATED",
        Settled = 2 => "SETTLED",
        Rejected = 3 => "REJECTED",
    }
);

impl SwapStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Rejected)
    }
}

/// Pairs the program's `initiate_swap` accepts. Keep in step with the
/// program's table.
pub const SUPPORTED_PAIRS: &[(StablecoinKind, FiatCurrency)] = &[
    (StablecoinKind::Usdc, FiatCurrency::Ghs),
    (StablecoinKind::Usdc, FiatCurrency::Usd),
    (StablecoinKind::Usdt, FiatCurrency::Ghs),
    (StablecoinKind::Usdt, FiatCurrency::Usd),
];

pub fn is_supported_pair(stablecoin: StablecoinKind, fiat: FiatCurrency) -> bool {
    SUPPORTED_PAIRS.contains(&(stablecoin, fiat))
}

// ============================================
// ACCOUNTS
// ============================================

/// Decoded `UserAccount`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccountData {
    pub authority: Pubkey,
    pub swap_sequence: u64,
    pub total_settled_value: u64,
    pub created_at: DateTime<Utc>,
    pub bump: u8,
}

impl UserAccountData {
    /// ```text
    /// Offset | Size | Field
    /// -------|------|------
    /// 0      | 8    | discriminator
    /// 8      | 32   | authority
    /// 40     | 8    | swap_sequence
    /// 48     | 8    | total_settled_value
    /// 56     | 8    | created_at (i64)
    /// 64     | 1    | bump
    /// ```
    pub const LEN: usize = 65;

    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut reader = Reader::new(data, Self::LEN, "UserAccount")?;

        Ok(Self {
            authority: reader.pubkey(),
            swap_sequence: reader.u64(),
            total_settled_value: reader.u64(),
            created_at: timestamp(reader.i64()),
            bump: reader.u8(),
        })
    }

    /// Index the next `new_swap` must claim.
    pub fn next_sequence(&self) -> u64 {
        self.swap_sequence.saturating_add(1)
    }
}

/// Terms bound at initiation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapTermsData {
    pub stablecoin: StablecoinKind,
    pub fiat: FiatCurrency,
    pub tx_kind: TransactionKind,
    pub amount: u64,
    /// Mint whose vault holds the swap's custody.
    pub mint: Pubkey,
}

/// Decoded `SwapAccount`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapAccountData {
    pub authority: Pubkey,
    pub sequence_index: u64,
    pub status: SwapStatus,
    pub terms: Option<SwapTermsData>,
    pub created_at: DateTime<Utc>,
    pub initiated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub settled: bool,
    pub bump: u8,
}

impl SwapAccountData {
    /// ```text
    /// Offset | Size | Field
    /// -------|------|------
    /// 0      | 8    | discriminator
    /// 8      | 32   | authority
    /// 40     | 8    | sequence_index
    /// 48     | 1    | status
    /// 49     | 1+43 | terms: Option<(u8, u8, u8, u64, Pubkey)>
    /// 93     | 8    | created_at
    /// 101    | 8    | initiated_at
    /// 109    | 8    | completed_at
    /// 117    | 1    | settled
    /// 118    | 1    | bump
    /// ```
    ///
    /// Offsets assume `Some` terms. With `None` the tag is a single byte and
    /// the remaining fields shift left, leaving zero padding at the end of
    /// the allocation.
    pub const LEN: usize = 119;

    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut reader = Reader::new(data, Self::LEN, "SwapAccount")?;

        let authority = reader.pubkey();
        let sequence_index = reader.u64();
        let status = SwapStatus::from_index(reader.u8())?;

        let terms = match reader.u8() {
            0 => None,
            1 => Some(SwapTermsData {
                stablecoin: StablecoinKind::from_index(reader.u8())?,
                fiat: FiatCurrency::from_index(reader.u8())?,
                tx_kind: TransactionKind::from_index(reader.u8())?,
                amount: reader.u64(),
                mint: reader.pubkey(),
            }),
            value => return Err(LayoutError::InvalidEnum { field: "terms tag", value }),
        };

        let created_at = timestamp(reader.i64());
        let initiated_at = optional_timestamp(reader.i64());
        let completed_at = optional_timestamp(reader.i64());
        let settled = reader.u8() != 0;
        let bump = reader.u8();

        Ok(Self {
            authority,
            sequence_index,
            status,
            terms,
            created_at,
            initiated_at,
            completed_at,
            settled,
            bump,
        })
    }
}

/// Little-endian cursor over a length-checked buffer.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], len: usize, account: &'static str) -> Result<Self, LayoutError> {
        if data.len() < len {
            return Err(LayoutError::TooShort {
                expected: len,
                actual: data.len(),
            });
        }
        if data[..8] != account_discriminator(account) {
            return Err(LayoutError::WrongDiscriminator(account));
        }
        Ok(Self { data, offset: 8 })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take())
    }

    fn pubkey(&mut self) -> Pubkey {
        Pubkey::new_from_array(self.take())
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// The program writes 0 for "not yet".
fn optional_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    (secs != 0).then(|| timestamp(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_bytes(authority: &Pubkey, sequence: u64) -> Vec<u8> {
        let mut data = account_discriminator("UserAccount").to_vec();
        data.extend_from_slice(authority.as_ref());
        data.extend_from_slice(&sequence.to_le_bytes());
        data.extend_from_slice(&2_500u64.to_le_bytes());
        data.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        data.push(254);
        data
    }

    fn mint() -> Pubkey {
        Pubkey::new_from_array([9; 32])
    }

    fn swap_bytes(authority: &Pubkey, terms: Option<[u8; 3]>, status: u8) -> Vec<u8> {
        let mut data = account_discriminator("SwapAccount").to_vec();
        data.extend_from_slice(authority.as_ref());
        data.extend_from_slice(&3u64.to_le_bytes());
        data.push(status);
        match terms {
            Some(kinds) => {
                data.push(1);
                data.extend_from_slice(&kinds);
                data.extend_from_slice(&1_000_000u64.to_le_bytes());
                data.extend_from_slice(mint().as_ref());
            }
            None => data.push(0),
        }
        data.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        data.extend_from_slice(&1_700_000_100i64.to_le_bytes());
        data.extend_from_slice(&0i64.to_le_bytes());
        data.push(0);
        data.push(255);
        data.resize(SwapAccountData::LEN, 0);
        data
    }

    #[test]
    fn test_discriminators_match_anchor() {
        assert_eq!(
            account_discriminator("UserAccount"),
            [211, 33, 136, 16, 186, 110, 242, 127]
        );
        assert_eq!(
            account_discriminator("SwapAccount"),
            [53, 126, 9, 14, 14, 197, 105, 182]
        );
        assert_eq!(
            instruction_discriminator("new_swap"),
            [107, 204, 61, 32, 206, 85, 74, 125]
        );
    }

    #[test]
    fn test_decode_user_account() {
        let authority = Pubkey::new_unique();
        let data = user_bytes(&authority, 4);
        assert_eq!(data.len(), UserAccountData::LEN);

        let user = UserAccountData::decode(&data).unwrap();
        assert_eq!(user.authority, authority);
        assert_eq!(user.swap_sequence, 4);
        assert_eq!(user.next_sequence(), 5);
        assert_eq!(user.total_settled_value, 2_500);
        assert_eq!(user.created_at.timestamp(), 1_700_000_000);
        assert_eq!(user.bump, 254);
    }

    #[test]
    fn test_decode_swap_with_terms() {
        let authority = Pubkey::new_unique();
        let data = swap_bytes(&authority, Some([1, 0, 1]), 1);
        assert_eq!(data.len(), SwapAccountData::LEN);

        let swap = SwapAccountData::decode(&data).unwrap();
        assert_eq!(swap.sequence_index, 3);
        assert_eq!(swap.status, SwapStatus::Initiated);
        assert_eq!(
            swap.terms,
            Some(SwapTermsData {
                stablecoin: StablecoinKind::Usdt,
                fiat: FiatCurrency::Ghs,
                tx_kind: TransactionKind::Offramp,
                amount: 1_000_000,
                mint: mint(),
            })
        );
        assert_eq!(swap.created_at.timestamp(), 1_700_000_000);
        assert!(swap.initiated_at.is_some());
        assert!(swap.completed_at.is_none());
        assert!(!swap.settled);
    }

    #[test]
    fn test_decode_swap_without_terms() {
        let data = swap_bytes(&Pubkey::new_unique(), None, 0);
        let swap = SwapAccountData::decode(&data).unwrap();
        assert_eq!(swap.status, SwapStatus::Created);
        assert!(swap.terms.is_none());
        assert_eq!(swap.bump, 255);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let authority = Pubkey::new_unique();

        let short = &user_bytes(&authority, 0)[..40];
        assert!(matches!(
            UserAccountData::decode(short),
            Err(LayoutError::TooShort { expected: 65, actual: 40 })
        ));

        // A swap record is long enough but carries the wrong prefix.
        let swap = swap_bytes(&authority, None, 0);
        assert_eq!(
            UserAccountData::decode(&swap),
            Err(LayoutError::WrongDiscriminator("UserAccount"))
        );

        let bad_status = swap_bytes(&authority, None, 9);
        assert!(matches!(
            SwapAccountData::decode(&bad_status),
            Err(LayoutError::InvalidEnum { field: "swap status", value: 9 })
        ));
    }

    #[test]
    fn test_enum_strings() {
        assert_eq!("usdc".parse::<StablecoinKind>(), Ok(StablecoinKind::Usdc));
        assert_eq!("OFFRAMP".parse::<TransactionKind>(), Ok(TransactionKind::Offramp));
        assert!("EUR".parse::<FiatCurrency>().is_err());
        assert_eq!(SwapStatus::Rejected.to_string(), "REJECTED");
        assert!(SwapStatus::Settled.is_terminal());
        assert!(!SwapStatus::Initiated.is_terminal());
        assert_eq!(FiatCurrency::Usd.index(), 1);
    }

    #[test]
    fn test_supported_pairs() {
        assert_eq!(SUPPORTED_PAIRS.len(), 4);
        assert!(is_supported_pair(StablecoinKind::Usdt, FiatCurrency::Ghs));
    }
}
