//! # Database Models
//!
//! Row types for the index tables.
//!
//! | Table | Description |
//! |-------|-------------|
//! | `bridge_users` | Cached user records |
//! | `swaps` | Cached swap records |
//! | `swap_transactions` | Transactions prepared for co-signing |
//!
//! ## Note on Types
//!
//! Amounts and indices are `i64` because PostgreSQL has no unsigned
//! integers. Conversions from chain values go through [`to_db_amount`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::solana::layout::{SwapAccountData, SwapStatus, UserAccountData};

/// Status of a swap whose `new_swap` transaction has not landed yet.
pub const STATUS_PENDING: &str = "PENDING";

/// Cached user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeUserRecord {
    /// Authority's wallet public key (base58). Primary key.
    pub authority: String,

    /// Derived user record address.
    pub user_account: String,

    pub swap_sequence: i64,

    pub total_settled_value: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BridgeUserRecord {
    /// Build a row from the decoded on-chain record.
    pub fn from_chain(user_account: String, data: &UserAccountData) -> Self {
        Self {
            authority: data.authority.to_string(),
            user_account,
            swap_sequence: to_db_amount(data.swap_sequence),
            total_settled_value: to_db_amount(data.total_settled_value),
            created_at: data.created_at,
            updated_at: Utc::now(),
        }
    }
}

/// Cached swap record.
///
/// `status` holds a [`SwapStatus`] string, or [`STATUS_PENDING`] before
/// the swap exists on chain. Terms are `NULL` until initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRecord {
    pub id: Uuid,
    pub authority: String,
    pub sequence_index: i64,
    pub swap_account: String,
    pub status: String,
    pub stablecoin: Option<String>,
    pub fiat_currency: Option<String>,
    pub tx_kind: Option<String>,
    pub amount: Option<i64>,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
    pub initiated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SwapRecord {
    /// A swap whose slot has been prepared but not yet claimed on chain.
    pub fn pending(authority: String, sequence_index: u64, swap_account: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            authority,
            sequence_index: to_db_amount(sequence_index),
            swap_account,
            status: STATUS_PENDING.to_string(),
            stablecoin: None,
            fiat_currency: None,
            tx_kind: None,
            amount: None,
            settled: false,
            created_at: now,
            initiated_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Overwrite the cached fields with the on-chain record.
    pub fn apply_chain(&mut self, data: &SwapAccountData) {
        self.status = data.status.as_str().to_string();
        if let Some(terms) = &data.terms {
            self.stablecoin = Some(terms.stablecoin.as_str().to_string());
            self.fiat_currency = Some(terms.fiat.as_str().to_string());
            self.tx_kind = Some(terms.tx_kind.as_str().to_string());
            self.amount = Some(to_db_amount(terms.amount));
        }
        self.settled = data.settled;
        self.created_at = data.created_at;
        self.initiated_at = data.initiated_at;
        self.completed_at = data.completed_at;
        self.updated_at = Utc::now();
    }

    /// Parsed status, `None` while pending.
    pub fn chain_status(&self) -> Option<SwapStatus> {
        self.status.parse().ok()
    }

    pub fn is_open(&self) -> bool {
        !self.chain_status().is_some_and(SwapStatus::is_terminal)
    }
}

/// Prepared-transaction status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Co-signed by the admin, waiting for the authority.
    AwaitingSignature,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingSignature => "awaiting_signature",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

/// Audit row for a prepared transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapTransactionRecord {
    pub id: Uuid,
    pub authority: String,

    /// `None` for `new_user`.
    pub sequence_index: Option<i64>,

    /// Instruction name, e.g. `initiate_swap`.
    pub instruction: String,
    pub status: String,
    pub signature: Option<String>,

    /// API error code when the submission failed.
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapTransactionRecord {
    pub fn awaiting(authority: String, sequence_index: Option<u64>, instruction: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            authority,
            sequence_index: sequence_index.map(to_db_amount),
            instruction: instruction.to_string(),
            status: TransactionStatus::AwaitingSignature.as_str().to_string(),
            signature: None,
            error_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Clamp a chain `u64` into a `BIGINT`.
pub fn to_db_amount(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::layout::{FiatCurrency, StablecoinKind, SwapTermsData, TransactionKind};
    use solana_sdk::pubkey::Pubkey;

    fn chain_swap(status: SwapStatus) -> SwapAccountData {
        SwapAccountData {
            authority: Pubkey::new_unique(),
            sequence_index: 2,
            status,
            terms: Some(SwapTermsData {
                stablecoin: StablecoinKind::Usdc,
                fiat: FiatCurrency::Ghs,
                tx_kind: TransactionKind::Onramp,
                amount: 42,
                mint: Pubkey::new_unique(),
            }),
            created_at: Utc::now(),
            initiated_at: Some(Utc::now()),
            completed_at: None,
            settled: false,
            bump: 255,
        }
    }

    #[test]
    fn test_pending_swap_is_open() {
        let record = SwapRecord::pending("auth".into(), 1, "swap".into());
        assert_eq!(record.status, STATUS_PENDING);
        assert_eq!(record.chain_status(), None);
        assert!(record.is_open());
    }

    #[test]
    fn test_apply_chain_copies_terms() {
        let mut record = SwapRecord::pending("auth".into(), 2, "swap".into());
        record.apply_chain(&chain_swap(SwapStatus::Initiated));

        assert_eq!(record.status, "INITIATED");
        assert_eq!(record.stablecoin.as_deref(), Some("USDC"));
        assert_eq!(record.fiat_currency.as_deref(), Some("GHS"));
        assert_eq!(record.tx_kind.as_deref(), Some("ONRAMP"));
        assert_eq!(record.amount, Some(42));
        assert!(record.is_open());

        record.apply_chain(&chain_swap(SwapStatus::Rejected));
        assert!(!record.is_open());
    }

    #[test]
    fn test_to_db_amount_clamps() {
        assert_eq!(to_db_amount(5), 5);
        assert_eq!(to_db_amount(u64::MAX), i64::MAX);
    }
}
