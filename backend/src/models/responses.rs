//! # API Response Models
//!
//! Structures for outgoing API response bodies.
//! All responses are wrapped in [`ApiResponse`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{BridgeUserRecord, SwapRecord};
use crate::solana::VaultState;
use crate::utils::format_amount;

/// Standard API response wrapper.
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "SEQUENCE_MISMATCH",
///         "message": "Sequence index does not match the user's swap sequence"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,

    /// Response data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "STATE_MISMATCH").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// A transaction built and co-signed by the admin, waiting for the
/// authority's signature.
///
/// ## Example Response
///
/// ```json
/// {
///     "transactionId": "550e8400-e29b-41d4-a716-446655440000",
///     "instruction": "new_swap",
///     "authority": "7xKt9Fj2...",
///     "sequenceIndex": 3,
///     "account": "9Yht3Mkx...",
///     "partiallySignedTransaction": "base64...",
///     "message": "Sign with the authority wallet and POST to /transactions/submit"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransactionResponse {
    pub transaction_id: Uuid,
    pub instruction: String,
    pub authority: String,
    pub sequence_index: Option<u64>,

    /// The user or swap record the instruction targets.
    pub account: String,
    pub partially_signed_transaction: String,
    pub message: String,
}

/// Outcome of `POST /transactions/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionResponse {
    pub transaction_id: Uuid,
    pub signature: String,
    pub status: String,
}

/// Outcome of `POST /vaults/initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeVaultsResponse {
    pub signature: String,
    pub usdc_vault: String,
    pub usdt_vault: String,
}

/// Custody vault state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResponse {
    pub stablecoin: String,
    pub address: String,
    pub mint: String,
    pub initialized: bool,
    pub balance: u64,
    pub formatted_balance: String,
}

impl From<&VaultState> for VaultResponse {
    fn from(vault: &VaultState) -> Self {
        let balance = vault.balance.unwrap_or(0);
        Self {
            stablecoin: vault.kind.as_str().to_string(),
            address: vault.address.to_string(),
            mint: vault.mint.to_string(),
            initialized: vault.balance.is_some(),
            balance,
            formatted_balance: format_amount(balance, vault.kind.as_str()),
        }
    }
}

/// Registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub authority: String,
    pub user_account: String,
    pub swap_sequence: i64,

    /// Index the next `POST /swaps` will claim.
    pub next_sequence: i64,
    pub total_settled_value: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&BridgeUserRecord> for UserResponse {
    fn from(user: &BridgeUserRecord) -> Self {
        Self {
            authority: user.authority.clone(),
            user_account: user.user_account.clone(),
            swap_sequence: user.swap_sequence,
            next_sequence: user.swap_sequence.saturating_add(1),
            total_settled_value: user.total_settled_value,
            created_at: user.created_at,
        }
    }
}

/// Swap record.
///
/// `status` is `PENDING` while the `new_swap` transaction has not landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub authority: String,
    pub sequence_index: i64,
    pub swap_account: String,
    pub status: String,
    pub stablecoin: Option<String>,
    pub fiat_currency: Option<String>,
    pub tx_kind: Option<String>,
    pub amount: Option<i64>,
    pub formatted_amount: Option<String>,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
    pub initiated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&SwapRecord> for SwapResponse {
    fn from(swap: &SwapRecord) -> Self {
        let formatted_amount = match (swap.amount, swap.stablecoin.as_deref()) {
            (Some(amount), Some(symbol)) => Some(format_amount(amount.max(0) as u64, symbol)),
            _ => None,
        };

        Self {
            authority: swap.authority.clone(),
            sequence_index: swap.sequence_index,
            swap_account: swap.swap_account.clone(),
            status: swap.status.clone(),
            stablecoin: swap.stablecoin.clone(),
            fiat_currency: swap.fiat_currency.clone(),
            tx_kind: swap.tx_kind.clone(),
            amount: swap.amount,
            formatted_amount,
            settled: swap.settled,
            created_at: swap.created_at,
            initiated_at: swap.initiated_at,
            completed_at: swap.completed_at,
        }
    }
}

/// Paged swaps of one authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapListResponse {
    pub authority: String,
    pub swaps: Vec<SwapResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,
    pub database: bool,
    pub solana_rpc: bool,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<()> = ApiResponse::error("STATE_MISMATCH", "not initiated");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], "STATE_MISMATCH");
    }

    #[test]
    fn test_swap_response_formats_amount() {
        let mut record = SwapRecord::pending("auth".into(), 1, "swap".into());
        let pending = SwapResponse::from(&record);
        assert_eq!(pending.status, "PENDING");
        assert!(pending.formatted_amount.is_none());

        record.stablecoin = Some("USDC".into());
        record.amount = Some(1_500_000);
        let json = serde_json::to_value(SwapResponse::from(&record)).unwrap();
        assert_eq!(json["formattedAmount"], "1.50 USDC");
        assert_eq!(json["sequenceIndex"], 1);
    }
}
