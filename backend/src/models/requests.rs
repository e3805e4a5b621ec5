//! # API Request Models
//!
//! Structures for incoming API request bodies.
//!
//! ## Notes
//!
//! - Amounts are in smallest units (6 decimals for both USDC and USDT),
//!   so 1 USDC = 1,000,000
//! - Enum fields are case-insensitive strings: `USDC`/`USDT`,
//!   `GHS`/`USD`, `ONRAMP`/`OFFRAMP`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register an authority (`POST /users`).
///
/// ## Example JSON
///
/// ```json
/// {
///     "authority": "7xKt9Fj2abc123..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    /// The user's wallet public key (base58 encoded).
    pub authority: String,
}

/// Request to claim the next swap slot (`POST /swaps`).
///
/// The backend reads the user's current sequence and prepares a `new_swap`
/// for `swap_sequence + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSwapRequest {
    pub authority: String,
}

/// Request to bind terms to a created swap (`POST /swaps/initiate`).
///
/// ## Example JSON
///
/// ```json
/// {
///     "authority": "7xKt9Fj2abc123...",
///     "sequenceIndex": 1,
///     "stablecoin": "USDC",
///     "fiatCurrency": "GHS",
///     "txKind": "ONRAMP",
///     "amount": 100000000
/// }
/// ```
///
/// For an Onramp, the authority's associated token account must hold
/// `amount` when the transaction lands; it is escrowed into the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateSwapRequest {
    pub authority: String,
    pub sequence_index: u64,
    pub stablecoin: String,
    pub fiat_currency: String,
    pub tx_kind: String,
    pub amount: u64,
}

/// Operator attestation of the fiat leg (`POST /swaps/complete`).
///
/// `amount` must equal the amount bound at initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSwapRequest {
    pub authority: String,
    pub sequence_index: u64,

    /// `true` when the fiat leg succeeded.
    pub success: bool,
    pub amount: u64,
}

/// A prepared transaction, now signed by the authority
/// (`POST /transactions/submit`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionRequest {
    /// `transactionId` returned when the transaction was prepared.
    pub transaction_id: Uuid,

    /// Base64-encoded, fully signed transaction.
    pub signed_transaction: String,
}

/// Query parameters for listing swaps.
///
/// ## Example URL
///
/// ```text
/// GET /swaps/7xKt9Fj2...?limit=20&offset=0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapListQuery {
    /// Default: 20, Max: 100
    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl SwapListQuery {
    /// Clamp paging values into the accepted range.
    pub fn normalized(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate_request_uses_camel_case() {
        let json = r#"{
            "authority": "7xKt",
            "sequenceIndex": 2,
            "stablecoin": "usdt",
            "fiatCurrency": "USD",
            "txKind": "OFFRAMP",
            "amount": 5
        }"#;
        let req: InitiateSwapRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.sequence_index, 2);
        assert_eq!(req.fiat_currency, "USD");
    }

    #[test]
    fn test_list_query_defaults_and_clamps() {
        let query: SwapListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.normalized(), (20, 0));

        let query = SwapListQuery { limit: 1_000, offset: -5 };
        assert_eq!(query.normalized(), (100, 0));
    }
}
