//! # API Request Handlers
//!
//! Each handler:
//! 1. Extracts request data
//! 2. Calls the swap manager
//! 3. Maps the outcome to a JSON response
//!
//! ## Error Handling
//!
//! Service errors and program errors share one code space, so a client sees
//! `SEQUENCE_MISMATCH` whether the backend caught the problem or the chain
//! did:
//!
//! ```json
//! {
//!     "success": false,
//!     "error": {
//!         "code": "SEQUENCE_MISMATCH",
//!         "message": "Program error SequenceMismatch: ..."
//!     }
//! }
//! ```

use std::sync::Arc;

use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::auth::Operator;
use crate::models::{
    ApiResponse, CompleteSwapRequest, HealthResponse, InitiateSwapRequest, OpenSwapRequest,
    RegisterUserRequest, SubmitTransactionRequest, SwapListQuery,
};
use crate::services::transaction_submitter::TransactionSubmitterError;
use crate::services::SwapServiceError;
use crate::utils::truncate_string;
use crate::AppState;

/// HTTP status and API code for a service error.
pub fn error_code(e: &SwapServiceError) -> (StatusCode, &'static str) {
    match e {
        SwapServiceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        SwapServiceError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        SwapServiceError::UnsupportedPair(..) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_PAIR"),
        SwapServiceError::VaultsAlreadyInitialized => (StatusCode::CONFLICT, "ALREADY_INITIALIZED"),
        SwapServiceError::UserNotFound(_) => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
        SwapServiceError::UserAlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
        SwapServiceError::SwapNotFound(_) => (StatusCode::NOT_FOUND, "SWAP_NOT_FOUND"),
        SwapServiceError::StateMismatch { .. } => (StatusCode::CONFLICT, "STATE_MISMATCH"),
        SwapServiceError::AmountMismatch { .. } => (StatusCode::BAD_REQUEST, "AMOUNT_MISMATCH"),
        SwapServiceError::TransactionNotFound(_) => (StatusCode::NOT_FOUND, "TRANSACTION_NOT_FOUND"),
        SwapServiceError::TransactionAlreadyProcessed(_) => {
            (StatusCode::CONFLICT, "TRANSACTION_ALREADY_PROCESSED")
        }
        SwapServiceError::TransactionTampered => (StatusCode::BAD_REQUEST, "TRANSACTION_MISMATCH"),
        SwapServiceError::Builder(_) => (StatusCode::BAD_REQUEST, "INVALID_TRANSACTION"),
        SwapServiceError::Submitter(TransactionSubmitterError::ProgramError { code, .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, code.api_code())
        }
        SwapServiceError::Submitter(TransactionSubmitterError::NotFullySigned) => {
            (StatusCode::BAD_REQUEST, "UNAUTHORIZED")
        }
        SwapServiceError::Submitter(_) => (StatusCode::BAD_GATEWAY, "SUBMISSION_FAILED"),
        SwapServiceError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        SwapServiceError::Solana(_) => (StatusCode::BAD_GATEWAY, "SOLANA_RPC_ERROR"),
    }
}

fn respond<T: Serialize>(operation: &str, result: Result<T, SwapServiceError>) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(ApiResponse::success(data)),
        Err(e) => {
            let (status, code) = error_code(&e);
            let message = truncate_string(&e.to_string(), 500);
            if status.is_server_error() {
                error!("{} failed: {}", operation, message);
            } else {
                warn!("{} rejected ({}): {}", operation, code, message);
            }
            HttpResponse::build(status).json(ApiResponse::<()>::error(code, &message))
        }
    }
}

/// API information endpoint.
///
/// `GET /`
pub async fn api_info() -> HttpResponse {
    let info = json!({
        "name": "Fiat Bridge Operator API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "vaults": ["GET /vaults", "POST /vaults/initialize"],
            "users": ["POST /users", "GET /users/{authority}"],
            "swaps": [
                "POST /swaps",
                "POST /swaps/initiate",
                "POST /swaps/complete",
                "GET /swaps/{authority}",
                "GET /swaps/{authority}/{sequenceIndex}"
            ],
            "transactions": ["POST /transactions/submit"]
        }
    });

    HttpResponse::Ok().json(ApiResponse::success(info))
}

/// Health check.
///
/// `GET /health`
///
/// ## Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "status": "healthy",
///         "database": true,
///         "solanaRpc": true,
///         "version": "0.1.0",
///         "timestamp": "2025-12-08T12:00:00Z"
///     }
/// }
/// ```
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let db_healthy = state.db.pool().get().await.is_ok();
    let solana_healthy = state.solana.get_health().await.unwrap_or(false);
    let healthy = db_healthy && solana_healthy;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        database: db_healthy,
        solana_rpc: solana_healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    HttpResponse::build(status).json(ApiResponse::success(response))
}

// ============================================
// VAULTS
// ============================================

/// `GET /vaults`
pub async fn get_vaults(state: web::Data<Arc<AppState>>) -> HttpResponse {
    respond("Get vaults", state.swap_manager.get_vaults().await)
}

/// Create both vaults. The admin signs and pays. Operator only.
///
/// `POST /vaults/initialize`
pub async fn initialize_vaults(_operator: Operator, state: web::Data<Arc<AppState>>) -> HttpResponse {
    info!("Initialize vaults request");
    respond("Initialize vaults", state.swap_manager.initialize_vaults().await)
}

// ============================================
// USERS
// ============================================

/// Prepare `new_user`.
///
/// `POST /users`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/users \
///   -H "Content-Type: application/json" \
///   -d '{ "authority": "YOUR_WALLET_ADDRESS" }'
/// ```
pub async fn register_user(
    state: web::Data<Arc<AppState>>,
    body: web::Json<RegisterUserRequest>,
) -> HttpResponse {
    info!("Register user request for: {}", body.authority);
    respond("Register user", state.swap_manager.register_user(&body.authority).await)
}

/// `GET /users/{authority}`
pub async fn get_user(state: web::Data<Arc<AppState>>, path: web::Path<String>) -> HttpResponse {
    respond("Get user", state.swap_manager.get_user(&path.into_inner()).await)
}

// ============================================
// SWAPS
// ============================================

/// Prepare `new_swap` for the next free slot.
///
/// `POST /swaps`
pub async fn open_swap(
    state: web::Data<Arc<AppState>>,
    body: web::Json<OpenSwapRequest>,
) -> HttpResponse {
    info!("Open swap request for: {}", body.authority);
    respond("Open swap", state.swap_manager.open_swap(&body.authority).await)
}

/// Prepare `initiate_swap`.
///
/// `POST /swaps/initiate`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/swaps/initiate \
///   -H "Content-Type: application/json" \
///   -d '{
///     "authority": "YOUR_WALLET_ADDRESS",
///     "sequenceIndex": 1,
///     "stablecoin": "USDC",
///     "fiatCurrency": "GHS",
///     "txKind": "ONRAMP",
///     "amount": 100000000
///   }'
/// ```
pub async fn initiate_swap(
    state: web::Data<Arc<AppState>>,
    body: web::Json<InitiateSwapRequest>,
) -> HttpResponse {
    info!(
        "Initiate swap request: {}#{} {} {} {}",
        body.authority, body.sequence_index, body.tx_kind, body.amount, body.stablecoin
    );
    respond("Initiate swap", state.swap_manager.initiate_swap(&body).await)
}

/// Prepare `complete_swap` with the operator's fiat attestation. Operator
/// only: the returned transaction already carries the admin signature.
///
/// `POST /swaps/complete`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/swaps/complete \
///   -H "Content-Type: application/json" \
///   -H "X-Operator-Key: $OPERATOR_API_KEY" \
///   -d '{ "authority": "USER_WALLET", "sequenceIndex": 1, "success": true, "amount": 100000000 }'
/// ```
pub async fn complete_swap(
    _operator: Operator,
    state: web::Data<Arc<AppState>>,
    body: web::Json<CompleteSwapRequest>,
) -> HttpResponse {
    info!(
        "Complete swap request: {}#{} success={}",
        body.authority, body.sequence_index, body.success
    );
    respond("Complete swap", state.swap_manager.complete_swap(&body).await)
}

/// `GET /swaps/{authority}?limit=20&offset=0`
pub async fn list_swaps(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    query: web::Query<SwapListQuery>,
) -> HttpResponse {
    let (limit, offset) = query.normalized();
    respond(
        "List swaps",
        state.swap_manager.list_swaps(&path.into_inner(), limit, offset).await,
    )
}

/// `GET /swaps/{authority}/{sequence_index}`
pub async fn get_swap(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, u64)>,
) -> HttpResponse {
    let (authority, index) = path.into_inner();
    respond("Get swap", state.swap_manager.get_swap(&authority, index).await)
}

// ============================================
// TRANSACTIONS
// ============================================

/// Submit a transaction the authority has signed.
///
/// `POST /transactions/submit`
pub async fn submit_transaction(
    state: web::Data<Arc<AppState>>,
    body: web::Json<SubmitTransactionRequest>,
) -> HttpResponse {
    info!("Submit transaction request: {}", body.transaction_id);
    respond("Submit transaction", state.swap_manager.submit_transaction(&body).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::layout::SwapStatus;
    use crate::solana::program_error::ProgramError;

    #[test]
    fn test_program_errors_keep_their_code() {
        let e = SwapServiceError::Submitter(TransactionSubmitterError::ProgramError {
            code: ProgramError::SequenceMismatch,
            message: "custom program error: 0x1790".into(),
        });
        assert_eq!(
            error_code(&e),
            (StatusCode::UNPROCESSABLE_ENTITY, "SEQUENCE_MISMATCH")
        );
    }

    #[test]
    fn test_preflight_errors_share_program_codes() {
        let e = SwapServiceError::StateMismatch {
            expected: SwapStatus::Created,
            actual: SwapStatus::Settled,
        };
        assert_eq!(error_code(&e).1, ProgramError::StateMismatch.api_code());

        let e = SwapServiceError::AmountMismatch { expected: 1, actual: 2 };
        assert_eq!(error_code(&e).1, ProgramError::AmountMismatch.api_code());

        assert_eq!(error_code(&SwapServiceError::InvalidAmount).1, "INVALID_AMOUNT");
    }

    #[test]
    fn test_missing_signature_is_unauthorized() {
        let e = SwapServiceError::Submitter(TransactionSubmitterError::NotFullySigned);
        assert_eq!(error_code(&e), (StatusCode::BAD_REQUEST, "UNAUTHORIZED"));
    }

    #[test]
    fn test_infrastructure_errors_are_server_side() {
        let (status, code) = error_code(&SwapServiceError::Solana("timeout".into()));
        assert!(status.is_server_error());
        assert_eq!(code, "SOLANA_RPC_ERROR");
    }
}
