//! # Swap Manager Service
//!
//! The operator's side of the bridge. It prepares every co-signed
//! instruction, submits what the authority has signed, and keeps the
//! database index in step with the chain.
//!
//! ## Swap Flow
//!
//! ```text
//! POST /users                 → new_user       (admin co-signed)
//! POST /swaps                 → new_swap       (slot = swap_sequence + 1)
//! POST /swaps/initiate        → initiate_swap  (Onramp escrows here)
//!        ... fiat leg happens off chain ...
//! POST /swaps/complete        → complete_swap  (operator attests outcome)
//!
//! every step: client signs as authority → POST /transactions/submit
//! ```
//!
//! Pre-flight checks mirror the program's so obvious mistakes are caught
//! before a wallet prompt. The program still re-checks everything.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{BridgeUserRecord, SwapRecord, SwapTransactionRecord, TransactionStatus};
use crate::db::{queries, Database, DatabaseError};
use crate::models::{
    CompleteSwapRequest, InitializeVaultsResponse, InitiateSwapRequest,
    PreparedTransactionResponse, SubmitTransactionRequest, SubmitTransactionResponse,
    SwapListResponse, SwapResponse, UserResponse, VaultResponse,
};
use crate::services::transaction_builder::{
    build_transaction, decode_transaction, encode_transaction, TransactionBuilder,
    TransactionBuilderError,
};
use crate::services::transaction_submitter::{TransactionSubmitter, TransactionSubmitterError};
use crate::solana::layout::{
    is_supported_pair, FiatCurrency, StablecoinKind, SwapAccountData, SwapStatus, SwapTermsData,
    TransactionKind,
};
use crate::solana::{pda, SolanaClient};
use crate::utils::parse_pubkey;

const SIGN_AND_SUBMIT: &str = "Sign with the authority wallet and POST to /transactions/submit";

/// Errors from swap operations.
#[derive(Debug, thiserror::Error)]
pub enum SwapServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("{0} / {1} is not a supported pair")]
    UnsupportedPair(StablecoinKind, FiatCurrency),

    #[error("Vaults are already initialized")]
    VaultsAlreadyInitialized,

    #[error("User not registered: {0}")]
    UserNotFound(String),

    #[error("User already registered: {0}")]
    UserAlreadyExists(String),

    #[error("Swap not found: {0}")]
    SwapNotFound(String),

    #[error("Swap is {actual}, expected {expected}")]
    StateMismatch { expected: SwapStatus, actual: SwapStatus },

    #[error("Amount {actual} does not match initiated amount {expected}")]
    AmountMismatch { expected: u64, actual: u64 },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("Transaction {0} was already submitted")]
    TransactionAlreadyProcessed(Uuid),

    #[error("Signed transaction is not paid by the prepared authority")]
    TransactionTampered,

    #[error(transparent)]
    Builder(#[from] TransactionBuilderError),

    #[error(transparent)]
    Submitter(#[from] TransactionSubmitterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Solana error: {0}")]
    Solana(String),
}

type Result<T> = std::result::Result<T, SwapServiceError>;

// ============================================
// PRE-FLIGHT CHECKS
// ============================================

/// Parse and validate the terms of an initiate request.
///
/// `mint_of` names the configured mint for a stablecoin; it is bound into
/// the terms and decides the vault the swap uses.
pub fn parse_terms(
    req: &InitiateSwapRequest,
    mint_of: impl Fn(StablecoinKind) -> Pubkey,
) -> Result<SwapTermsData> {
    let stablecoin: StablecoinKind = req.stablecoin.parse().map_err(SwapServiceError::InvalidRequest)?;
    let fiat: FiatCurrency = req.fiat_currency.parse().map_err(SwapServiceError::InvalidRequest)?;
    let tx_kind: TransactionKind = req.tx_kind.parse().map_err(SwapServiceError::InvalidRequest)?;

    if req.amount == 0 {
        return Err(SwapServiceError::InvalidAmount);
    }
    if !is_supported_pair(stablecoin, fiat) {
        return Err(SwapServiceError::UnsupportedPair(stablecoin, fiat));
    }

    Ok(SwapTermsData {
        stablecoin,
        fiat,
        tx_kind,
        amount: req.amount,
        mint: mint_of(stablecoin),
    })
}

/// A swap can be initiated only from `Created`.
pub fn check_initiatable(swap: &SwapAccountData) -> Result<()> {
    if swap.status != SwapStatus::Created {
        return Err(SwapServiceError::StateMismatch {
            expected: SwapStatus::Created,
            actual: swap.status,
        });
    }
    Ok(())
}

/// A swap can be completed only from `Initiated`, with the bound amount.
///
/// Returns the terms bound at initiation.
pub fn check_completable(swap: &SwapAccountData, amount: u64) -> Result<SwapTermsData> {
    let terms = match (&swap.terms, swap.status) {
        (Some(terms), SwapStatus::Initiated) => terms,
        _ => {
            return Err(SwapServiceError::StateMismatch {
                expected: SwapStatus::Initiated,
                actual: swap.status,
            })
        }
    };

    if terms.amount != amount {
        return Err(SwapServiceError::AmountMismatch {
            expected: terms.amount,
            actual: amount,
        });
    }
    Ok(*terms)
}

/// Users are never closed, so an indexed row proves registration without
/// a chain read.
pub fn ensure_unregistered(indexed: Option<&BridgeUserRecord>, authority: &Pubkey) -> Result<()> {
    match indexed {
        Some(_) => Err(SwapServiceError::UserAlreadyExists(authority.to_string())),
        None => Ok(()),
    }
}

// ============================================
// INDEX SYNC
// ============================================

/// Re-read swap `index` of `authority` from chain into the index.
///
/// ## Returns
///
/// * `Ok(Some(record))` - Swap exists on chain, index updated
/// * `Ok(None)` - No swap at that address yet
pub async fn refresh_swap(
    db: &Database,
    solana: &SolanaClient,
    authority: &Pubkey,
    index: u64,
) -> Result<Option<SwapRecord>> {
    let Some(chain) = solana
        .get_swap_account(authority, index)
        .await
        .map_err(SwapServiceError::Solana)?
    else {
        return Ok(None);
    };

    let owner = authority.to_string();
    let mut record = match queries::get_swap(db.pool(), &owner, chain.sequence_index as i64).await? {
        Some(existing) => existing,
        None => {
            let (address, _) = pda::derive_swap(solana.program_id(), authority, index);
            SwapRecord::pending(owner, index, address.to_string())
        }
    };
    record.apply_chain(&chain);
    queries::upsert_swap(db.pool(), &record).await?;

    Ok(Some(record))
}

/// Re-read the user record of `authority` from chain into the index.
pub async fn refresh_user(
    db: &Database,
    solana: &SolanaClient,
    authority: &Pubkey,
) -> Result<Option<BridgeUserRecord>> {
    let Some(chain) = solana
        .get_user_account(authority)
        .await
        .map_err(SwapServiceError::Solana)?
    else {
        return Ok(None);
    };

    let (address, _) = pda::derive_user(solana.program_id(), authority);
    let record = BridgeUserRecord::from_chain(address.to_string(), &chain);
    queries::upsert_user(db.pool(), &record).await?;

    Ok(Some(record))
}

// ============================================
// SERVICE
// ============================================

/// Operator swap service.
///
/// ## Usage
///
/// ```rust,ignore
/// let manager = SwapManager::new(db, solana, submitter);
/// let prepared = manager.open_swap("7xKt...").await?;
/// // client signs prepared.partially_signed_transaction ...
/// manager.submit_transaction(&signed).await?;
/// ```
#[derive(Clone)]
pub struct SwapManager {
    db: Database,
    solana: SolanaClient,
    builder: TransactionBuilder,
    submitter: TransactionSubmitter,
}

impl SwapManager {
    pub fn new(db: Database, solana: SolanaClient, submitter: TransactionSubmitter) -> Self {
        let builder = TransactionBuilder::new(&solana);
        Self {
            db,
            solana,
            builder,
            submitter,
        }
    }

    // ==========================================
    // VAULT REGISTRY
    // ==========================================

    /// Create both vaults, paid and signed by the admin.
    pub async fn initialize_vaults(&self) -> Result<InitializeVaultsResponse> {
        let usdc = self.solana.get_vault(StablecoinKind::Usdc).await.map_err(SwapServiceError::Solana)?;
        let usdt = self.solana.get_vault(StablecoinKind::Usdt).await.map_err(SwapServiceError::Solana)?;
        if usdc.balance.is_some() || usdt.balance.is_some() {
            return Err(SwapServiceError::VaultsAlreadyInitialized);
        }

        let admin = self.submitter.admin_pubkey();
        let blockhash = self.solana.get_recent_blockhash().await.map_err(SwapServiceError::Solana)?;
        let tx = build_transaction(self.builder.initialize(&admin), &admin, blockhash);

        let signature = self.submitter.sign_and_submit(tx).await?;
        info!("Vaults initialized: USDC {} / USDT {}", usdc.address, usdt.address);

        Ok(InitializeVaultsResponse {
            signature,
            usdc_vault: usdc.address.to_string(),
            usdt_vault: usdt.address.to_string(),
        })
    }

    pub async fn get_vaults(&self) -> Result<Vec<VaultResponse>> {
        let mut vaults = Vec::with_capacity(2);
        for kind in [StablecoinKind::Usdc, StablecoinKind::Usdt] {
            let vault = self.solana.get_vault(kind).await.map_err(SwapServiceError::Solana)?;
            vaults.push(VaultResponse::from(&vault));
        }
        Ok(vaults)
    }

    // ==========================================
    // USER REGISTRY
    // ==========================================

    /// Prepare `new_user` for `authority`.
    pub async fn register_user(&self, authority: &str) -> Result<PreparedTransactionResponse> {
        let authority = parse_pubkey(authority).map_err(SwapServiceError::InvalidRequest)?;

        let indexed = queries::get_user(self.db.pool(), &authority.to_string()).await?;
        ensure_unregistered(indexed.as_ref(), &authority)?;

        if self.solana.get_user_account(&authority).await.map_err(SwapServiceError::Solana)?.is_some() {
            return Err(SwapServiceError::UserAlreadyExists(authority.to_string()));
        }

        let (user_account, _) = pda::derive_user(self.builder.program_id(), &authority);
        let ix = self.builder.new_user(&self.submitter.admin_pubkey(), &authority);

        self.prepare(ix, authority, None, "new_user", user_account).await
    }

    /// Registered user, read from chain.
    ///
    /// When the RPC node is unreachable the indexed row is served instead,
    /// which may lag the chain by one sync interval.
    pub async fn get_user(&self, authority: &str) -> Result<UserResponse> {
        let authority = parse_pubkey(authority).map_err(SwapServiceError::InvalidRequest)?;

        match refresh_user(&self.db, &self.solana, &authority).await {
            Ok(Some(user)) => Ok(UserResponse::from(&user)),
            Ok(None) => Err(SwapServiceError::UserNotFound(authority.to_string())),
            Err(SwapServiceError::Solana(e)) => {
                warn!("Chain read for user {} failed, serving index: {}", authority, e);
                queries::get_user(self.db.pool(), &authority.to_string())
                    .await?
                    .map(|user| UserResponse::from(&user))
                    .ok_or(SwapServiceError::Solana(e))
            }
            Err(e) => Err(e),
        }
    }

    // ==========================================
    // SWAP LEDGER
    // ==========================================

    /// Prepare `new_swap` for the user's next free slot.
    ///
    /// Two swaps prepared from the same sequence race; the one that lands
    /// second fails on chain with `SEQUENCE_MISMATCH`.
    pub async fn open_swap(&self, authority: &str) -> Result<PreparedTransactionResponse> {
        let authority = parse_pubkey(authority).map_err(SwapServiceError::InvalidRequest)?;

        let user = self
            .solana
            .get_user_account(&authority)
            .await
            .map_err(SwapServiceError::Solana)?
            .ok_or_else(|| SwapServiceError::UserNotFound(authority.to_string()))?;
        let index = user.next_sequence();

        let (swap_account, _) = pda::derive_swap(self.builder.program_id(), &authority, index);
        queries::upsert_swap(
            self.db.pool(),
            &SwapRecord::pending(authority.to_string(), index, swap_account.to_string()),
        )
        .await?;

        let ix = self.builder.new_swap(&self.submitter.admin_pubkey(), &authority, index);
        self.prepare(ix, authority, Some(index), "new_swap", swap_account).await
    }

    /// Prepare `initiate_swap`.
    pub async fn initiate_swap(&self, req: &InitiateSwapRequest) -> Result<PreparedTransactionResponse> {
        let authority = parse_pubkey(&req.authority).map_err(SwapServiceError::InvalidRequest)?;
        let terms = parse_terms(req, |kind| *self.solana.mint(kind))?;

        let swap = self.load_swap(&authority, req.sequence_index).await?;
        check_initiatable(&swap)?;

        let (swap_account, _) = pda::derive_swap(self.builder.program_id(), &authority, req.sequence_index);
        let ix = self.builder.initiate_swap(
            &self.submitter.admin_pubkey(),
            &authority,
            &terms,
            req.sequence_index,
        );

        self.prepare(ix, authority, Some(req.sequence_index), "initiate_swap", swap_account).await
    }

    /// Prepare `complete_swap` carrying the operator's attestation.
    pub async fn complete_swap(&self, req: &CompleteSwapRequest) -> Result<PreparedTransactionResponse> {
        let authority = parse_pubkey(&req.authority).map_err(SwapServiceError::InvalidRequest)?;

        let swap = self.load_swap(&authority, req.sequence_index).await?;
        let bound = check_completable(&swap, req.amount)?;
        if bound.mint != *self.solana.mint(bound.stablecoin) {
            warn!(
                "Swap {}#{} is bound to {} mint {}, not the configured one",
                authority, req.sequence_index, bound.stablecoin, bound.mint
            );
        }

        if req.success {
            info!("Attesting fiat success for {}#{}", authority, req.sequence_index);
        } else {
            warn!("Attesting fiat failure for {}#{}", authority, req.sequence_index);
        }

        let (swap_account, _) = pda::derive_swap(self.builder.program_id(), &authority, req.sequence_index);
        let ix = self.builder.complete_swap(
            &self.submitter.admin_pubkey(),
            &authority,
            &bound,
            req.success,
            req.sequence_index,
        );

        self.prepare(ix, authority, Some(req.sequence_index), "complete_swap", swap_account).await
    }

    /// Swap from chain, or the pending index entry if not yet claimed.
    ///
    /// Settled and rejected swaps are final and served from the index.
    pub async fn get_swap(&self, authority: &str, index: u64) -> Result<SwapResponse> {
        let authority = parse_pubkey(authority).map_err(SwapServiceError::InvalidRequest)?;
        let indexed = queries::get_swap(self.db.pool(), &authority.to_string(), index as i64).await?;

        if let Some(record) = indexed.as_ref().filter(|r| !r.is_open()) {
            return Ok(SwapResponse::from(record));
        }

        if let Some(record) = refresh_swap(&self.db, &self.solana, &authority, index).await? {
            return Ok(SwapResponse::from(&record));
        }

        match indexed {
            Some(record) => Ok(SwapResponse::from(&record)),
            None => Err(SwapServiceError::SwapNotFound(format!("{}#{}", authority, index))),
        }
    }

    /// Indexed swaps of `authority`, newest first.
    pub async fn list_swaps(&self, authority: &str, limit: i64, offset: i64) -> Result<SwapListResponse> {
        let authority = parse_pubkey(authority).map_err(SwapServiceError::InvalidRequest)?.to_string();
        let swaps = queries::list_swaps_by_authority(self.db.pool(), &authority, limit, offset).await?;

        Ok(SwapListResponse {
            authority,
            swaps: swaps.iter().map(SwapResponse::from).collect(),
            limit,
            offset,
        })
    }

    // ==========================================
    // SUBMISSION
    // ==========================================

    /// Submit a prepared transaction the authority has signed.
    ///
    /// The fee payer must be the authority the transaction was prepared for.
    /// Every signature must be present; the program re-checks the rest.
    pub async fn submit_transaction(&self, req: &SubmitTransactionRequest) -> Result<SubmitTransactionResponse> {
        let record = queries::get_transaction(self.db.pool(), req.transaction_id)
            .await?
            .ok_or(SwapServiceError::TransactionNotFound(req.transaction_id))?;
        if record.status != TransactionStatus::AwaitingSignature.as_str() {
            return Err(SwapServiceError::TransactionAlreadyProcessed(record.id));
        }

        let authority = parse_pubkey(&record.authority).map_err(SwapServiceError::InvalidRequest)?;
        let tx = decode_transaction(&req.signed_transaction)?;
        if tx.message.account_keys.first() != Some(&authority) {
            return Err(SwapServiceError::TransactionTampered);
        }

        match self.submitter.submit(tx).await {
            Ok(signature) => {
                queries::update_transaction_status(
                    self.db.pool(),
                    record.id,
                    TransactionStatus::Confirmed,
                    Some(&signature),
                    None,
                )
                .await?;

                self.refresh_after(&record, &authority).await;

                Ok(SubmitTransactionResponse {
                    transaction_id: record.id,
                    signature,
                    status: TransactionStatus::Confirmed.as_str().to_string(),
                })
            }
            Err(e) => {
                let code = match &e {
                    TransactionSubmitterError::ProgramError { code, .. } => Some(code.api_code()),
                    _ => None,
                };
                queries::update_transaction_status(
                    self.db.pool(),
                    record.id,
                    TransactionStatus::Failed,
                    None,
                    code,
                )
                .await?;
                Err(e.into())
            }
        }
    }

    /// Best-effort index refresh once a transaction has landed.
    async fn refresh_after(&self, record: &SwapTransactionRecord, authority: &Pubkey) {
        if let Err(e) = refresh_user(&self.db, &self.solana, authority).await {
            warn!("Failed to refresh user {}: {}", authority, e);
        }
        if let Some(index) = record.sequence_index {
            if let Err(e) = refresh_swap(&self.db, &self.solana, authority, index as u64).await {
                warn!("Failed to refresh swap {}#{}: {}", authority, index, e);
            }
        }
    }

    // ==========================================
    // HELPERS
    // ==========================================

    async fn load_swap(&self, authority: &Pubkey, index: u64) -> Result<SwapAccountData> {
        self.solana
            .get_swap_account(authority, index)
            .await
            .map_err(SwapServiceError::Solana)?
            .ok_or_else(|| SwapServiceError::SwapNotFound(format!("{}#{}", authority, index)))
    }

    /// Wrap, co-sign and record an instruction paid for by `authority`.
    async fn prepare(
        &self,
        instruction: Instruction,
        authority: Pubkey,
        sequence_index: Option<u64>,
        name: &str,
        account: Pubkey,
    ) -> Result<PreparedTransactionResponse> {
        let blockhash = self.solana.get_recent_blockhash().await.map_err(SwapServiceError::Solana)?;
        let mut tx = build_transaction(instruction, &authority, blockhash);
        self.submitter.co_sign(&mut tx)?;

        let record = SwapTransactionRecord::awaiting(authority.to_string(), sequence_index, name);
        let transaction_id = queries::create_transaction(self.db.pool(), &record).await?;
        info!("Prepared {} for {} ({})", name, authority, transaction_id);

        Ok(PreparedTransactionResponse {
            transaction_id,
            instruction: name.to_string(),
            authority: authority.to_string(),
            sequence_index,
            account: account.to_string(),
            partially_signed_transaction: encode_transaction(&tx)?,
            message: SIGN_AND_SUBMIT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::layout::UserAccountData;
    use chrono::Utc;

    fn request(amount: u64) -> InitiateSwapRequest {
        InitiateSwapRequest {
            authority: Pubkey::new_unique().to_string(),
            sequence_index: 1,
            stablecoin: "usdc".into(),
            fiat_currency: "GHS".into(),
            tx_kind: "onramp".into(),
            amount,
        }
    }

    fn swap(status: SwapStatus, amount: Option<u64>) -> SwapAccountData {
        SwapAccountData {
            authority: Pubkey::new_unique(),
            sequence_index: 1,
            status,
            terms: amount.map(|amount| SwapTermsData {
                stablecoin: StablecoinKind::Usdt,
                fiat: FiatCurrency::Usd,
                tx_kind: TransactionKind::Offramp,
                amount,
                mint: Pubkey::new_from_array([3; 32]),
            }),
            created_at: Utc::now(),
            initiated_at: None,
            completed_at: None,
            settled: false,
            bump: 254,
        }
    }

    #[test]
    fn test_parse_terms() {
        let usdc_mint = Pubkey::new_unique();
        let mint_of = |kind: StablecoinKind| match kind {
            StablecoinKind::Usdc => usdc_mint,
            StablecoinKind::Usdt => Pubkey::default(),
        };
        let terms = parse_terms(&request(10), mint_of).unwrap();
        assert_eq!(terms.mint, usdc_mint);
        assert_eq!(terms.stablecoin, StablecoinKind::Usdc);
        assert_eq!(terms.fiat, FiatCurrency::Ghs);
        assert_eq!(terms.tx_kind, TransactionKind::Onramp);

        assert!(matches!(parse_terms(&request(0), mint_of), Err(SwapServiceError::InvalidAmount)));

        let mut bad = request(10);
        bad.stablecoin = "DAI".into();
        assert!(matches!(parse_terms(&bad, mint_of), Err(SwapServiceError::InvalidRequest(_))));
    }

    #[test]
    fn test_initiate_requires_created() {
        assert!(check_initiatable(&swap(SwapStatus::Created, None)).is_ok());
        assert!(matches!(
            check_initiatable(&swap(SwapStatus::Initiated, Some(5))),
            Err(SwapServiceError::StateMismatch { actual: SwapStatus::Initiated, .. })
        ));
    }

    #[test]
    fn test_indexed_user_blocks_registration() {
        let authority = Pubkey::new_unique();
        assert!(ensure_unregistered(None, &authority).is_ok());

        let chain = UserAccountData {
            authority,
            swap_sequence: 2,
            total_settled_value: 0,
            created_at: Utc::now(),
            bump: 251,
        };
        let row = BridgeUserRecord::from_chain(Pubkey::new_unique().to_string(), &chain);
        assert!(matches!(
            ensure_unregistered(Some(&row), &authority),
            Err(SwapServiceError::UserAlreadyExists(key)) if key == authority.to_string()
        ));
    }

    #[test]
    fn test_complete_requires_initiated_and_amount() {
        let bound = check_completable(&swap(SwapStatus::Initiated, Some(5)), 5).unwrap();
        assert_eq!(bound.stablecoin, StablecoinKind::Usdt);
        assert_eq!(bound.mint, Pubkey::new_from_array([3; 32]));
        assert!(matches!(
            check_completable(&swap(SwapStatus::Initiated, Some(5)), 6),
            Err(SwapServiceError::AmountMismatch { expected: 5, actual: 6 })
        ));
        assert!(matches!(
            check_completable(&swap(SwapStatus::Created, None), 5),
            Err(SwapServiceError::StateMismatch { expected: SwapStatus::Initiated, .. })
        ));
        assert!(matches!(
            check_completable(&swap(SwapStatus::Settled, Some(5)), 5),
            Err(SwapServiceError::StateMismatch { actual: SwapStatus::Settled, .. })
        ));
    }
}
