//! # Solana Client Module
//!
//! A client for reading the bridge program's state from Solana RPC.
//!
//! ## Responsibilities
//!
//! - Connect to Solana RPC (with retry and timeout)
//! - Fetch and decode user and swap records
//! - Read vault custody balances
//!
//! ## Account Data Flow
//!
//! ```text
//! 1. Service asks for a swap (authority, index)
//!              ↓
//! 2. pda::derive_swap() computes the address
//!              ↓
//! 3. RPC returns raw account bytes (or nothing)
//!              ↓
//! 4. layout::SwapAccountData::decode() checks the discriminator
//!              ↓
//! 5. Typed SwapAccountData
//! ```

pub mod layout;
pub mod pda;
pub mod program_error;

use std::str::FromStr;
use std::time::Duration;

use actix_web::web;
use solana_client::client_error::Result as ClientResult;
use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use layout::{StablecoinKind, SwapAccountData, UserAccountData};

/// Custody vault as seen on chain.
#[derive(Debug, Clone)]
pub struct VaultState {
    pub kind: StablecoinKind,
    pub address: Pubkey,
    pub mint: Pubkey,

    /// `None` until `initialize` has created the vault.
    pub balance: Option<u64>,
}

/// Solana RPC client wrapper for the bridge program.
///
/// ## Usage
///
/// ```rust,ignore
/// let client = SolanaClient::new(&config)?;
///
/// if let Some(user) = client.get_user_account(&authority).await? {
///     println!("next slot: {}", user.next_sequence());
/// }
/// ```
#[derive(Clone)]
pub struct SolanaClient {
    rpc_url: String,
    program_id: Pubkey,
    usdc_mint: Pubkey,
    usdt_mint: Pubkey,
}

impl SolanaClient {
    /// Create a new SolanaClient.
    ///
    /// ## Returns
    ///
    /// * `Ok(SolanaClient)` - Client created successfully
    /// * `Err(...)` - An address in the configuration is invalid
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        let program_id = Pubkey::from_str(&config.bridge_program_id)
            .map_err(|e| format!("Invalid program ID: {}", e))?;
        let usdc_mint = Pubkey::from_str(&config.usdc_mint)
            .map_err(|e| format!("Invalid USDC mint: {}", e))?;
        let usdt_mint = Pubkey::from_str(&config.usdt_mint)
            .map_err(|e| format!("Invalid USDT mint: {}", e))?;

        info!("Solana client initialized:");
        info!("  RPC: {}", config.solana_rpc_url);
        info!("  Program: {}", program_id);
        info!("  USDC Mint: {}", usdc_mint);
        info!("  USDT Mint: {}", usdt_mint);

        Ok(Self {
            rpc_url: config.solana_rpc_url.clone(),
            program_id,
            usdc_mint,
            usdt_mint,
        })
    }

    /// Execute an RPC operation with retry logic.
    ///
    /// Up to 4 attempts (initial + 3 retries) with exponential backoff and a
    /// 10-second timeout per attempt.
    async fn retry_rpc_operation<F, Fut, T>(&self, mut operation: F) -> Result<T, String>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, String>>,
    {
        const MAX_RETRIES: u32 = 3;
        const INITIAL_DELAY_MS: u64 = 200;
        const TIMEOUT_SECS: u64 = 10;

        let mut last_error = String::from("RPC operation failed after all retries");

        for attempt in 0..=MAX_RETRIES {
            match timeout(Duration::from_secs(TIMEOUT_SECS), operation()).await {
                Ok(Ok(result)) => {
                    if attempt > 0 {
                        info!("RPC operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Ok(Err(e)) => {
                    debug!("RPC operation failed (attempt {}): {}", attempt + 1, e);
                    last_error = e;
                }
                Err(_) => {
                    debug!("RPC operation timed out (attempt {})", attempt + 1);
                    last_error = format!(
                        "RPC operation timed out after {} attempts ({}s timeout)",
                        attempt + 1,
                        TIMEOUT_SECS
                    );
                }
            }

            if attempt < MAX_RETRIES {
                let delay_ms = INITIAL_DELAY_MS * (1 << attempt); // 200ms, 400ms, 800ms
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        warn!("RPC operation failed after {} attempts: {}", MAX_RETRIES + 1, last_error);
        Err(last_error)
    }

    /// Run one blocking `RpcClient` call on the blocking pool, with retry.
    async fn call<T, F>(&self, what: &'static str, f: F) -> Result<T, String>
    where
        F: Fn(&RpcClient) -> ClientResult<T> + Clone + Send + 'static,
        T: Send + 'static,
    {
        let rpc_url = self.rpc_url.clone();
        self.retry_rpc_operation(|| {
            let rpc_url = rpc_url.clone();
            let f = f.clone();
            async move {
                let client = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed());
                web::block(move || f(&client))
                    .await
                    .map_err(|e| format!("Failed to execute blocking task: {}", e))?
                    .map_err(|e| format!("Failed to {}: {}", what, e))
            }
        })
        .await
    }

    /// Check if the Solana RPC is healthy.
    ///
    /// ## Returns
    ///
    /// * `Ok(true)` - RPC is responding
    /// * `Ok(false)` - RPC did not answer within 5 seconds
    pub async fn get_health(&self) -> Result<bool, String> {
        match timeout(Duration::from_secs(5), self.get_slot()).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                warn!("Solana RPC health check failed: {}", e);
                Ok(false)
            }
            Err(_) => {
                warn!("Solana RPC health check timed out");
                Ok(false)
            }
        }
    }

    /// Get the current slot.
    pub async fn get_slot(&self) -> Result<u64, String> {
        self.call("get slot", |client| client.get_slot()).await
    }

    /// Get a recent blockhash. Blockhashes expire after about 2 minutes.
    pub async fn get_recent_blockhash(&self) -> Result<Hash, String> {
        let blockhash = self
            .call("get blockhash", |client| client.get_latest_blockhash())
            .await?;
        debug!("Got recent blockhash: {}", blockhash);
        Ok(blockhash)
    }

    /// Fetch raw account data.
    ///
    /// ## Returns
    ///
    /// * `Ok(Some(data))` - Account exists
    /// * `Ok(None)` - Nothing at this address
    pub async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, String> {
        let address = *address;
        let response = self
            .call("fetch account", move |client| {
                client.get_account_with_commitment(&address, CommitmentConfig::confirmed())
            })
            .await?;

        Ok(response.value.map(|account| account.data))
    }

    /// Fetch and decode the user record of `authority`.
    pub async fn get_user_account(
        &self,
        authority: &Pubkey,
    ) -> Result<Option<UserAccountData>, String> {
        let (address, _) = pda::derive_user(&self.program_id, authority);
        debug!("Fetching user record {} for {}", address, authority);

        match self.get_account_data(&address).await? {
            Some(data) => UserAccountData::decode(&data)
                .map(Some)
                .map_err(|e| format!("Failed to decode user record {}: {}", address, e)),
            None => Ok(None),
        }
    }

    /// Fetch and decode swap `index` of `authority`.
    pub async fn get_swap_account(
        &self,
        authority: &Pubkey,
        index: u64,
    ) -> Result<Option<SwapAccountData>, String> {
        let (address, _) = pda::derive_swap(&self.program_id, authority, index);
        debug!("Fetching swap {} ({}#{})", address, authority, index);

        match self.get_account_data(&address).await? {
            Some(data) => SwapAccountData::decode(&data)
                .map(Some)
                .map_err(|e| format!("Failed to decode swap {}: {}", address, e)),
            None => Ok(None),
        }
    }

    /// Read one custody vault.
    pub async fn get_vault(&self, kind: StablecoinKind) -> Result<VaultState, String> {
        let mint = *self.mint(kind);
        let (address, _) = pda::derive_vault(&self.program_id, kind, &mint);

        let balance = match self.get_account_data(&address).await? {
            Some(_) => Some(self.get_token_balance(&address).await?),
            None => None,
        };

        Ok(VaultState {
            kind,
            address,
            mint,
            balance,
        })
    }

    /// SPL token balance of a token account, in smallest units.
    pub async fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64, String> {
        let token_account = *token_account;
        let balance = self
            .call("get token balance", move |client| {
                client.get_token_account_balance(&token_account)
            })
            .await?;

        balance
            .amount
            .parse::<u64>()
            .map_err(|e| format!("Invalid balance amount: {}", e))
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Configured mint for a stablecoin.
    pub fn mint(&self, kind: StablecoinKind) -> &Pubkey {
        match kind {
            StablecoinKind::Usdc => &self.usdc_mint,
            StablecoinKind::Usdt => &self.usdt_mint,
        }
    }
}
