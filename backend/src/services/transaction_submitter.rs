//! # Transaction Submitter Service
//!
//! Holds the operator (admin) keypair. Every bridge instruction except
//! `initialize` must be signed by both the admin and the authority, so the
//! backend signs its half here and submits once the authority has signed.

use std::fs;
use std::sync::Arc;

use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::solana::program_error::ProgramError;

/// Errors that can occur when signing or submitting transactions.
#[derive(Debug, thiserror::Error)]
pub enum TransactionSubmitterError {
    #[error("Failed to load keypair: {0}")]
    KeypairError(String),

    #[error("Failed to sign transaction: {0}")]
    SigningError(String),

    /// A required signature is still missing.
    #[error("Transaction is not fully signed")]
    NotFullySigned,

    /// The bridge program rejected the transaction.
    #[error("Program error {code:?}: {message}")]
    ProgramError { code: ProgramError, message: String },

    #[error("RPC error: {0}")]
    RpcError(String),
}

/// Load a Solana CLI keypair file (JSON array of 64 bytes).
///
/// `~` and environment variables in the path are expanded.
pub fn load_keypair(path: &str) -> Result<Keypair, TransactionSubmitterError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| TransactionSubmitterError::KeypairError(format!("Invalid path: {}", e)))?;

    let contents = fs::read_to_string(expanded.as_ref())
        .map_err(|e| TransactionSubmitterError::KeypairError(format!("Failed to read keypair: {}", e)))?;

    let bytes: Vec<u8> = serde_json::from_str(&contents)
        .map_err(|e| TransactionSubmitterError::KeypairError(format!("Failed to parse keypair: {}", e)))?;

    Keypair::from_bytes(&bytes)
        .map_err(|e| TransactionSubmitterError::KeypairError(format!("Invalid keypair bytes: {}", e)))
}

/// Signs as admin and submits transactions.
#[derive(Clone)]
pub struct TransactionSubmitter {
    rpc_url: String,
    admin: Arc<Keypair>,
}

impl TransactionSubmitter {
    /// Load the admin keypair from `ADMIN_KEYPAIR_PATH`.
    pub fn new(config: &AppConfig) -> Result<Self, TransactionSubmitterError> {
        let admin = load_keypair(&config.admin_keypair_path)?;
        info!("Admin keypair loaded: {}", admin.pubkey());

        Ok(Self::with_keypair(config.solana_rpc_url.clone(), admin))
    }

    pub fn with_keypair(rpc_url: String, admin: Keypair) -> Self {
        Self {
            rpc_url,
            admin: Arc::new(admin),
        }
    }

    pub fn admin_pubkey(&self) -> Pubkey {
        self.admin.pubkey()
    }

    /// Add the admin signature, leaving the authority's slot empty.
    ///
    /// Fails if the admin is not a required signer of the transaction.
    pub fn co_sign(&self, transaction: &mut Transaction) -> Result<(), TransactionSubmitterError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[self.admin.as_ref()], blockhash)
            .map_err(|e| TransactionSubmitterError::SigningError(e.to_string()))
    }

    /// Sign as admin (the only signer) and submit.
    pub async fn sign_and_submit(
        &self,
        mut transaction: Transaction,
    ) -> Result<String, TransactionSubmitterError> {
        self.co_sign(&mut transaction)?;
        self.submit(transaction).await
    }

    /// Submit a transaction that already carries every required signature.
    ///
    /// Uses `send_and_confirm_transaction` on the blocking pool.
    ///
    /// ## Returns
    ///
    /// Transaction signature (base58) if the transaction landed.
    pub async fn submit(&self, transaction: Transaction) -> Result<String, TransactionSubmitterError> {
        if !transaction.is_signed() {
            return Err(TransactionSubmitterError::NotFullySigned);
        }

        info!("Submitting transaction...");

        let rpc_url = self.rpc_url.clone();
        let result = tokio::task::spawn_blocking(move || {
            let client = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed());
            client.send_and_confirm_transaction(&transaction)
        })
        .await
        .map_err(|e| TransactionSubmitterError::RpcError(format!("Blocking task failed: {}", e)))?;

        match result {
            Ok(signature) => {
                info!("✅ Transaction submitted: {}", signature);
                Ok(signature.to_string())
            }
            Err(e) => {
                let message = e.to_string();
                error!("Transaction failed: {}", message);
                match ProgramError::from_rpc_message(&message) {
                    Some(code) => Err(TransactionSubmitterError::ProgramError { code, message }),
                    None => Err(TransactionSubmitterError::RpcError(message)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::message::Message;

    fn two_signer_tx(admin: &Pubkey, authority: &Pubkey) -> Transaction {
        let ix = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![
                AccountMeta::new_readonly(*admin, true),
                AccountMeta::new(*authority, true),
            ],
            data: vec![],
        };
        let mut tx = Transaction::new_unsigned(Message::new(&[ix], Some(authority)));
        tx.message.recent_blockhash = Hash::new_unique();
        tx
    }

    #[test]
    fn test_co_sign_leaves_authority_slot_empty() {
        let submitter = TransactionSubmitter::with_keypair("http://localhost:8899".into(), Keypair::new());
        let authority = Keypair::new();
        let mut tx = two_signer_tx(&submitter.admin_pubkey(), &authority.pubkey());

        submitter.co_sign(&mut tx).unwrap();
        assert!(!tx.is_signed());

        tx.try_partial_sign(&[&authority], tx.message.recent_blockhash).unwrap();
        assert!(tx.is_signed());
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_co_sign_rejects_foreign_transaction() {
        let submitter = TransactionSubmitter::with_keypair("http://localhost:8899".into(), Keypair::new());
        let mut tx = two_signer_tx(&Pubkey::new_unique(), &Pubkey::new_unique());

        assert!(matches!(
            submitter.co_sign(&mut tx),
            Err(TransactionSubmitterError::SigningError(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_requires_every_signature() {
        let submitter = TransactionSubmitter::with_keypair("http://localhost:8899".into(), Keypair::new());
        let tx = two_signer_tx(&submitter.admin_pubkey(), &Pubkey::new_unique());

        assert!(matches!(
            submitter.submit(tx).await,
            Err(TransactionSubmitterError::NotFullySigned)
        ));
    }

    #[test]
    fn test_load_keypair_from_file() {
        let keypair = Keypair::new();
        let path = std::env::temp_dir().join(format!("bridge-admin-{}.json", keypair.pubkey()));
        fs::write(&path, serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap()).unwrap();

        let loaded = load_keypair(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());

        fs::remove_file(&path).ok();
        assert!(load_keypair("/nonexistent/admin.json").is_err());
    }
}
