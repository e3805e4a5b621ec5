//! # Transaction Builder Service
//!
//! Builds the bridge program's instructions and wraps them in transactions.
//!
//! ## Transaction Structure
//!
//! ```text
//! Transaction
//! ├── Recent Blockhash (for expiration)
//! ├── Fee Payer (the authority, or the admin for `initialize`)
//! └── Instructions[]
//!     └── Bridge Instruction
//!         ├── Program ID
//!         ├── Accounts[] (same order as the program's account structs)
//!         └── Data = discriminator ++ borsh(args)
//! ```
//!
//! ## Co-signed Flow
//!
//! ```text
//! 1. Backend builds the transaction and signs it as admin
//!              ↓
//! 2. Partially signed transaction goes to the client (base64)
//!              ↓
//! 3. Authority signs with their wallet
//!              ↓
//! 4. Client posts it back, backend submits it
//! ```
//!
//! The authority's private key never leaves their wallet.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    system_program,
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;

use crate::solana::layout::{instruction_discriminator, StablecoinKind, SwapTermsData};
use crate::solana::pda;
use crate::solana::SolanaClient;

/// Errors that can occur when building transactions.
#[derive(Debug, thiserror::Error)]
pub enum TransactionBuilderError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Failed to decode transaction: {0}")]
    DecodeError(String),
}

/// Builds instructions for the bridge program.
///
/// Holds only addresses, so it is cheap to clone and needs no RPC access.
#[derive(Clone)]
pub struct TransactionBuilder {
    program_id: Pubkey,
    usdc_mint: Pubkey,
    usdt_mint: Pubkey,
}

impl TransactionBuilder {
    pub fn new(solana: &SolanaClient) -> Self {
        Self {
            program_id: *solana.program_id(),
            usdc_mint: *solana.mint(StablecoinKind::Usdc),
            usdt_mint: *solana.mint(StablecoinKind::Usdt),
        }
    }

    /// Build an `initialize` instruction.
    ///
    /// ## Accounts Required
    ///
    /// 1. Admin as payer (signer, writable)
    /// 2. USDC mint
    /// 3. USDT mint
    /// 4. USDC vault PDA (writable, created)
    /// 5. USDT vault PDA (writable, created)
    /// 6. System Program
    /// 7. Token Program
    pub fn initialize(&self, admin: &Pubkey) -> Instruction {
        let (usdc_vault, _) = pda::derive_vault(&self.program_id, StablecoinKind::Usdc, &self.usdc_mint);
        let (usdt_vault, _) = pda::derive_vault(&self.program_id, StablecoinKind::Usdt, &self.usdt_mint);

        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new_readonly(self.usdc_mint, false),
                AccountMeta::new_readonly(self.usdt_mint, false),
                AccountMeta::new(usdc_vault, false),
                AccountMeta::new(usdt_vault, false),
                AccountMeta::new_readonly(system_program::ID, false),
                AccountMeta::new_readonly(spl_token::ID, false),
            ],
            data: instruction_discriminator("initialize").to_vec(),
        }
    }

    /// Build a `new_user` instruction. The authority pays for the record.
    pub fn new_user(&self, admin: &Pubkey, authority: &Pubkey) -> Instruction {
        let (user_account, _) = pda::derive_user(&self.program_id, authority);

        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(*admin, true),
                AccountMeta::new(*authority, true),
                AccountMeta::new(user_account, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data: instruction_discriminator("new_user").to_vec(),
        }
    }

    /// Build a `new_swap` instruction claiming slot `index`.
    pub fn new_swap(&self, admin: &Pubkey, authority: &Pubkey, index: u64) -> Instruction {
        let (user_account, _) = pda::derive_user(&self.program_id, authority);
        let (swap_account, _) = pda::derive_swap(&self.program_id, authority, index);

        let mut data = instruction_discriminator("new_swap").to_vec();
        encode_string(&mut data, &pda::sequence_seed(index));

        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(*admin, true),
                AccountMeta::new(*authority, true),
                AccountMeta::new(user_account, false),
                AccountMeta::new(swap_account, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data,
        }
    }

    /// Build an `initiate_swap` instruction binding `terms` to swap `index`.
    ///
    /// Custody accounts are derived from `terms.mint`.
    ///
    /// ## Accounts Required
    ///
    /// 1. Admin (signer)
    /// 2. Authority (signer)
    /// 3. Swap record (writable)
    /// 4. Stablecoin mint
    /// 5. Vault (writable)
    /// 6. Authority's associated token account (writable)
    /// 7. Token Program
    pub fn initiate_swap(
        &self,
        admin: &Pubkey,
        authority: &Pubkey,
        terms: &SwapTermsData,
        index: u64,
    ) -> Instruction {
        let mut data = instruction_discriminator("initiate_swap").to_vec();
        data.push(terms.stablecoin.index());
        data.extend_from_slice(&terms.amount.to_le_bytes());
        data.push(terms.fiat.index());
        data.push(terms.tx_kind.index());
        encode_string(&mut data, &pda::sequence_seed(index));

        Instruction {
            program_id: self.program_id,
            accounts: self.custody_accounts(admin, authority, terms, index, false),
            data,
        }
    }

    /// Build a `complete_swap` instruction for swap `index`.
    ///
    /// `bound` are the terms read from chain. The program refuses any mint
    /// other than the one bound at initiation, so the vault and token
    /// account are derived from `bound.mint`, not from configuration.
    pub fn complete_swap(
        &self,
        admin: &Pubkey,
        authority: &Pubkey,
        bound: &SwapTermsData,
        success: bool,
        index: u64,
    ) -> Instruction {
        let mut data = instruction_discriminator("complete_swap").to_vec();
        data.push(success as u8);
        data.extend_from_slice(&bound.amount.to_le_bytes());
        encode_string(&mut data, &pda::sequence_seed(index));

        Instruction {
            program_id: self.program_id,
            accounts: self.custody_accounts(admin, authority, bound, index, true),
            data,
        }
    }

    fn custody_accounts(
        &self,
        admin: &Pubkey,
        authority: &Pubkey,
        terms: &SwapTermsData,
        index: u64,
        with_user_account: bool,
    ) -> Vec<AccountMeta> {
        let mint = terms.mint;
        let (vault, _) = pda::derive_vault(&self.program_id, terms.stablecoin, &mint);
        let (swap_account, _) = pda::derive_swap(&self.program_id, authority, index);

        let mut accounts = vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new_readonly(*authority, true),
        ];
        if with_user_account {
            let (user_account, _) = pda::derive_user(&self.program_id, authority);
            accounts.push(AccountMeta::new(user_account, false));
        }
        accounts.extend([
            AccountMeta::new(swap_account, false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(get_associated_token_address(authority, &mint), false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ]);
        accounts
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }
}

/// Wrap one instruction in an unsigned transaction.
pub fn build_transaction(instruction: Instruction, fee_payer: &Pubkey, blockhash: Hash) -> Transaction {
    let message = Message::new(&[instruction], Some(fee_payer));
    let mut transaction = Transaction::new_unsigned(message);
    transaction.message.recent_blockhash = blockhash;
    transaction
}

/// Serialize a transaction to base64 (bincode wire format).
pub fn encode_transaction(transaction: &Transaction) -> Result<String, TransactionBuilderError> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| TransactionBuilderError::SerializationError(e.to_string()))?;
    Ok(BASE64.encode(bytes))
}

pub fn decode_transaction(encoded: &str) -> Result<Transaction, TransactionBuilderError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| TransactionBuilderError::DecodeError(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| TransactionBuilderError::DecodeError(e.to_string()))
}

/// Borsh string: u32 little-endian length, then the UTF-8 bytes.
fn encode_string(data: &mut Vec<u8>, value: &str) {
    data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    data.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::layout::{FiatCurrency, TransactionKind};

    fn builder() -> TransactionBuilder {
        TransactionBuilder {
            program_id: Pubkey::new_unique(),
            usdc_mint: Pubkey::new_unique(),
            usdt_mint: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_discriminators_match_program() {
        let b = builder();
        let admin = Pubkey::new_unique();
        let authority = Pubkey::new_unique();

        assert_eq!(b.initialize(&admin).data, vec![175, 175, 109, 31, 13, 152, 155, 237]);
        assert_eq!(b.new_user(&admin, &authority).data, vec![158, 132, 224, 219, 212, 163, 7, 0]);
        assert_eq!(
            instruction_discriminator("initiate_swap"),
            [162, 51, 28, 35, 157, 126, 169, 131]
        );
        assert_eq!(
            instruction_discriminator("complete_swap"),
            [23, 139, 223, 154, 218, 76, 29, 200]
        );
    }

    #[test]
    fn test_new_swap_encodes_decimal_index() {
        let b = builder();
        let ix = b.new_swap(&Pubkey::new_unique(), &Pubkey::new_unique(), 12);

        assert_eq!(&ix.data[8..12], &2u32.to_le_bytes());
        assert_eq!(&ix.data[12..], b"12");
        assert_eq!(ix.accounts.len(), 5);
        assert!(ix.accounts[0].is_signer && !ix.accounts[0].is_writable);
        assert!(ix.accounts[1].is_signer && ix.accounts[1].is_writable);
    }

    #[test]
    fn test_initiate_swap_argument_order() {
        let b = builder();
        let authority = Pubkey::new_unique();
        let terms = SwapTermsData {
            stablecoin: StablecoinKind::Usdt,
            fiat: FiatCurrency::Usd,
            tx_kind: TransactionKind::Offramp,
            amount: 5_000_000,
            mint: b.usdt_mint,
        };
        let ix = b.initiate_swap(&Pubkey::new_unique(), &authority, &terms, 3);

        let args = &ix.data[8..];
        assert_eq!(args[0], 1); // USDT
        assert_eq!(&args[1..9], &5_000_000u64.to_le_bytes());
        assert_eq!(args[9], 1); // USD
        assert_eq!(args[10], 1); // Offramp
        assert_eq!(&args[11..15], &1u32.to_le_bytes());
        assert_eq!(&args[15..], b"3");

        let (vault, _) = pda::derive_vault(&b.program_id, StablecoinKind::Usdt, &b.usdt_mint);
        assert_eq!(ix.accounts.len(), 7);
        assert_eq!(ix.accounts[3].pubkey, b.usdt_mint);
        assert_eq!(ix.accounts[4].pubkey, vault);
        assert_eq!(
            ix.accounts[5].pubkey,
            get_associated_token_address(&authority, &b.usdt_mint)
        );
    }

    #[test]
    fn test_complete_swap_includes_user_record() {
        let b = builder();
        let authority = Pubkey::new_unique();
        let bound = SwapTermsData {
            stablecoin: StablecoinKind::Usdc,
            fiat: FiatCurrency::Ghs,
            tx_kind: TransactionKind::Onramp,
            amount: 250,
            mint: b.usdc_mint,
        };
        let ix = b.complete_swap(&Pubkey::new_unique(), &authority, &bound, false, 1);

        assert_eq!(ix.data[8], 0);
        assert_eq!(&ix.data[9..17], &250u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 8);
        assert_eq!(ix.accounts[2].pubkey, pda::derive_user(&b.program_id, &authority).0);
        assert!(ix.accounts[2].is_writable);
    }

    #[test]
    fn test_complete_swap_uses_bound_mint() {
        let b = builder();
        let authority = Pubkey::new_unique();
        let legacy_mint = Pubkey::new_unique();
        let bound = SwapTermsData {
            stablecoin: StablecoinKind::Usdc,
            fiat: FiatCurrency::Usd,
            tx_kind: TransactionKind::Offramp,
            amount: 10,
            mint: legacy_mint,
        };
        let ix = b.complete_swap(&Pubkey::new_unique(), &authority, &bound, true, 2);

        let (vault, _) = pda::derive_vault(&b.program_id, StablecoinKind::Usdc, &legacy_mint);
        assert_eq!(ix.accounts[4].pubkey, legacy_mint);
        assert_eq!(ix.accounts[5].pubkey, vault);
        assert_eq!(
            ix.accounts[6].pubkey,
            get_associated_token_address(&authority, &legacy_mint)
        );
    }

    #[test]
    fn test_transaction_base64_roundtrip_keeps_fee_payer() {
        let b = builder();
        let admin = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let tx = build_transaction(b.new_user(&admin, &authority), &authority, Hash::new_unique());

        let decoded = decode_transaction(&encode_transaction(&tx).unwrap()).unwrap();
        assert_eq!(decoded.message.account_keys[0], authority);
        assert_eq!(decoded.message.header.num_required_signatures, 2);
        assert_eq!(decoded.message.recent_blockhash, tx.message.recent_blockhash);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_transaction("not base64!").is_err());
    }
}
