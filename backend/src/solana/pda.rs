//! # Address Derivation
//!
//! Mirrors the program's seed scheme so the backend can compute every
//! account an instruction needs.
//!
//! | Account | Seeds |
//! |---------|-------|
//! | USDC vault | `["usdc-vault", mint]` |
//! | USDT vault | `["usdt-vault", mint]` |
//! | User record | `["user-account", authority]` |
//! | Swap record | `["swap-account", authority, decimal(index)]` |

use solana_sdk::pubkey::Pubkey;

use super::layout::StablecoinKind;

pub const USDC_VAULT_SEED: &[u8] = b"usdc-vault";
pub const USDT_VAULT_SEED: &[u8] = b"usdt-vault";
pub const USER_ACCOUNT_SEED: &[u8] = b"user-account";
pub const SWAP_ACCOUNT_SEED: &[u8] = b"swap-account";

fn vault_seed(kind: StablecoinKind) -> &'static [u8] {
    match kind {
        StablecoinKind::Usdc => USDC_VAULT_SEED,
        StablecoinKind::Usdt => USDT_VAULT_SEED,
    }
}

/// Canonical decimal form of a sequence index, as used in swap seeds.
pub fn sequence_seed(index: u64) -> String {
    index.to_string()
}

pub fn derive_vault(program_id: &Pubkey, kind: StablecoinKind, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[vault_seed(kind), mint.as_ref()], program_id)
}

pub fn derive_user(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[USER_ACCOUNT_SEED, authority.as_ref()], program_id)
}

pub fn derive_swap(program_id: &Pubkey, authority: &Pubkey, index: u64) -> (Pubkey, u8) {
    let seed = sequence_seed(index);
    Pubkey::find_program_address(
        &[SWAP_ACCOUNT_SEED, authority.as_ref(), seed.as_bytes()],
        program_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();

        assert_eq!(
            derive_user(&program_id, &authority),
            derive_user(&program_id, &authority)
        );
        assert_eq!(
            derive_swap(&program_id, &authority, 7),
            derive_swap(&program_id, &authority, 7)
        );
    }

    #[test]
    fn test_swap_addresses_are_distinct_per_index_and_user() {
        let program_id = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        let (a1, _) = derive_swap(&program_id, &alice, 1);
        let (a2, _) = derive_swap(&program_id, &alice, 2);
        let (b1, _) = derive_swap(&program_id, &bob, 1);

        assert_ne!(a1, a2);
        assert_ne!(a1, b1);
    }

    #[test]
    fn test_vaults_differ_by_kind() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let (usdc, _) = derive_vault(&program_id, StablecoinKind::Usdc, &mint);
        let (usdt, _) = derive_vault(&program_id, StablecoinKind::Usdt, &mint);
        assert_ne!(usdc, usdt);
    }

    #[test]
    fn test_derived_addresses_are_off_curve() {
        let program_id = Pubkey::new_unique();
        let (user, _) = derive_user(&program_id, &Pubkey::new_unique());
        assert!(!user.is_on_curve());
    }

    #[test]
    fn test_sequence_seed_is_canonical_decimal() {
        assert_eq!(sequence_seed(1), "1");
        assert_eq!(sequence_seed(10), "10");
        assert_eq!(sequence_seed(u64::MAX), "18446744073709551615");
    }
}
