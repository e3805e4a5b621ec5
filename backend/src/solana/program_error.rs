//! Maps the program's custom error codes back to names.
//!
//! A failed transaction surfaces as an RPC error whose text contains
//! `custom program error: 0x1772`. The API reports the decoded name so
//! clients can branch on it (e.g. re-read the sequence on `SEQUENCE_MISMATCH`).

/// Bridge program error, by Anchor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramError {
    InvalidAmount,
    UnsupportedPair,
    DuplicateMint,
    InsufficientFunds,
    VaultMismatch,
    TokenAccountMismatch,
    Unauthorized,
    AlreadyInitialized,
    AlreadyExists,
    SequenceMismatch,
    StateMismatch,
    AmountMismatch,
    AddressSpaceExhausted,
    UserAccountMismatch,
    Overflow,
}

impl ProgramError {
    pub fn from_code(code: u32) -> Option<Self> {
        let error = match code {
            6000 => Self::InvalidAmount,
            6001 => Self::UnsupportedPair,
            6002 => Self::DuplicateMint,
            6010 => Self::InsufficientFunds,
            6011 => Self::VaultMismatch,
            6012 => Self::TokenAccountMismatch,
            6020 => Self::Unauthorized,
            6030 => Self::AlreadyInitialized,
            6031 => Self::AlreadyExists,
            6032 => Self::SequenceMismatch,
            6033 => Self::StateMismatch,
            6034 => Self::AmountMismatch,
            6035 => Self::AddressSpaceExhausted,
            6036 => Self::UserAccountMismatch,
            6040 => Self::Overflow,
            _ => return None,
        };
        Some(error)
    }

    /// Find a bridge error code in an RPC error message.
    pub fn from_rpc_message(message: &str) -> Option<Self> {
        const MARKER: &str = "custom program error: 0x";

        let start = message.find(MARKER)? + MARKER.len();
        let hex: String = message[start..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        let code = u32::from_str_radix(&hex, 16).ok()?;
        Self::from_code(code)
    }

    /// Stable API error code.
    pub fn api_code(self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::UnsupportedPair => "UNSUPPORTED_PAIR",
            Self::DuplicateMint => "DUPLICATE_MINT",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::VaultMismatch => "VAULT_MISMATCH",
            Self::TokenAccountMismatch => "TOKEN_ACCOUNT_MISMATCH",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::SequenceMismatch => "SEQUENCE_MISMATCH",
            Self::StateMismatch => "STATE_MISMATCH",
            Self::AmountMismatch => "AMOUNT_MISMATCH",
            Self::AddressSpaceExhausted => "ADDRESS_SPACE_EXHAUSTED",
            Self::UserAccountMismatch => "USER_ACCOUNT_MISMATCH",
            Self::Overflow => "OVERFLOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rpc_message() {
        let message = "RPC response error -32002: Transaction simulation failed: \
                       Error processing Instruction 0: custom program error: 0x1790";
        assert_eq!(
            ProgramError::from_rpc_message(message),
            Some(ProgramError::SequenceMismatch)
        );
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        // 0x1 is the token program's insufficient funds, not ours.
        assert_eq!(
            ProgramError::from_rpc_message("custom program error: 0x1"),
            None
        );
        assert_eq!(ProgramError::from_rpc_message("blockhash not found"), None);
        assert_eq!(ProgramError::from_code(6003), None);
    }

    #[test]
    fn test_code_blocks() {
        assert_eq!(ProgramError::from_code(6010), Some(ProgramError::InsufficientFunds));
        assert_eq!(ProgramError::from_code(6020), Some(ProgramError::Unauthorized));
        assert_eq!(ProgramError::Unauthorized.api_code(), "UNAUTHORIZED");
    }
}
