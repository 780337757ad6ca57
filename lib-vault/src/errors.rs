//! Vault Operation Errors

use lib_types::{Address, Amount, Timestamp};
use thiserror::Error;

use crate::roles::Role;
use crate::schema::SchemaVersion;

/// Error during vault operations
///
/// Every variant aborts the enclosing operation; the host restores the
/// pre-operation state before the error reaches the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Unauthorized: {caller} does not hold {role}")]
    Unauthorized { role: Role, caller: Address },

    #[error("Deposits are paused")]
    DepositsPaused,

    #[error("Asset transfer failed")]
    TransferFailed,

    #[error("Asset mismatch: vault is bound to {expected}, got {actual}")]
    AssetMismatch { expected: Address, actual: Address },

    #[error("No yield to claim")]
    NoYieldToClaim,

    #[error("No withdrawal request")]
    NoWithdrawalRequest,

    #[error("Withdrawal already executed")]
    WithdrawalAlreadyExecuted,

    #[error("Withdrawal delay not met: executable at {executable_at}, now {now}")]
    DelayNotMet { executable_at: Timestamp, now: Timestamp },

    #[error("No balance")]
    NoBalance,

    #[error("Already initialized at version {0}")]
    AlreadyInitialized(u8),

    #[error("Storage layout violation: {0}")]
    LayoutViolation(String),

    #[error("Not initialized for version {0}")]
    NotInitialized(SchemaVersion),

    #[error("Feature requires {required}, active logic is {active}")]
    FeatureNotActive {
        required: SchemaVersion,
        active: SchemaVersion,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Direct withdrawal disabled once the delay queue is active: use request_withdrawal, then execute_withdrawal")]
    DirectWithdrawalDisabled,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl VaultError {
    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::DepositsPaused => "DEPOSITS_PAUSED",
            Self::TransferFailed => "TRANSFER_FAILED",
            Self::AssetMismatch { .. } => "ASSET_MISMATCH",
            Self::NoYieldToClaim => "NO_YIELD_TO_CLAIM",
            Self::NoWithdrawalRequest => "NO_WITHDRAWAL_REQUEST",
            Self::WithdrawalAlreadyExecuted => "WITHDRAWAL_ALREADY_EXECUTED",
            Self::DelayNotMet { .. } => "DELAY_NOT_MET",
            Self::NoBalance => "NO_BALANCE",
            Self::AlreadyInitialized(_) => "ALREADY_INITIALIZED",
            Self::LayoutViolation(_) => "LAYOUT_VIOLATION",
            Self::NotInitialized(_) => "NOT_INITIALIZED",
            Self::FeatureNotActive { .. } => "FEATURE_NOT_ACTIVE",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::DirectWithdrawalDisabled => "DIRECT_WITHDRAWAL_DISABLED",
            Self::Overflow => "OVERFLOW",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    /// Whether resubmitting the same call later could succeed
    ///
    /// Distinguishes "try again later" from "this will never succeed as submitted".
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DelayNotMet { .. } | Self::DepositsPaused | Self::TransferFailed
        )
    }
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VaultError::DelayNotMet { executable_at: 10, now: 5 }.is_retryable());
        assert!(VaultError::DepositsPaused.is_retryable());
        assert!(!VaultError::InvalidAmount.is_retryable());
        assert!(!VaultError::InsufficientBalance { have: 1, need: 2 }.is_retryable());
        assert!(!VaultError::AssetMismatch {
            expected: Address::new([1u8; 32]),
            actual: Address::new([2u8; 32]),
        }
        .is_retryable());
    }

    #[test]
    fn test_reason_codes_are_distinct() {
        let errors = [
            VaultError::InvalidAmount,
            VaultError::NoBalance,
            VaultError::NoYieldToClaim,
            VaultError::NoWithdrawalRequest,
            VaultError::WithdrawalAlreadyExecuted,
            VaultError::TransferFailed,
            VaultError::AssetMismatch {
                expected: Address::new([1u8; 32]),
                actual: Address::new([2u8; 32]),
            },
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_carries_context() {
        let err = VaultError::InsufficientBalance { have: 40, need: 50 };
        assert_eq!(err.to_string(), "Insufficient balance: have 40, need 50");
    }
}
