//! Vault Event Journal
//!
//! Emits events for every committed state change:
//! - Ledger: Deposited, Withdrawn, DepositFeeUpdated
//! - Yield: YieldClaimed, YieldRateUpdated, DepositsPaused, DepositsUnpaused
//! - Withdrawal queue: WithdrawalRequested, WithdrawalExecuted, EmergencyWithdrawal
//! - Governance: Initialized, Reinitialized, RoleGranted, RoleRevoked, Upgraded
//!
//! Events from an operation that fails are discarded with the rest of its effects.

use lib_types::{Address, Amount, Bps, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::roles::Role;
use crate::schema::SchemaVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Initialized {
        asset: Address,
        admin: Address,
        deposit_fee_bps: Bps,
    },
    Reinitialized {
        version: SchemaVersion,
    },
    Deposited {
        principal: Address,
        amount: Amount,
        fee: Amount,
        credited: Amount,
    },
    Withdrawn {
        principal: Address,
        amount: Amount,
    },
    DepositFeeUpdated {
        old_bps: Bps,
        new_bps: Bps,
    },
    YieldClaimed {
        principal: Address,
        amount: Amount,
    },
    YieldRateUpdated {
        old_bps: Bps,
        new_bps: Bps,
    },
    DepositsPaused {
        by: Address,
    },
    DepositsUnpaused {
        by: Address,
    },
    WithdrawalRequested {
        principal: Address,
        amount: Amount,
        request_time: Timestamp,
    },
    WithdrawalExecuted {
        principal: Address,
        amount: Amount,
    },
    WithdrawalDelayUpdated {
        old_seconds: u64,
        new_seconds: u64,
    },
    EmergencyWithdrawal {
        principal: Address,
        amount: Amount,
        by: Address,
    },
    RoleGranted {
        role: Role,
        principal: Address,
        by: Address,
    },
    RoleRevoked {
        role: Role,
        principal: Address,
        by: Address,
    },
    Upgraded {
        from: SchemaVersion,
        to: SchemaVersion,
        code_hash: [u8; 32],
    },
}

impl fmt::Display for VaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized {
                asset,
                admin,
                deposit_fee_bps,
            } => write!(
                f,
                "initialized asset={} admin={} fee={}bps",
                asset, admin, deposit_fee_bps
            ),
            Self::Reinitialized { version } => write!(f, "reinitialized to {}", version),
            Self::Deposited {
                principal,
                amount,
                fee,
                credited,
            } => write!(
                f,
                "deposit {} by {} (fee {}, credited {})",
                amount, principal, fee, credited
            ),
            Self::Withdrawn { principal, amount } => {
                write!(f, "withdraw {} by {}", amount, principal)
            }
            Self::DepositFeeUpdated { old_bps, new_bps } => {
                write!(f, "deposit fee {} -> {} bps", old_bps, new_bps)
            }
            Self::YieldClaimed { principal, amount } => {
                write!(f, "yield claim {} by {}", amount, principal)
            }
            Self::YieldRateUpdated { old_bps, new_bps } => {
                write!(f, "yield rate {} -> {} bps", old_bps, new_bps)
            }
            Self::DepositsPaused { by } => write!(f, "deposits paused by {}", by),
            Self::DepositsUnpaused { by } => write!(f, "deposits unpaused by {}", by),
            Self::WithdrawalRequested {
                principal,
                amount,
                request_time,
            } => write!(
                f,
                "withdrawal request {} by {} at {}",
                amount, principal, request_time
            ),
            Self::WithdrawalExecuted { principal, amount } => {
                write!(f, "withdrawal executed {} to {}", amount, principal)
            }
            Self::WithdrawalDelayUpdated {
                old_seconds,
                new_seconds,
            } => write!(f, "withdrawal delay {}s -> {}s", old_seconds, new_seconds),
            Self::EmergencyWithdrawal {
                principal,
                amount,
                by,
            } => write!(
                f,
                "emergency withdrawal {} to {} by {}",
                amount, principal, by
            ),
            Self::RoleGranted {
                role,
                principal,
                by,
            } => write!(f, "{} granted to {} by {}", role, principal, by),
            Self::RoleRevoked {
                role,
                principal,
                by,
            } => write!(f, "{} revoked from {} by {}", role, principal, by),
            Self::Upgraded {
                from,
                to,
                code_hash,
            } => write!(
                f,
                "logic upgraded {} -> {} (code {})",
                from,
                to,
                hex::encode(&code_hash[..4])
            ),
        }
    }
}
