//! Persistent state segments
//!
//! Field order inside each segment struct is the persisted order. It must
//! match the layout tables; `test_segment_field_order_matches_layout` guards it.

use lib_types::{Address, Amount, Bps, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SchemaVersion;
use crate::errors::{VaultError, VaultResult};
use crate::roles::RoleRegistry;

/// V1 segment: identity, fee, balances, roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV1 {
    /// Highest version whose initializer has run (0 = never initialized)
    pub initialized_version: u8,
    pub asset: Address,
    pub deposit_fee_bps: Bps,
    pub balances: BTreeMap<Address, Amount>,
    pub total_deposits: Amount,
    pub roles: RoleRegistry,
}

/// Per-principal accrual clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accrual {
    pub last_accrual_time: Timestamp,
    /// Settled but unclaimed yield
    pub accumulated_yield: Amount,
}

/// V2 segment: yield accrual and deposit pause
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV2 {
    pub yield_rate_bps: Bps,
    pub deposits_paused: bool,
    pub accruals: BTreeMap<Address, Accrual>,
    /// Accrual origin for principals that never settled
    pub yield_start_time: Timestamp,
}

impl StateV2 {
    /// Accrual clock of a principal, starting at `yield_start_time` if absent
    pub fn accrual_of(&self, principal: &Address) -> Accrual {
        self.accruals.get(principal).copied().unwrap_or(Accrual {
            last_accrual_time: self.yield_start_time,
            accumulated_yield: 0,
        })
    }
}

/// A single live or executed withdrawal request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: Amount,
    pub request_time: Timestamp,
    pub executed: bool,
}

/// V3 segment: delayed withdrawals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV3 {
    pub withdrawal_delay_seconds: u64,
    pub withdrawal_requests: BTreeMap<Address, WithdrawalRequest>,
}

/// Complete persistent state: one segment per schema version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    pub v1: StateV1,
    pub v2: Option<StateV2>,
    pub v3: Option<StateV3>,
}

impl VaultState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest schema version with a segment present
    pub fn version(&self) -> SchemaVersion {
        if self.v3.is_some() {
            SchemaVersion::V3
        } else if self.v2.is_some() {
            SchemaVersion::V2
        } else {
            SchemaVersion::V1
        }
    }

    /// Highest version whose initializer has run
    pub fn initialized_version(&self) -> Option<SchemaVersion> {
        SchemaVersion::from_u8(self.v1.initialized_version)
    }

    /// Append default segments up to `target`; existing segments are untouched
    pub fn extend_to(&mut self, target: SchemaVersion) {
        if target >= SchemaVersion::V2 && self.v2.is_none() {
            self.v2 = Some(StateV2::default());
        }
        if target >= SchemaVersion::V3 && self.v3.is_none() {
            self.v3 = Some(StateV3::default());
        }
    }

    /// Segments must form a prefix of the version lineage
    pub fn check_segments(&self) -> VaultResult<()> {
        if self.v3.is_some() && self.v2.is_none() {
            return Err(VaultError::LayoutViolation(
                "V3 segment present without V2 segment".to_string(),
            ));
        }
        if self.v1.initialized_version > self.version().as_u8() {
            return Err(VaultError::LayoutViolation(format!(
                "initialized version {} above schema {}",
                self.v1.initialized_version,
                self.version()
            )));
        }
        Ok(())
    }

    // ─── Ledger Primitives ──────────────────────────────────────────────────

    pub fn balance_of(&self, principal: &Address) -> Amount {
        self.v1.balances.get(principal).copied().unwrap_or(0)
    }

    /// Add to a balance and the aggregate together
    pub(crate) fn credit(&mut self, principal: Address, amount: Amount) -> VaultResult<()> {
        let balance = self
            .balance_of(&principal)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        let total = self
            .v1
            .total_deposits
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;

        if balance > 0 {
            self.v1.balances.insert(principal, balance);
        }
        self.v1.total_deposits = total;
        Ok(())
    }

    /// Subtract from a balance and the aggregate together
    pub(crate) fn debit(&mut self, principal: Address, amount: Amount) -> VaultResult<()> {
        let have = self.balance_of(&principal);
        let balance = have
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientBalance { have, need: amount })?;
        let total = self.v1.total_deposits.checked_sub(amount).ok_or_else(|| {
            VaultError::InvariantViolation("total deposits below a single balance".to_string())
        })?;

        if balance == 0 {
            self.v1.balances.remove(&principal);
        } else {
            self.v1.balances.insert(principal, balance);
        }
        self.v1.total_deposits = total;
        Ok(())
    }

    /// Sum of all balances, `None` on overflow
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.v1
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
    }
}
