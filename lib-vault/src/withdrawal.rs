//! Withdrawal Delay Queue (V3+)
//!
//! Two-phase withdrawals: a principal files a request, then executes it once
//! the delay has elapsed. Each principal has at most one live request and a
//! new request replaces the old one. Per principal:
//!
//! ```text
//! NoRequest ---request--> Pending ---execute--> Executed
//! Pending | Executed ---request--> Pending (replaced)
//! any ---emergency_withdraw--> NoRequest
//! ```
//!
//! Eligibility is computed at execution time from the current delay, so a
//! delay change also applies to pending requests.

use lib_types::{Address, Amount, Timestamp};

use crate::asset::AssetCollaborator;
use crate::errors::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::roles::Role;
use crate::schema::{SchemaVersion, WithdrawalRequest};
use crate::vault::{CallContext, Vault};

/// Lifecycle position of a principal's request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStatus {
    NoRequest,
    Pending,
    Executed,
}

/// Read model of a withdrawal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalRequestView {
    pub amount: Amount,
    pub request_time: Timestamp,
    pub executed: bool,
    pub earliest_execution_time: Timestamp,
}

impl Vault {
    /// File a withdrawal request, replacing any existing one
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if amount is zero
    /// - `InsufficientBalance` if amount exceeds the current balance
    pub fn request_withdrawal(&mut self, ctx: &CallContext, amount: Amount) -> VaultResult<WithdrawalRequestView> {
        self.atomic("request_withdrawal", |vault| {
            vault.require_feature(SchemaVersion::V3)?;
            if amount == 0 {
                return Err(VaultError::InvalidAmount);
            }
            let have = vault.balance_of(&ctx.caller);
            if amount > have {
                return Err(VaultError::InsufficientBalance { have, need: amount });
            }

            let request = WithdrawalRequest {
                amount,
                request_time: ctx.now,
                executed: false,
            };
            let segment = vault.segment_v3_mut()?;
            segment.withdrawal_requests.insert(ctx.caller, request);
            let view = view_of(request, segment.withdrawal_delay_seconds);

            vault.emit(VaultEvent::WithdrawalRequested {
                principal: ctx.caller,
                amount,
                request_time: ctx.now,
            });
            Ok(view)
        })
    }

    /// Execute the caller's pending request once the delay has elapsed
    ///
    /// # Errors
    ///
    /// - `AssetMismatch` if `asset` is not the asset bound at `initialize`
    /// - `NoWithdrawalRequest` if there is no live request
    /// - `WithdrawalAlreadyExecuted` if the request was already paid out
    /// - `DelayNotMet` before `request_time + delay`
    /// - `InsufficientBalance` if the balance fell below the requested amount
    /// - `TransferFailed` if the asset push fails
    pub fn execute_withdrawal(&mut self, ctx: &CallContext, asset: &mut dyn AssetCollaborator) -> VaultResult<Amount> {
        self.atomic("execute_withdrawal", |vault| {
            vault.require_feature(SchemaVersion::V3)?;
            vault.require_asset(asset)?;
            let segment = vault.segment_v3()?;
            let request = match segment.withdrawal_requests.get(&ctx.caller) {
                Some(request) if request.amount > 0 => *request,
                _ => return Err(VaultError::NoWithdrawalRequest),
            };
            if request.executed {
                return Err(VaultError::WithdrawalAlreadyExecuted);
            }
            let executable_at = request
                .request_time
                .saturating_add(segment.withdrawal_delay_seconds);
            if ctx.now < executable_at {
                return Err(VaultError::DelayNotMet {
                    executable_at,
                    now: ctx.now,
                });
            }
            let have = vault.balance_of(&ctx.caller);
            if have < request.amount {
                return Err(VaultError::InsufficientBalance {
                    have,
                    need: request.amount,
                });
            }

            vault.settle_yield(ctx.caller, ctx.now)?;
            vault
                .segment_v3_mut()?
                .withdrawal_requests
                .insert(ctx.caller, WithdrawalRequest { executed: true, ..request });
            vault.state_mut().debit(ctx.caller, request.amount)?;
            vault.emit(VaultEvent::WithdrawalExecuted {
                principal: ctx.caller,
                amount: request.amount,
            });

            vault.push_out(asset, ctx.caller, request.amount)?;
            Ok(request.amount)
        })
    }

    /// Pay out a principal's full balance immediately (Admin only)
    ///
    /// Bypasses the delay and clears any request.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not an admin
    /// - `AssetMismatch` if `asset` is not the asset bound at `initialize`
    /// - `NoBalance` if the principal holds nothing
    pub fn emergency_withdraw(
        &mut self,
        ctx: &CallContext,
        principal: Address,
        asset: &mut dyn AssetCollaborator,
    ) -> VaultResult<Amount> {
        self.atomic("emergency_withdraw", |vault| {
            vault.require_feature(SchemaVersion::V3)?;
            vault.authorize(ctx.caller, Role::Admin)?;
            vault.require_asset(asset)?;
            let balance = vault.balance_of(&principal);
            if balance == 0 {
                return Err(VaultError::NoBalance);
            }

            vault.settle_yield(principal, ctx.now)?;
            vault.segment_v3_mut()?.withdrawal_requests.remove(&principal);
            vault.state_mut().debit(principal, balance)?;
            vault.emit(VaultEvent::EmergencyWithdrawal {
                principal,
                amount: balance,
                by: ctx.caller,
            });

            vault.push_out(asset, principal, balance)?;
            Ok(balance)
        })
    }

    /// Set the withdrawal delay (Admin only)
    pub fn set_withdrawal_delay(&mut self, ctx: &CallContext, seconds: u64) -> VaultResult<()> {
        self.atomic("set_withdrawal_delay", |vault| {
            vault.require_feature(SchemaVersion::V3)?;
            vault.authorize(ctx.caller, Role::Admin)?;

            let segment = vault.segment_v3_mut()?;
            let old_seconds = segment.withdrawal_delay_seconds;
            segment.withdrawal_delay_seconds = seconds;
            vault.emit(VaultEvent::WithdrawalDelayUpdated {
                old_seconds,
                new_seconds: seconds,
            });
            Ok(())
        })
    }

    /// Current request of a principal, `None` in `NoRequest`
    pub fn withdrawal_request(&self, principal: &Address) -> VaultResult<Option<WithdrawalRequestView>> {
        self.require_logic(SchemaVersion::V3)?;
        let segment = self.segment_v3()?;
        Ok(segment
            .withdrawal_requests
            .get(principal)
            .filter(|request| request.amount > 0)
            .map(|request| view_of(*request, segment.withdrawal_delay_seconds)))
    }

    pub fn withdrawal_status(&self, principal: &Address) -> VaultResult<WithdrawalStatus> {
        Ok(match self.withdrawal_request(principal)? {
            None => WithdrawalStatus::NoRequest,
            Some(view) if view.executed => WithdrawalStatus::Executed,
            Some(_) => WithdrawalStatus::Pending,
        })
    }

    pub fn withdrawal_delay_seconds(&self) -> Option<u64> {
        self.state()
            .v3
            .as_ref()
            .map(|segment| segment.withdrawal_delay_seconds)
    }
}

fn view_of(request: WithdrawalRequest, delay: u64) -> WithdrawalRequestView {
    WithdrawalRequestView {
        amount: request.amount,
        request_time: request.request_time,
        executed: request.executed,
        earliest_execution_time: request.request_time.saturating_add(delay),
    }
}
