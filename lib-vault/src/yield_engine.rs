//! Yield Accrual Engine (V2+)
//!
//! Simple, linear, non-compounding interest on each principal's balance:
//!
//! ```text
//! new_yield = balance * yield_rate_bps * elapsed / (SECONDS_PER_YEAR * 10_000)
//! ```
//!
//! Yield is settled into `accumulated_yield` whenever a balance changes, so
//! each interval is accrued at the balance that was actually held during it.
//! Rate changes are prospective: they apply from each principal's current
//! accrual clock forward.

use lib_types::{Address, Amount, Bps, Timestamp, MAX_BPS, SECONDS_PER_YEAR};

use crate::asset::AssetCollaborator;
use crate::errors::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::roles::Role;
use crate::schema::{Accrual, SchemaVersion};
use crate::vault::{CallContext, Vault};

/// Yield accrued on `balance` over `elapsed` seconds, truncating
pub fn accrued_yield(balance: Amount, rate_bps: Bps, elapsed: u64) -> VaultResult<Amount> {
    if balance == 0 || rate_bps == 0 || elapsed == 0 {
        return Ok(0);
    }
    let numerator = balance
        .checked_mul(rate_bps as Amount)
        .and_then(|v| v.checked_mul(elapsed as Amount))
        .ok_or(VaultError::Overflow)?;
    Ok(numerator / (SECONDS_PER_YEAR as Amount * MAX_BPS as Amount))
}

impl Vault {
    /// Pending yield for a principal as of `now` (read-only)
    ///
    /// A zero balance reports only the settled `accumulated_yield`.
    pub fn user_yield(&self, principal: &Address, now: Timestamp) -> VaultResult<Amount> {
        self.require_feature(SchemaVersion::V2)?;
        let segment = self.segment_v2()?;
        let accrual = segment.accrual_of(principal);
        let balance = self.balance_of(principal);
        if balance == 0 {
            return Ok(accrual.accumulated_yield);
        }

        let elapsed = now.saturating_sub(accrual.last_accrual_time);
        let pending = accrued_yield(balance, segment.yield_rate_bps, elapsed)?;
        accrual
            .accumulated_yield
            .checked_add(pending)
            .ok_or(VaultError::Overflow)
    }

    /// Claim all pending yield
    ///
    /// The claim is debited from the balance and `total_deposits` and the
    /// accrual record zeroed before the push.
    ///
    /// # Errors
    ///
    /// - `AssetMismatch` if `asset` is not the asset bound at `initialize`
    /// - `NoYieldToClaim` if nothing has accrued
    /// - `InsufficientBalance` if the claim exceeds the balance
    /// - `TransferFailed` if the asset push fails
    pub fn claim_yield(&mut self, ctx: &CallContext, asset: &mut dyn AssetCollaborator) -> VaultResult<Amount> {
        self.atomic("claim_yield", |vault| {
            vault.require_feature(SchemaVersion::V2)?;
            vault.require_asset(asset)?;
            let claim = vault.user_yield(&ctx.caller, ctx.now)?;
            if claim == 0 {
                return Err(VaultError::NoYieldToClaim);
            }
            let have = vault.balance_of(&ctx.caller);
            if claim > have {
                return Err(VaultError::InsufficientBalance { have, need: claim });
            }

            vault.segment_v2_mut()?.accruals.insert(
                ctx.caller,
                Accrual {
                    last_accrual_time: ctx.now,
                    accumulated_yield: 0,
                },
            );
            vault.state_mut().debit(ctx.caller, claim)?;
            vault.emit(VaultEvent::YieldClaimed {
                principal: ctx.caller,
                amount: claim,
            });

            vault.push_out(asset, ctx.caller, claim)?;
            Ok(claim)
        })
    }

    /// Set the annualized yield rate (Admin only)
    pub fn set_yield_rate(&mut self, ctx: &CallContext, rate_bps: Bps) -> VaultResult<()> {
        self.atomic("set_yield_rate", |vault| {
            vault.require_feature(SchemaVersion::V2)?;
            vault.authorize(ctx.caller, Role::Admin)?;

            let segment = vault.segment_v2_mut()?;
            let old_bps = segment.yield_rate_bps;
            segment.yield_rate_bps = rate_bps;
            vault.emit(VaultEvent::YieldRateUpdated {
                old_bps,
                new_bps: rate_bps,
            });
            Ok(())
        })
    }

    /// Halt deposits (Pauser only)
    pub fn pause_deposits(&mut self, ctx: &CallContext) -> VaultResult<()> {
        self.set_paused(ctx, true)
    }

    /// Resume deposits (Pauser only)
    pub fn unpause_deposits(&mut self, ctx: &CallContext) -> VaultResult<()> {
        self.set_paused(ctx, false)
    }

    fn set_paused(&mut self, ctx: &CallContext, paused: bool) -> VaultResult<()> {
        let operation = if paused { "pause_deposits" } else { "unpause_deposits" };
        self.atomic(operation, |vault| {
            vault.require_feature(SchemaVersion::V2)?;
            vault.authorize(ctx.caller, Role::Pauser)?;

            vault.segment_v2_mut()?.deposits_paused = paused;
            vault.emit(if paused {
                VaultEvent::DepositsPaused { by: ctx.caller }
            } else {
                VaultEvent::DepositsUnpaused { by: ctx.caller }
            });
            Ok(())
        })
    }

    /// Whether deposits are currently halted
    pub fn deposits_paused(&self) -> bool {
        self.state()
            .v2
            .as_ref()
            .map(|segment| segment.deposits_paused)
            .unwrap_or(false)
    }

    /// Active yield rate, `None` before V2
    pub fn yield_rate_bps(&self) -> Option<Bps> {
        self.state().v2.as_ref().map(|segment| segment.yield_rate_bps)
    }

    /// Settle pending yield and reset the accrual clock to `now`
    ///
    /// No-op until the V2 initializer has run.
    pub(crate) fn settle_yield(&mut self, principal: Address, now: Timestamp) -> VaultResult<()> {
        if !self.yield_active() {
            return Ok(());
        }
        let balance = self.balance_of(&principal);
        let segment = self.segment_v2_mut()?;
        let accrual = segment.accrual_of(&principal);

        let elapsed = now.saturating_sub(accrual.last_accrual_time);
        let pending = accrued_yield(balance, segment.yield_rate_bps, elapsed)?;
        let accumulated_yield = accrual
            .accumulated_yield
            .checked_add(pending)
            .ok_or(VaultError::Overflow)?;

        segment.accruals.insert(
            principal,
            Accrual {
                last_accrual_time: now,
                accumulated_yield,
            },
        );
        tracing::debug!(
            "Vault: settled {} yield for {} over {}s (accumulated {})",
            pending,
            principal,
            elapsed,
            accumulated_yield
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn test_full_year_at_500_bps() {
        let year = SECONDS_PER_YEAR;
        assert_eq!(accrued_yield(1_000_000, 500, year).unwrap(), 50_000);
        assert_eq!(accrued_yield(999, 500, year).unwrap(), 49);
    }

    #[test]
    fn test_yield_is_linear_in_time() {
        let half = accrued_yield(1_000_000, 1_000, 365 * DAY / 2).unwrap();
        let full = accrued_yield(1_000_000, 1_000, 365 * DAY).unwrap();
        assert_eq!(full, 100_000);
        assert_eq!(half * 2, full);
    }

    #[test]
    fn test_zero_inputs_accrue_nothing() {
        assert_eq!(accrued_yield(0, 500, DAY).unwrap(), 0);
        assert_eq!(accrued_yield(1_000, 0, DAY).unwrap(), 0);
        assert_eq!(accrued_yield(1_000, 500, 0).unwrap(), 0);
    }

    #[test]
    fn test_overflow_reported() {
        assert_eq!(
            accrued_yield(u128::MAX / 2, 10_000, SECONDS_PER_YEAR),
            Err(VaultError::Overflow)
        );
    }
}
