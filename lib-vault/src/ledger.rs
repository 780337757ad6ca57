//! Ledger - deposits, direct withdrawals and the deposit fee
//!
//! Balances are fee-already-deducted credits. `total_deposits` always equals
//! the sum of balances.

use lib_types::{Address, Amount, Bps, MAX_BPS};

use crate::asset::AssetCollaborator;
use crate::errors::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::roles::Role;
use crate::schema::SchemaVersion;
use crate::vault::{CallContext, Vault};

/// Deposit fee for an amount
///
/// Formula: amount * fee_bps / 10_000, truncating
pub fn compute_deposit_fee(amount: Amount, fee_bps: Bps) -> VaultResult<Amount> {
    if fee_bps == 0 {
        return Ok(0);
    }
    let scaled = amount
        .checked_mul(fee_bps as Amount)
        .ok_or(VaultError::Overflow)?;
    Ok(scaled / MAX_BPS as Amount)
}

impl Vault {
    /// Deposit `amount`, crediting it net of the deposit fee
    ///
    /// The full amount is pulled from the caller first. Pending yield is then
    /// settled and the accrual clock reset before the credit lands.
    ///
    /// # Returns
    ///
    /// The credited amount
    ///
    /// # Errors
    ///
    /// - `AssetMismatch` if `asset` is not the asset bound at `initialize`
    /// - `InvalidAmount` if amount is zero
    /// - `DepositsPaused` while a pauser has halted deposits
    /// - `TransferFailed` if the asset pull fails
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        amount: Amount,
        asset: &mut dyn AssetCollaborator,
    ) -> VaultResult<Amount> {
        self.atomic("deposit", |vault| {
            vault.require_initialized()?;
            vault.require_asset(asset)?;
            if amount == 0 {
                return Err(VaultError::InvalidAmount);
            }
            if vault.deposits_paused() {
                return Err(VaultError::DepositsPaused);
            }

            let fee = compute_deposit_fee(amount, vault.state().v1.deposit_fee_bps)?;
            let credited = amount - fee;

            if !asset.pull(vault, ctx.caller, amount) {
                return Err(VaultError::TransferFailed);
            }

            vault.settle_yield(ctx.caller, ctx.now)?;
            vault.state_mut().credit(ctx.caller, credited)?;

            vault.emit(VaultEvent::Deposited {
                principal: ctx.caller,
                amount,
                fee,
                credited,
            });
            Ok(credited)
        })
    }

    /// Withdraw `amount` directly
    ///
    /// Balances are debited before the push so a re-entrant call sees the
    /// post-withdrawal state.
    ///
    /// # Errors
    ///
    /// - `DirectWithdrawalDisabled` once the withdrawal queue (V3) is active
    /// - `AssetMismatch` if `asset` is not the asset bound at `initialize`
    /// - `InvalidAmount` if amount is zero
    /// - `InsufficientBalance` if amount exceeds the balance
    /// - `TransferFailed` if the asset push fails
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        amount: Amount,
        asset: &mut dyn AssetCollaborator,
    ) -> VaultResult<()> {
        self.atomic("withdraw", |vault| {
            vault.require_initialized()?;
            if vault.logic().version >= SchemaVersion::V3 {
                return Err(VaultError::DirectWithdrawalDisabled);
            }
            vault.require_asset(asset)?;
            if amount == 0 {
                return Err(VaultError::InvalidAmount);
            }
            let have = vault.balance_of(&ctx.caller);
            if have < amount {
                return Err(VaultError::InsufficientBalance { have, need: amount });
            }

            vault.settle_yield(ctx.caller, ctx.now)?;
            vault.state_mut().debit(ctx.caller, amount)?;
            vault.emit(VaultEvent::Withdrawn {
                principal: ctx.caller,
                amount,
            });

            vault.push_out(asset, ctx.caller, amount)
        })
    }

    /// Set the deposit fee (Admin only)
    pub fn set_deposit_fee(&mut self, ctx: &CallContext, fee_bps: Bps) -> VaultResult<()> {
        self.atomic("set_deposit_fee", |vault| {
            vault.require_initialized()?;
            vault.authorize(ctx.caller, Role::Admin)?;
            if fee_bps > MAX_BPS {
                return Err(VaultError::InvalidParameter(format!(
                    "deposit fee {} bps exceeds {}",
                    fee_bps, MAX_BPS
                )));
            }

            let old_bps = vault.state().v1.deposit_fee_bps;
            vault.state_mut().v1.deposit_fee_bps = fee_bps;
            vault.emit(VaultEvent::DepositFeeUpdated {
                old_bps,
                new_bps: fee_bps,
            });
            Ok(())
        })
    }

    pub fn balance_of(&self, principal: &Address) -> Amount {
        self.state().balance_of(principal)
    }

    pub fn total_deposits(&self) -> Amount {
        self.state().v1.total_deposits
    }

    pub fn deposit_fee_bps(&self) -> Bps {
        self.state().v1.deposit_fee_bps
    }

    /// Push value out, mapping refusal to `TransferFailed`
    pub(crate) fn push_out(
        &mut self,
        asset: &mut dyn AssetCollaborator,
        to: Address,
        amount: Amount,
    ) -> VaultResult<()> {
        if !asset.push(self, to, amount) {
            return Err(VaultError::TransferFailed);
        }
        Ok(())
    }
}
