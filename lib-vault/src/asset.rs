//! Transferable Asset Interface
//!
//! The vault never moves value itself. It asks an [`AssetCollaborator`] to
//! pull value in from a principal or push value out to one, and treats a
//! `false` return as `TransferFailed`.
//!
//! The collaborator receives the vault by `&mut` so it can call back into it
//! mid-transfer, the way a token contract with hooks could. All accounting is
//! final before any `push`, so a re-entrant call observes post-operation state.
//!
//! A vault is bound to one asset at `initialize`. Every transfer path checks
//! the collaborator's [`AssetCollaborator::id`] against that binding before
//! touching state.

use lib_types::{Address, Amount};
use std::collections::BTreeMap;

use crate::vault::Vault;

/// Value-transfer mechanism backing a vault
pub trait AssetCollaborator {
    /// Identity of the asset this collaborator moves
    fn id(&self) -> Address;

    /// Move `amount` from `from` into vault custody
    fn pull(&mut self, vault: &mut Vault, from: Address, amount: Amount) -> bool;

    /// Move `amount` out of vault custody to `to`
    fn push(&mut self, vault: &mut Vault, to: Address, amount: Amount) -> bool;
}

/// In-memory reference asset with a custody account
#[derive(Debug, Clone, Default)]
pub struct AssetLedger {
    asset: Address,
    custody: Address,
    balances: BTreeMap<Address, Amount>,
}

impl AssetLedger {
    pub fn new(asset: Address, custody: Address) -> Self {
        Self {
            asset,
            custody,
            balances: BTreeMap::new(),
        }
    }

    /// Credit an account out of thin air (host funding)
    ///
    /// Returns `false` without effect if the balance would overflow.
    pub fn mint(&mut self, to: Address, amount: Amount) -> bool {
        let Some(funded) = self.balance_of(&to).checked_add(amount) else {
            return false;
        };
        self.balances.insert(to, funded);
        true
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Value currently held on behalf of the vault
    pub fn custody_balance(&self) -> Amount {
        self.balance_of(&self.custody)
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> bool {
        let from_balance = self.balance_of(&from);
        if from == to {
            return from_balance >= amount;
        }
        let Some(remaining) = from_balance.checked_sub(amount) else {
            return false;
        };
        let Some(credited) = self.balance_of(&to).checked_add(amount) else {
            return false;
        };
        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);
        true
    }
}

impl AssetCollaborator for AssetLedger {
    fn id(&self) -> Address {
        self.asset
    }

    fn pull(&mut self, _vault: &mut Vault, from: Address, amount: Amount) -> bool {
        let custody = self.custody;
        self.transfer(from, custody, amount)
    }

    fn push(&mut self, _vault: &mut Vault, to: Address, amount: Amount) -> bool {
        let custody = self.custody;
        self.transfer(custody, to, amount)
    }
}
