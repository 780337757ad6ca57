//! Asset Binding Tests
//!
//! A vault moves only the asset it was initialized with. Collaborators for
//! any other asset are refused before state changes, so value credited
//! through a worthless asset can never be paid out of real custody.

mod common;

use anyhow::Result;
use common::*;
use lib_types::{Address, Amount};
use lib_vault::{AssetCollaborator, AssetLedger, Vault, VaultError};

fn mallory() -> Address {
    Address::new([0x66; 32])
}

fn phantom_id() -> Address {
    Address::new([0xf0; 32])
}

fn mismatch() -> VaultError {
    VaultError::AssetMismatch {
        expected: asset_id(),
        actual: phantom_id(),
    }
}

/// Reports every pull as successful without moving anything
struct PhantomAsset;

impl AssetCollaborator for PhantomAsset {
    fn id(&self) -> Address {
        phantom_id()
    }

    fn pull(&mut self, _vault: &mut Vault, _from: Address, _amount: Amount) -> bool {
        true
    }

    fn push(&mut self, _vault: &mut Vault, _to: Address, _amount: Amount) -> bool {
        true
    }
}

/// Test 1: a phantom deposit cannot be cashed out through real custody
#[test]
fn test_phantom_deposit_cannot_drain_custody() -> Result<()> {
    let mut vault = vault_v1(0);
    let mut real = funded_ledger(1_000);
    vault.deposit(&at(alice(), 0), 1_000, &mut real)?;

    assert_eq!(
        vault.deposit(&at(mallory(), 1), 1_000, &mut PhantomAsset),
        Err(mismatch())
    );
    assert_eq!(vault.balance_of(&mallory()), 0);
    assert_eq!(
        vault.withdraw(&at(mallory(), 2), 1_000, &mut real),
        Err(VaultError::InsufficientBalance { have: 0, need: 1_000 })
    );

    assert_eq!(real.balance_of(&mallory()), 0);
    assert_eq!(real.custody_balance(), 1_000);
    assert_eq!(vault.total_deposits(), 1_000);
    vault.verify_conservation()?;
    Ok(())
}

/// Test 2: every payout path refuses a foreign asset and keeps state
#[test]
fn test_payouts_refuse_foreign_asset() -> Result<()> {
    let mut vault = vault_v3(0, 500, DAY);
    let mut real = funded_ledger(1_000_000);
    vault.deposit(&at(alice(), 0), 1_000_000, &mut real)?;
    vault.request_withdrawal(&at(alice(), 0), 1_000)?;

    let mut foreign = AssetLedger::new(phantom_id(), custody());
    assert!(foreign.mint(custody(), 10_000_000));

    let state_before = vault.state().clone();
    let journal_before = vault.events().len();

    assert_eq!(
        vault.claim_yield(&at(alice(), YEAR), &mut foreign),
        Err(mismatch())
    );
    assert_eq!(
        vault.execute_withdrawal(&at(alice(), YEAR), &mut foreign),
        Err(mismatch())
    );
    assert_eq!(
        vault.emergency_withdraw(&at(admin(), YEAR), alice(), &mut foreign),
        Err(mismatch())
    );

    assert_eq!(vault.state(), &state_before);
    assert_eq!(vault.events().len(), journal_before);
    assert_eq!(foreign.balance_of(&alice()), 0);

    // The bound asset still works
    assert_eq!(vault.execute_withdrawal(&at(alice(), YEAR), &mut real)?, 1_000);
    Ok(())
}

/// Test 3: the mismatch is a permanent rejection naming both assets
#[test]
fn test_mismatch_is_not_retryable() {
    let err = mismatch();
    assert!(!err.is_retryable());
    assert_eq!(err.code(), "ASSET_MISMATCH");
    assert!(err.to_string().contains(&asset_id().to_string()));
}
