//! Shared fixtures for vault integration tests
#![allow(dead_code)]

use lib_types::{Address, Amount, Timestamp};
use lib_vault::{AssetLedger, CallContext, LogicModule, Vault};

pub const DAY: u64 = 86_400;
pub const YEAR: u64 = 365 * DAY;

pub fn admin() -> Address {
    Address::new([1u8; 32])
}

pub fn alice() -> Address {
    Address::new([10u8; 32])
}

pub fn bob() -> Address {
    Address::new([11u8; 32])
}

pub fn asset_id() -> Address {
    Address::new([0xa5; 32])
}

pub fn custody() -> Address {
    Address::new([0xcc; 32])
}

pub fn at(caller: Address, now: Timestamp) -> CallContext {
    CallContext::new(caller, now)
}

/// Asset ledger with alice and bob funded
pub fn funded_ledger(amount: Amount) -> AssetLedger {
    let mut ledger = AssetLedger::new(asset_id(), custody());
    ledger.mint(alice(), amount);
    ledger.mint(bob(), amount);
    ledger
}

/// Initialized V1 vault
pub fn vault_v1(fee_bps: u16) -> Vault {
    let mut vault = Vault::deploy(LogicModule::v1());
    vault
        .initialize(asset_id(), admin(), fee_bps)
        .expect("initialize");
    vault
}

/// Swap to V2 logic and run its initializer at `now`
pub fn upgrade_to_v2(vault: &mut Vault, yield_rate_bps: u16, now: Timestamp) {
    let ctx = at(admin(), now);
    vault
        .authorize_upgrade(&ctx, LogicModule::v2())
        .expect("upgrade to v2");
    vault.initialize_v2(&ctx, yield_rate_bps).expect("initialize v2");
}

/// Swap to V3 logic and run its initializer at `now`
pub fn upgrade_to_v3(vault: &mut Vault, delay_seconds: u64, now: Timestamp) {
    let ctx = at(admin(), now);
    vault
        .authorize_upgrade(&ctx, LogicModule::v3())
        .expect("upgrade to v3");
    vault.initialize_v3(&ctx, delay_seconds).expect("initialize v3");
}

/// Fully upgraded vault: fee, yield rate and delay applied from time 0
pub fn vault_v3(fee_bps: u16, yield_rate_bps: u16, delay_seconds: u64) -> Vault {
    let mut vault = vault_v1(fee_bps);
    upgrade_to_v2(&mut vault, yield_rate_bps, 0);
    upgrade_to_v3(&mut vault, delay_seconds, 0);
    vault
}
