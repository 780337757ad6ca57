//! Upgrade Controller
//!
//! Swaps the active logic module in place. The swap is validated against the
//! append-only layout rule and appends default segments for every version the
//! new logic introduces; older segments are never rewritten.
//!
//! Each swap is followed by the new version's re-initializer, run once by an
//! `Upgrader`. A further swap is refused until it has run.

use lib_types::Bps;
use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::roles::Role;
use crate::schema::{migrate, MigrationPlan, SchemaVersion};
use crate::vault::{CallContext, Vault};

/// Descriptor of a swappable behavior unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicModule {
    pub name: String,
    pub version: SchemaVersion,
    pub code_hash: [u8; 32],
}

impl LogicModule {
    pub fn new(name: impl Into<String>, version: SchemaVersion) -> Self {
        let name = name.into();
        let code_hash = Self::compute_code_hash(&name, version);
        Self {
            name,
            version,
            code_hash,
        }
    }

    pub fn v1() -> Self {
        Self::new("custodial-vault-v1", SchemaVersion::V1)
    }

    pub fn v2() -> Self {
        Self::new("custodial-vault-v2", SchemaVersion::V2)
    }

    pub fn v3() -> Self {
        Self::new("custodial-vault-v3", SchemaVersion::V3)
    }

    fn compute_code_hash(name: &str, version: SchemaVersion) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"VAULT_LOGIC_V1");
        hasher.update(name.as_bytes());
        hasher.update(&[version.as_u8()]);
        hasher.finalize().into()
    }
}

impl Vault {
    /// Swap in a new logic module (Upgrader only)
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not an upgrader
    /// - `NotInitialized` while the active version's re-initializer has not run
    /// - `LayoutViolation` if the new layout is not an append-only extension
    pub fn authorize_upgrade(&mut self, ctx: &CallContext, new_logic: LogicModule) -> VaultResult<MigrationPlan> {
        self.atomic("authorize_upgrade", |vault| {
            vault.require_initialized()?;
            vault.authorize(ctx.caller, Role::Upgrader)?;

            let active = vault.logic().version;
            if vault.state().v1.initialized_version < active.as_u8() {
                return Err(VaultError::NotInitialized(active));
            }

            let plan = migrate(active, new_logic.version)?;
            vault.state_mut().extend_to(new_logic.version);

            let to = new_logic.version;
            let code_hash = new_logic.code_hash;
            vault.set_logic(new_logic);
            vault.emit(VaultEvent::Upgraded {
                from: active,
                to,
                code_hash,
            });
            Ok(plan)
        })
    }

    /// Run the V2 re-initializer (Upgrader only, once)
    pub fn initialize_v2(&mut self, ctx: &CallContext, yield_rate_bps: Bps) -> VaultResult<()> {
        self.atomic("initialize_v2", |vault| {
            vault.begin_reinitialize(ctx, SchemaVersion::V2)?;
            let segment = vault.segment_v2_mut()?;
            segment.yield_rate_bps = yield_rate_bps;
            segment.yield_start_time = ctx.now;
            vault.finish_reinitialize(SchemaVersion::V2);
            Ok(())
        })
    }

    /// Run the V3 re-initializer (Upgrader only, once)
    pub fn initialize_v3(&mut self, ctx: &CallContext, withdrawal_delay_seconds: u64) -> VaultResult<()> {
        self.atomic("initialize_v3", |vault| {
            vault.begin_reinitialize(ctx, SchemaVersion::V3)?;
            vault.segment_v3_mut()?.withdrawal_delay_seconds = withdrawal_delay_seconds;
            vault.finish_reinitialize(SchemaVersion::V3);
            Ok(())
        })
    }

    fn begin_reinitialize(&self, ctx: &CallContext, version: SchemaVersion) -> VaultResult<()> {
        self.require_initialized()?;
        self.authorize(ctx.caller, Role::Upgrader)?;
        self.require_logic(version)?;

        let current = self.state().v1.initialized_version;
        if current >= version.as_u8() {
            return Err(VaultError::AlreadyInitialized(current));
        }
        let previous = version.as_u8() - 1;
        if current != previous {
            let missing = SchemaVersion::from_u8(current + 1).unwrap_or(version);
            return Err(VaultError::NotInitialized(missing));
        }
        Ok(())
    }

    fn finish_reinitialize(&mut self, version: SchemaVersion) {
        self.state_mut().v1.initialized_version = version.as_u8();
        self.emit(VaultEvent::Reinitialized { version });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::Address;

    fn admin() -> Address {
        Address::new([1u8; 32])
    }

    fn initialized() -> Vault {
        let mut vault = Vault::deploy(LogicModule::v1());
        vault.initialize(Address::new([0xa5; 32]), admin(), 100).unwrap();
        vault
    }

    #[test]
    fn test_code_hash_is_deterministic_and_distinct() {
        assert_eq!(LogicModule::v1().code_hash, LogicModule::v1().code_hash);
        assert_ne!(LogicModule::v1().code_hash, LogicModule::v2().code_hash);
        assert_ne!(
            LogicModule::new("a", SchemaVersion::V2).code_hash,
            LogicModule::new("a", SchemaVersion::V3).code_hash
        );
    }

    #[test]
    fn test_upgrade_requires_upgrader() {
        let mut vault = initialized();
        let ctx = CallContext::new(Address::new([9u8; 32]), 0);
        let result = vault.authorize_upgrade(&ctx, LogicModule::v2());
        assert!(matches!(result, Err(VaultError::Unauthorized { role: Role::Upgrader, .. })));
        assert_eq!(vault.logic(), &LogicModule::v1());
        assert!(vault.state().v2.is_none());
    }

    #[test]
    fn test_upgrade_appends_segment() {
        let mut vault = initialized();
        let ctx = CallContext::new(admin(), 0);
        let plan = vault.authorize_upgrade(&ctx, LogicModule::v2()).unwrap();

        assert_eq!(plan.new_segments, vec![SchemaVersion::V2]);
        assert_eq!(vault.logic().version, SchemaVersion::V2);
        assert_eq!(vault.schema_version(), SchemaVersion::V2);
    }

    #[test]
    fn test_downgrade_rejected() {
        let mut vault = initialized();
        let ctx = CallContext::new(admin(), 0);
        vault.authorize_upgrade(&ctx, LogicModule::v2()).unwrap();
        vault.initialize_v2(&ctx, 500).unwrap();

        let result = vault.authorize_upgrade(&ctx, LogicModule::v1());
        assert!(matches!(result, Err(VaultError::LayoutViolation(_))));
        assert_eq!(vault.logic().version, SchemaVersion::V2);
    }

    #[test]
    fn test_upgrade_blocked_until_reinitialized() {
        let mut vault = initialized();
        let ctx = CallContext::new(admin(), 0);
        vault.authorize_upgrade(&ctx, LogicModule::v2()).unwrap();

        let result = vault.authorize_upgrade(&ctx, LogicModule::v3());
        assert_eq!(result, Err(VaultError::NotInitialized(SchemaVersion::V2)));
    }

    #[test]
    fn test_reinitializer_gating() {
        let mut vault = initialized();
        let ctx = CallContext::new(admin(), 100);

        assert_eq!(
            vault.initialize_v2(&ctx, 500),
            Err(VaultError::FeatureNotActive {
                required: SchemaVersion::V2,
                active: SchemaVersion::V1
            })
        );

        vault.authorize_upgrade(&ctx, LogicModule::v2()).unwrap();
        vault.initialize_v2(&ctx, 500).unwrap();
        assert_eq!(vault.yield_rate_bps(), Some(500));
        assert_eq!(vault.state().v2.as_ref().unwrap().yield_start_time, 100);

        assert_eq!(vault.initialize_v2(&ctx, 700), Err(VaultError::AlreadyInitialized(2)));
        assert_eq!(vault.yield_rate_bps(), Some(500));
    }

    #[test]
    fn test_skipping_to_v3_requires_v2_initializer_first() {
        let mut vault = initialized();
        let ctx = CallContext::new(admin(), 0);
        vault.authorize_upgrade(&ctx, LogicModule::v3()).unwrap();

        assert_eq!(
            vault.initialize_v3(&ctx, 3_600),
            Err(VaultError::NotInitialized(SchemaVersion::V2))
        );
        vault.initialize_v2(&ctx, 500).unwrap();
        vault.initialize_v3(&ctx, 3_600).unwrap();
        assert_eq!(vault.withdrawal_delay_seconds(), Some(3_600));
        assert_eq!(vault.initialized_version(), Some(SchemaVersion::V3));
    }
}
