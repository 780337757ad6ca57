//! Vault - Proxy Over Swappable Logic
//!
//! The `Vault` owns the persistent [`VaultState`] and the descriptor of the
//! active [`LogicModule`]. Operations are gated by the active logic version:
//! a V2 operation is refused while V1 logic is active, and also until the V2
//! re-initializer has run.
//!
//! # Atomicity
//!
//! Every public state-changing operation runs inside [`Vault::atomic`]. The
//! state, logic descriptor and event journal are captured first and restored
//! if the operation fails at any point, including a failed asset `push`.
//! A successful operation is only kept if balances still sum to
//! `total_deposits`.

use lib_types::{Address, Bps, Timestamp, MAX_BPS};

use crate::asset::AssetCollaborator;
use crate::errors::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::roles::{Authorized, Role};
use crate::schema::{SchemaVersion, StateV2, StateV3, VaultState};
use crate::upgrade::LogicModule;

/// Authenticated caller and host clock for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Live-upgradeable custodial vault
#[derive(Debug, Clone)]
pub struct Vault {
    logic: LogicModule,
    state: VaultState,
    events: Vec<VaultEvent>,
}

impl Vault {
    /// Deploy a vault behind `logic` with empty state
    ///
    /// Segments for every version up to the logic's version are created.
    pub fn deploy(logic: LogicModule) -> Self {
        let mut state = VaultState::new();
        state.extend_to(logic.version);
        Self {
            logic,
            state,
            events: Vec::new(),
        }
    }

    pub(crate) fn from_parts(logic: LogicModule, state: VaultState) -> Self {
        Self {
            logic,
            state,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // INITIALIZATION
    // ========================================================================

    /// Initialize the vault
    ///
    /// # Arguments
    ///
    /// * `asset` - Identifier of the custodied asset
    /// * `admin` - Receives `Admin` and `Upgrader`
    /// * `deposit_fee_bps` - Fee charged on deposits (0..=10000)
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` if called more than once
    /// - `InvalidParameter` if the fee exceeds 100% or the admin is the zero address
    pub fn initialize(&mut self, asset: Address, admin: Address, deposit_fee_bps: Bps) -> VaultResult<()> {
        self.atomic("initialize", |vault| {
            let current = vault.state.v1.initialized_version;
            if current != 0 {
                return Err(VaultError::AlreadyInitialized(current));
            }
            if deposit_fee_bps > MAX_BPS {
                return Err(VaultError::InvalidParameter(format!(
                    "deposit fee {} bps exceeds {}",
                    deposit_fee_bps, MAX_BPS
                )));
            }
            if admin.is_zero() {
                return Err(VaultError::InvalidParameter(
                    "admin cannot be the zero address".to_string(),
                ));
            }

            let v1 = &mut vault.state.v1;
            v1.asset = asset;
            v1.deposit_fee_bps = deposit_fee_bps;
            v1.roles.bootstrap(admin);
            v1.initialized_version = SchemaVersion::V1.as_u8();

            vault.emit(VaultEvent::Initialized {
                asset,
                admin,
                deposit_fee_bps,
            });
            Ok(())
        })
    }

    /// Check if the V1 initializer has run
    pub fn is_initialized(&self) -> bool {
        self.state.v1.initialized_version >= SchemaVersion::V1.as_u8()
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn logic(&self) -> &LogicModule {
        &self.logic
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    /// Version of the persisted layout (highest segment present)
    pub fn schema_version(&self) -> SchemaVersion {
        self.state.version()
    }

    /// Highest version whose initializer has run
    pub fn initialized_version(&self) -> Option<SchemaVersion> {
        self.state.initialized_version()
    }

    pub fn asset(&self) -> Address {
        self.state.v1.asset
    }

    /// Events committed since the last drain
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Hand the journal to the host
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // ROLE MANAGEMENT
    // ========================================================================

    /// Grant `role` to `principal` (Admin only)
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not an admin
    /// - `FeatureNotActive` if the role is unknown to the active logic
    pub fn grant_role(&mut self, ctx: &CallContext, role: Role, principal: Address) -> VaultResult<bool> {
        self.atomic("grant_role", |vault| {
            vault.require_initialized()?;
            vault.require_logic(role.introduced_in())?;
            let auth = vault.authorize(ctx.caller, Role::Admin)?;

            let granted = vault.state.v1.roles.grant(&auth, role, principal)?;
            if granted {
                vault.emit(VaultEvent::RoleGranted {
                    role,
                    principal,
                    by: ctx.caller,
                });
            }
            Ok(granted)
        })
    }

    /// Revoke `role` from `principal` (Admin only)
    pub fn revoke_role(&mut self, ctx: &CallContext, role: Role, principal: Address) -> VaultResult<bool> {
        self.atomic("revoke_role", |vault| {
            vault.require_initialized()?;
            let auth = vault.authorize(ctx.caller, Role::Admin)?;

            let revoked = vault.state.v1.roles.revoke(&auth, role, principal)?;
            if revoked {
                vault.emit(VaultEvent::RoleRevoked {
                    role,
                    principal,
                    by: ctx.caller,
                });
            }
            Ok(revoked)
        })
    }

    /// Drop a role held by the caller
    pub fn renounce_role(&mut self, ctx: &CallContext, role: Role) -> VaultResult<bool> {
        self.atomic("renounce_role", |vault| {
            vault.require_initialized()?;
            let renounced = vault.state.v1.roles.renounce(ctx.caller, role);
            if renounced {
                vault.emit(VaultEvent::RoleRevoked {
                    role,
                    principal: ctx.caller,
                    by: ctx.caller,
                });
            }
            Ok(renounced)
        })
    }

    pub fn has_role(&self, role: Role, principal: &Address) -> bool {
        self.state.v1.roles.has(role, principal)
    }

    pub fn role_members(&self, role: Role) -> Vec<Address> {
        self.state.v1.roles.members(role).copied().collect()
    }

    // ========================================================================
    // INVARIANTS
    // ========================================================================

    /// Check `sum(balances) == total_deposits`
    pub fn verify_conservation(&self) -> VaultResult<()> {
        let sum = self.state.sum_of_balances().ok_or_else(|| {
            VaultError::InvariantViolation("sum of balances overflows".to_string())
        })?;
        if sum != self.state.v1.total_deposits {
            return Err(VaultError::InvariantViolation(format!(
                "sum of balances {} != total deposits {}",
                sum, self.state.v1.total_deposits
            )));
        }
        Ok(())
    }

    // ========================================================================
    // HOST PLUMBING
    // ========================================================================

    /// Run `op` all-or-nothing
    pub(crate) fn atomic<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut Vault) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let logic = self.logic.clone();
        let state = self.state.clone();
        let journal_len = self.events.len();

        let result = op(self).and_then(|value| {
            self.verify_conservation()?;
            Ok(value)
        });

        if let Err(err) = &result {
            self.logic = logic;
            self.state = state;
            self.events.truncate(journal_len);
            tracing::warn!("Vault: {} rejected ({}): {}", operation, err.code(), err);
        }
        result
    }

    pub(crate) fn emit(&mut self, event: VaultEvent) {
        tracing::info!("Vault: {}", event);
        self.events.push(event);
    }

    pub(crate) fn authorize(&self, caller: Address, role: Role) -> VaultResult<Authorized> {
        self.state.v1.roles.authorize(caller, role)
    }

    pub(crate) fn require_initialized(&self) -> VaultResult<()> {
        if !self.is_initialized() {
            return Err(VaultError::NotInitialized(SchemaVersion::V1));
        }
        Ok(())
    }

    /// The collaborator must move the asset bound at `initialize`
    pub(crate) fn require_asset(&self, asset: &dyn AssetCollaborator) -> VaultResult<()> {
        let expected = self.state.v1.asset;
        let actual = asset.id();
        if actual != expected {
            return Err(VaultError::AssetMismatch { expected, actual });
        }
        Ok(())
    }

    /// Active logic must be at least `required`
    pub(crate) fn require_logic(&self, required: SchemaVersion) -> VaultResult<()> {
        if self.logic.version < required {
            return Err(VaultError::FeatureNotActive {
                required,
                active: self.logic.version,
            });
        }
        Ok(())
    }

    /// Active logic and its initializer must both be at least `required`
    pub(crate) fn require_feature(&self, required: SchemaVersion) -> VaultResult<()> {
        self.require_logic(required)?;
        if self.state.v1.initialized_version < required.as_u8() {
            return Err(VaultError::NotInitialized(required));
        }
        Ok(())
    }

    /// Whether yield settlement applies to balance changes
    pub(crate) fn yield_active(&self) -> bool {
        self.require_feature(SchemaVersion::V2).is_ok()
    }

    pub(crate) fn state_mut(&mut self) -> &mut VaultState {
        &mut self.state
    }

    pub(crate) fn set_logic(&mut self, logic: LogicModule) -> LogicModule {
        std::mem::replace(&mut self.logic, logic)
    }

    pub(crate) fn segment_v2(&self) -> VaultResult<&StateV2> {
        self.state
            .v2
            .as_ref()
            .ok_or_else(|| VaultError::InvariantViolation("V2 segment missing".to_string()))
    }

    pub(crate) fn segment_v2_mut(&mut self) -> VaultResult<&mut StateV2> {
        self.state
            .v2
            .as_mut()
            .ok_or_else(|| VaultError::InvariantViolation("V2 segment missing".to_string()))
    }

    pub(crate) fn segment_v3(&self) -> VaultResult<&StateV3> {
        self.state
            .v3
            .as_ref()
            .ok_or_else(|| VaultError::InvariantViolation("V3 segment missing".to_string()))
    }

    pub(crate) fn segment_v3_mut(&mut self) -> VaultResult<&mut StateV3> {
        self.state
            .v3
            .as_mut()
            .ok_or_else(|| VaultError::InvariantViolation("V3 segment missing".to_string()))
    }
}
