//! Role Registry - Capability Binding
//!
//! The Role Registry maps capability tags to the principals holding them:
//! - `Admin`: manages role assignments, global parameters, emergency actions
//! - `Upgrader`: authorizes logic-module swaps
//! - `Pauser`: toggles deposit admission (introduced with schema V2)
//!
//! # Key Invariants
//!
//! 1. **Single Gate**: every privileged operation starts with
//!    [`RoleRegistry::authorize`], which yields an [`Authorized`] proof.
//!    Mutating the registry itself requires an `Admin` proof.
//!
//! 2. **Flat Roles**: `Upgrader` and `Pauser` are not supersets of each other.
//!    `Admin` only has the power to manage assignments, it does not imply the
//!    other capabilities.
//!
//! 3. **No Lockout Check**: revoking the last `Admin` is allowed.
//!
//! Uses BTreeMap/BTreeSet for deterministic serialization.

use lib_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::{VaultError, VaultResult};
use crate::schema::SchemaVersion;

/// Capability tag held by principals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Manage roles, set global parameters, emergency actions
    Admin,
    /// Authorize logic-module swaps
    Upgrader,
    /// Toggle deposit admission
    Pauser,
}

impl Role {
    /// Schema version whose logic first recognizes this role
    pub const fn introduced_in(self) -> SchemaVersion {
        match self {
            Role::Admin | Role::Upgrader => SchemaVersion::V1,
            Role::Pauser => SchemaVersion::V2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "Admin"),
            Self::Upgrader => write!(f, "Upgrader"),
            Self::Pauser => write!(f, "Pauser"),
        }
    }
}

/// Proof that a principal held a role at check time
///
/// Only [`RoleRegistry::authorize`] can construct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized {
    role: Role,
    principal: Address,
}

impl Authorized {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn principal(&self) -> Address {
        self.principal
    }
}

/// Role Registry - role -> principal set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl RoleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the first admin at initialization (no proof exists yet)
    pub(crate) fn bootstrap(&mut self, admin: Address) {
        self.insert(Role::Admin, admin);
        self.insert(Role::Upgrader, admin);
    }

    // ─── Authorization ──────────────────────────────────────────────────────

    /// Check that `caller` holds `role`
    ///
    /// # Errors
    /// - `Unauthorized` if the caller does not hold the role
    pub fn authorize(&self, caller: Address, role: Role) -> VaultResult<Authorized> {
        if !self.has(role, &caller) {
            return Err(VaultError::Unauthorized { role, caller });
        }
        Ok(Authorized {
            role,
            principal: caller,
        })
    }

    fn require_admin(&self, auth: &Authorized) -> VaultResult<()> {
        // Re-check membership: the proof may predate a revoke in the same call
        if auth.role != Role::Admin || !self.has(Role::Admin, &auth.principal) {
            return Err(VaultError::Unauthorized {
                role: Role::Admin,
                caller: auth.principal,
            });
        }
        Ok(())
    }

    // ─── Assignment Management ──────────────────────────────────────────────

    /// Grant `role` to `principal`
    ///
    /// # Returns
    /// `true` if the principal did not already hold the role
    pub fn grant(&mut self, auth: &Authorized, role: Role, principal: Address) -> VaultResult<bool> {
        self.require_admin(auth)?;
        Ok(self.insert(role, principal))
    }

    /// Revoke `role` from `principal`
    ///
    /// # Returns
    /// `true` if the principal held the role
    pub fn revoke(&mut self, auth: &Authorized, role: Role, principal: Address) -> VaultResult<bool> {
        self.require_admin(auth)?;
        Ok(self.remove(role, &principal))
    }

    /// Drop a role held by the caller itself
    pub fn renounce(&mut self, caller: Address, role: Role) -> bool {
        self.remove(role, &caller)
    }

    fn insert(&mut self, role: Role, principal: Address) -> bool {
        self.members.entry(role).or_default().insert(principal)
    }

    fn remove(&mut self, role: Role, principal: &Address) -> bool {
        let Some(set) = self.members.get_mut(&role) else {
            return false;
        };
        let removed = set.remove(principal);
        if set.is_empty() {
            self.members.remove(&role);
        }
        removed
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Check if a principal holds a role
    pub fn has(&self, role: Role, principal: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(principal))
            .unwrap_or(false)
    }

    /// All principals holding a role, in address order
    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }

    /// Roles held by a principal
    pub fn roles_of(&self, principal: &Address) -> Vec<Role> {
        self.members
            .iter()
            .filter(|(_, set)| set.contains(principal))
            .map(|(role, _)| *role)
            .collect()
    }
}
