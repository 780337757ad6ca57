//! Versioned State Schema
//!
//! The persistent state is a struct of per-version segments. Each schema
//! version appends a segment and never touches the fields of earlier ones:
//!
//! ```text
//! V1: initialized_version, asset, deposit_fee_bps, balances, total_deposits, roles
//! V2: + yield_rate_bps, deposits_paused, accruals, yield_start_time
//! V3: + withdrawal_delay_seconds, withdrawal_requests
//! ```
//!
//! The static layout tables in [`layout`] are checked for append-only
//! evolution at compile time.

pub mod layout;
pub mod state;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use layout::{
    check_append_only, layout_for, migrate, FieldSlot, LayoutFault, MigrationPlan, SchemaLayout,
    LAYOUT_V1, LAYOUT_V2, LAYOUT_V3, SLOT_CAPACITY,
};
pub use state::{Accrual, StateV1, StateV2, StateV3, VaultState, WithdrawalRequest};

/// Schema version of the persistent layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SchemaVersion {
    V1 = 1,
    V2 = 2,
    V3 = 3,
}

impl SchemaVersion {
    /// Newest schema this build knows about
    pub const LATEST: SchemaVersion = SchemaVersion::V3;

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// All versions from V1 up to and including `self`
    pub fn lineage(self) -> impl Iterator<Item = SchemaVersion> {
        (1..=self.as_u8()).filter_map(Self::from_u8)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.as_u8())
    }
}
