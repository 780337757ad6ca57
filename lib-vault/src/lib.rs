//! Live-Upgradeable Custodial Ledger
//!
//! A vault holding deposited value for many principals. It charges a deposit
//! fee, accrues time-weighted yield and enforces delayed two-phase
//! withdrawals. Its logic can be swapped in place by an `Upgrader` without
//! touching previously persisted state.
//!
//! # Architecture
//!
//! - [`roles`]: role -> principal registry, the single authorization gate
//! - [`schema`]: versioned append-only state layout (V1, V2, V3)
//! - [`vault`]: the proxy holding logic descriptor, state and event journal
//! - [`ledger`]: deposits, direct withdrawals, deposit fee
//! - [`yield_engine`]: simple-interest accrual and claims (V2+)
//! - [`withdrawal`]: delayed withdrawal queue and admin bypass (V3+)
//! - [`upgrade`]: logic swap and per-version re-initializers
//! - [`asset`]: the value-transfer collaborator interface
//! - [`storage`]: segment-per-version persistence (memory, sled)
//! - [`config`]: TOML deployment parameters
//!
//! # Lifecycle
//!
//! ```text
//! deploy(V1) -> initialize -> authorize_upgrade(V2) -> initialize_v2
//!            -> authorize_upgrade(V3) -> initialize_v3
//! ```

pub mod asset;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod roles;
pub mod schema;
pub mod storage;
pub mod upgrade;
pub mod vault;
pub mod withdrawal;
pub mod yield_engine;

pub use asset::{AssetCollaborator, AssetLedger};
pub use config::{load_config, ConfigError, StorageBackend, StorageConfig, VaultConfig};
pub use errors::{VaultError, VaultResult};
pub use events::VaultEvent;
pub use ledger::compute_deposit_fee;
pub use roles::{Authorized, Role, RoleRegistry};
pub use schema::{migrate, MigrationPlan, SchemaVersion, VaultState};
pub use storage::{MemoryStore, SledStore, StateStore, StorageError, StorageResult};
pub use upgrade::LogicModule;
pub use vault::{CallContext, Vault};
pub use withdrawal::{WithdrawalRequestView, WithdrawalStatus};
pub use yield_engine::accrued_yield;
