//! Custodial ledger primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: No String identifiers in persisted state. Ever.

pub mod primitives;

pub use primitives::{Address, Amount, Bps, Timestamp, MAX_BPS, SECONDS_PER_YEAR};
