//! Static field layouts per schema version
//!
//! Every version declares its persistent fields as `(slot, name)` pairs over a
//! fixed slot capacity. Slots past the last declared field are reserved space
//! that a later version may append into. A layout transition is valid only if
//! every existing field keeps its slot and name and new fields fill the next
//! reserved slots in order.

use std::fmt;

use super::SchemaVersion;
use crate::errors::{VaultError, VaultResult};

/// Total slots available to the vault across all versions
pub const SLOT_CAPACITY: u16 = 32;

/// One persistent field at a fixed slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub slot: u16,
    pub name: &'static str,
    /// Version whose segment carries the field
    pub segment: SchemaVersion,
}

impl FieldSlot {
    const fn new(slot: u16, name: &'static str, segment: SchemaVersion) -> Self {
        Self { slot, name, segment }
    }
}

/// Ordered field list for one schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaLayout {
    pub version: SchemaVersion,
    pub capacity: u16,
    pub fields: &'static [FieldSlot],
}

impl SchemaLayout {
    /// Slots still free for later versions
    pub const fn reserved(&self) -> u16 {
        self.capacity - self.fields.len() as u16
    }

    /// Fields carried by one segment, in slot order
    pub fn segment_fields(&self, segment: SchemaVersion) -> impl Iterator<Item = &'static FieldSlot> {
        let fields: &'static [FieldSlot] = self.fields;
        fields.iter().filter(move |f| f.segment == segment)
    }
}

const V1_FIELDS: [FieldSlot; 6] = [
    FieldSlot::new(0, "initialized_version", SchemaVersion::V1),
    FieldSlot::new(1, "asset", SchemaVersion::V1),
    FieldSlot::new(2, "deposit_fee_bps", SchemaVersion::V1),
    FieldSlot::new(3, "balances", SchemaVersion::V1),
    FieldSlot::new(4, "total_deposits", SchemaVersion::V1),
    FieldSlot::new(5, "roles", SchemaVersion::V1),
];

const V2_FIELDS: [FieldSlot; 10] = [
    V1_FIELDS[0],
    V1_FIELDS[1],
    V1_FIELDS[2],
    V1_FIELDS[3],
    V1_FIELDS[4],
    V1_FIELDS[5],
    FieldSlot::new(6, "yield_rate_bps", SchemaVersion::V2),
    FieldSlot::new(7, "deposits_paused", SchemaVersion::V2),
    FieldSlot::new(8, "accruals", SchemaVersion::V2),
    FieldSlot::new(9, "yield_start_time", SchemaVersion::V2),
];

const V3_FIELDS: [FieldSlot; 12] = [
    V2_FIELDS[0],
    V2_FIELDS[1],
    V2_FIELDS[2],
    V2_FIELDS[3],
    V2_FIELDS[4],
    V2_FIELDS[5],
    V2_FIELDS[6],
    V2_FIELDS[7],
    V2_FIELDS[8],
    V2_FIELDS[9],
    FieldSlot::new(10, "withdrawal_delay_seconds", SchemaVersion::V3),
    FieldSlot::new(11, "withdrawal_requests", SchemaVersion::V3),
];

pub const LAYOUT_V1: SchemaLayout = SchemaLayout {
    version: SchemaVersion::V1,
    capacity: SLOT_CAPACITY,
    fields: &V1_FIELDS,
};

pub const LAYOUT_V2: SchemaLayout = SchemaLayout {
    version: SchemaVersion::V2,
    capacity: SLOT_CAPACITY,
    fields: &V2_FIELDS,
};

pub const LAYOUT_V3: SchemaLayout = SchemaLayout {
    version: SchemaVersion::V3,
    capacity: SLOT_CAPACITY,
    fields: &V3_FIELDS,
};

// Compile-time enforcement of the append-only rule
const _: () = assert!(matches!(check_well_formed(&LAYOUT_V1), Ok(())));
const _: () = assert!(matches!(check_append_only(&LAYOUT_V1, &LAYOUT_V2), Ok(())));
const _: () = assert!(matches!(check_append_only(&LAYOUT_V2, &LAYOUT_V3), Ok(())));

/// Static layout for a version
pub const fn layout_for(version: SchemaVersion) -> &'static SchemaLayout {
    match version {
        SchemaVersion::V1 => &LAYOUT_V1,
        SchemaVersion::V2 => &LAYOUT_V2,
        SchemaVersion::V3 => &LAYOUT_V3,
    }
}

/// Reason a layout transition breaks the append-only rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutFault {
    CapacityChanged { from: u16, to: u16 },
    FieldRemoved { name: &'static str },
    FieldMoved { name: &'static str, from_slot: u16, to_slot: u16 },
    NotAppended { name: &'static str, slot: u16, expected: u16 },
    CapacityExceeded { name: &'static str, slot: u16 },
}

impl fmt::Display for LayoutFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityChanged { from, to } => {
                write!(f, "slot capacity changed from {} to {}", from, to)
            }
            Self::FieldRemoved { name } => write!(f, "field '{}' removed", name),
            Self::FieldMoved { name, from_slot, to_slot } => {
                write!(f, "field '{}' moved from slot {} to slot {}", name, from_slot, to_slot)
            }
            Self::NotAppended { name, slot, expected } => write!(
                f,
                "field '{}' placed at slot {}, next free slot is {}",
                name, slot, expected
            ),
            Self::CapacityExceeded { name, slot } => {
                write!(f, "field '{}' at slot {} exceeds reserved capacity", name, slot)
            }
        }
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

/// Slots must run contiguously from 0 and stay within capacity
pub const fn check_well_formed(layout: &SchemaLayout) -> Result<(), LayoutFault> {
    let mut i = 0;
    while i < layout.fields.len() {
        let field = layout.fields[i];
        if field.slot != i as u16 {
            return Err(LayoutFault::NotAppended {
                name: field.name,
                slot: field.slot,
                expected: i as u16,
            });
        }
        if field.slot >= layout.capacity {
            return Err(LayoutFault::CapacityExceeded {
                name: field.name,
                slot: field.slot,
            });
        }
        i += 1;
    }
    Ok(())
}

/// Check that `next` only appends to `prev`
pub const fn check_append_only(prev: &SchemaLayout, next: &SchemaLayout) -> Result<(), LayoutFault> {
    if prev.capacity != next.capacity {
        return Err(LayoutFault::CapacityChanged {
            from: prev.capacity,
            to: next.capacity,
        });
    }

    let mut i = 0;
    while i < prev.fields.len() {
        let old = prev.fields[i];
        match find_field(next, old.name) {
            None => return Err(LayoutFault::FieldRemoved { name: old.name }),
            Some(new) => {
                if new.slot != old.slot {
                    return Err(LayoutFault::FieldMoved {
                        name: old.name,
                        from_slot: old.slot,
                        to_slot: new.slot,
                    });
                }
            }
        }
        i += 1;
    }

    if next.fields.len() < prev.fields.len() {
        return Err(LayoutFault::FieldRemoved {
            name: prev.fields[next.fields.len()].name,
        });
    }

    let mut expected = prev.fields.len() as u16;
    while i < next.fields.len() {
        let field = next.fields[i];
        if field.slot != expected {
            return Err(LayoutFault::NotAppended {
                name: field.name,
                slot: field.slot,
                expected,
            });
        }
        if field.slot >= prev.capacity {
            return Err(LayoutFault::CapacityExceeded {
                name: field.name,
                slot: field.slot,
            });
        }
        expected += 1;
        i += 1;
    }
    Ok(())
}

const fn find_field(layout: &SchemaLayout, name: &str) -> Option<FieldSlot> {
    let mut i = 0;
    while i < layout.fields.len() {
        if str_eq(layout.fields[i].name, name) {
            return Some(layout.fields[i]);
        }
        i += 1;
    }
    None
}

/// Outcome of a validated layout transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    /// Fields the transition appends, in slot order
    pub added: Vec<FieldSlot>,
    /// Segments that must be created with default values
    pub new_segments: Vec<SchemaVersion>,
    pub reserved_remaining: u16,
}

/// Validate the transition from one layout to another
///
/// A downgrade would drop fields and is rejected like any other violation.
pub fn migrate(from: SchemaVersion, to: SchemaVersion) -> VaultResult<MigrationPlan> {
    let prev = layout_for(from);
    let next = layout_for(to);

    check_append_only(prev, next)
        .map_err(|fault| VaultError::LayoutViolation(format!("{} -> {}: {}", from, to, fault)))?;

    Ok(MigrationPlan {
        from,
        to,
        added: next.fields[prev.fields.len()..].to_vec(),
        new_segments: to.lineage().filter(|v| *v > from).collect(),
        reserved_remaining: next.reserved(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_migrations_are_valid() {
        let plan = migrate(SchemaVersion::V1, SchemaVersion::V2).unwrap();
        assert_eq!(plan.added.len(), 4);
        assert_eq!(plan.added[0].slot, 6);
        assert_eq!(plan.new_segments, vec![SchemaVersion::V2]);
        assert_eq!(plan.reserved_remaining, SLOT_CAPACITY - 10);

        let plan = migrate(SchemaVersion::V1, SchemaVersion::V3).unwrap();
        assert_eq!(plan.new_segments, vec![SchemaVersion::V2, SchemaVersion::V3]);
        assert_eq!(plan.added.len(), 6);
    }

    #[test]
    fn test_same_version_migration_adds_nothing() {
        let plan = migrate(SchemaVersion::V2, SchemaVersion::V2).unwrap();
        assert!(plan.added.is_empty());
        assert!(plan.new_segments.is_empty());
    }

    #[test]
    fn test_downgrade_is_violation() {
        let err = migrate(SchemaVersion::V3, SchemaVersion::V2).unwrap_err();
        match err {
            VaultError::LayoutViolation(msg) => {
                assert!(msg.contains("withdrawal_delay_seconds"), "{}", msg)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    static REORDERED: [FieldSlot; 7] = [
        V1_FIELDS[0],
        V1_FIELDS[1],
        V1_FIELDS[2],
        FieldSlot::new(3, "total_deposits", SchemaVersion::V1),
        FieldSlot::new(4, "balances", SchemaVersion::V1),
        V1_FIELDS[5],
        FieldSlot::new(6, "extra", SchemaVersion::V2),
    ];

    static GAPPED: [FieldSlot; 7] = [
        V1_FIELDS[0],
        V1_FIELDS[1],
        V1_FIELDS[2],
        V1_FIELDS[3],
        V1_FIELDS[4],
        V1_FIELDS[5],
        FieldSlot::new(8, "extra", SchemaVersion::V2),
    ];

    static RENAMED: [FieldSlot; 6] = [
        V1_FIELDS[0],
        V1_FIELDS[1],
        FieldSlot::new(2, "fee_bps", SchemaVersion::V1),
        V1_FIELDS[3],
        V1_FIELDS[4],
        V1_FIELDS[5],
    ];

    static OVERFLOWING: [FieldSlot; 7] = [
        V1_FIELDS[0],
        V1_FIELDS[1],
        V1_FIELDS[2],
        V1_FIELDS[3],
        V1_FIELDS[4],
        V1_FIELDS[5],
        FieldSlot::new(6, "extra", SchemaVersion::V2),
    ];

    fn candidate(fields: &'static [FieldSlot], capacity: u16) -> SchemaLayout {
        SchemaLayout {
            version: SchemaVersion::V2,
            capacity,
            fields,
        }
    }

    #[test]
    fn test_reordering_detected() {
        let fault = check_append_only(&LAYOUT_V1, &candidate(&REORDERED, SLOT_CAPACITY)).unwrap_err();
        assert_eq!(
            fault,
            LayoutFault::FieldMoved {
                name: "balances",
                from_slot: 3,
                to_slot: 4
            }
        );
    }

    #[test]
    fn test_gap_detected() {
        let fault = check_append_only(&LAYOUT_V1, &candidate(&GAPPED, SLOT_CAPACITY)).unwrap_err();
        assert!(matches!(fault, LayoutFault::NotAppended { slot: 8, expected: 6, .. }));
    }

    #[test]
    fn test_rename_is_removal() {
        let fault = check_append_only(&LAYOUT_V1, &candidate(&RENAMED, SLOT_CAPACITY)).unwrap_err();
        assert_eq!(fault, LayoutFault::FieldRemoved { name: "deposit_fee_bps" });
    }

    #[test]
    fn test_capacity_is_fixed_and_bounded() {
        let fault = check_append_only(&LAYOUT_V1, &candidate(&OVERFLOWING, 6)).unwrap_err();
        assert!(matches!(fault, LayoutFault::CapacityChanged { from: 32, to: 6 }));

        let tight = SchemaLayout {
            version: SchemaVersion::V1,
            capacity: 6,
            fields: &V1_FIELDS,
        };
        let fault = check_append_only(&tight, &candidate(&OVERFLOWING, 6)).unwrap_err();
        assert!(matches!(fault, LayoutFault::CapacityExceeded { slot: 6, .. }));
    }

    #[test]
    fn test_segment_fields() {
        let names: Vec<_> = LAYOUT_V3
            .segment_fields(SchemaVersion::V3)
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["withdrawal_delay_seconds", "withdrawal_requests"]);
    }
}
