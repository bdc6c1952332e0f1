//! Change Detection Strategies
//!
//! Decide, for one bidirectional tag of one pair, which sides changed since
//! the pair was last reconciled.
//!
//! ## Strategies
//!
//! - [`LedgerDetector`] compares current values with the per-tag ledger.
//!   A side counts as changed when its value differs from its own baseline
//!   and also from the other side's baseline. The second test keeps a value
//!   that was propagated in the previous run from reading as a fresh edit.
//!   Without a ledger row nothing is known and both sides count as changed.
//! - [`ModificationTimeDetector`] compares file modification times with the
//!   pair's last sync time. Equal modification times with differing values
//!   count as both changed.

use bridge_traits::tags::{matches_baseline, values_equal, TagValue};
use core_library::models::SyncStateTag;
use core_runtime::config::ChangeDetection;

/// Everything a detector may look at for one tag
#[derive(Debug, Clone, Copy)]
pub struct ChangeInput<'a> {
    pub tag: &'a str,
    pub a: Option<&'a TagValue>,
    pub b: Option<&'a TagValue>,
    pub baseline: Option<&'a SyncStateTag>,
    pub mtime_a: i64,
    pub mtime_b: i64,
    pub last_sync: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    pub a_changed: bool,
    pub b_changed: bool,
}

pub trait ChangeDetector: Send + Sync {
    fn detect(&self, input: &ChangeInput<'_>) -> Changes;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerDetector;

impl ChangeDetector for LedgerDetector {
    fn detect(&self, input: &ChangeInput<'_>) -> Changes {
        let Some(row) = input.baseline else {
            return Changes {
                a_changed: true,
                b_changed: true,
            };
        };

        let base_a = row.source_a_value.as_deref();
        let base_b = row.source_b_value.as_deref();

        Changes {
            a_changed: !matches_baseline(input.tag, input.a, base_a)
                && !matches_baseline(input.tag, input.a, base_b),
            b_changed: !matches_baseline(input.tag, input.b, base_b)
                && !matches_baseline(input.tag, input.b, base_a),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModificationTimeDetector;

impl ChangeDetector for ModificationTimeDetector {
    fn detect(&self, input: &ChangeInput<'_>) -> Changes {
        if input.mtime_a == input.mtime_b && !values_equal(input.tag, input.a, input.b) {
            return Changes {
                a_changed: true,
                b_changed: true,
            };
        }

        Changes {
            a_changed: input.mtime_a > input.last_sync,
            b_changed: input.mtime_b > input.last_sync,
        }
    }
}

pub fn detector_for(strategy: ChangeDetection) -> Box<dyn ChangeDetector> {
    match strategy {
        ChangeDetection::Ledger => Box::new(LedgerDetector),
        ChangeDetection::ModificationTime => Box::new(ModificationTimeDetector),
    }
}
