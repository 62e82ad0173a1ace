//! Per-origin mapping records and the collision checker.
//!
//! Each distinct provider origin gets exactly one [`MappingRecord`] per
//! enclosing scope: a mutable target state object plus its
//! [`GuardedView`]. Records are created lazily, never destroyed while
//! the scope lives, and `resolve_or_create` is idempotent — re-entrant
//! resolution for the same origin converges on the same record, so state
//! accumulates across multiple declarations from one origin.
//!
//! Contribution writes go through [`record_contribution`], which
//! re-verifies the key immediately before writing. Together with the
//! caller's pre-invocation collision check this makes check-plus-write
//! indivisible with respect to synchronous re-entrancy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MixinError, MixinResult};
use crate::guarded_view::GuardedView;
use crate::object_model::{JsValue, ObjectHandle, ObjectHeap, PropertyDescriptor, PropertyKey};
use crate::origin::OriginKey;

// ---------------------------------------------------------------------------
// MappingRecord
// ---------------------------------------------------------------------------

/// The (target, view) pair owned per (scope, origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Mutable per-origin state object. Never handed to provider code.
    pub target: ObjectHandle,
    /// Read-only façade over `target`; the only reference providers see.
    pub view: GuardedView,
}

// ---------------------------------------------------------------------------
// MappingRegistry
// ---------------------------------------------------------------------------

/// Append-only map from origin key to mapping record, owned by one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRegistry {
    records: BTreeMap<OriginKey, MappingRecord>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `origin`, creating target and view on first
    /// resolution. Idempotent: a second call returns the identical
    /// record with no observable side effect.
    pub fn resolve_or_create(&mut self, heap: &mut ObjectHeap, origin: OriginKey) -> MappingRecord {
        if let Some(&record) = self.records.get(&origin) {
            return record;
        }
        let target = heap.alloc();
        let record = MappingRecord {
            target,
            view: GuardedView::over(target),
        };
        self.records.insert(origin, record);
        record
    }

    pub fn get(&self, origin: OriginKey) -> Option<MappingRecord> {
        self.records.get(&origin).copied()
    }

    pub fn origins(&self) -> impl Iterator<Item = OriginKey> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Collision checking and contribution recording
// ---------------------------------------------------------------------------

/// Fail if `key` is already owned by the record's target. Runs before
/// the provider for this key is invoked, so a colliding declaration
/// fails without side effects from that provider.
pub fn ensure_key_free(
    heap: &ObjectHeap,
    record: MappingRecord,
    key: &PropertyKey,
) -> MixinResult<()> {
    if heap.has_own(record.target, key)? {
        return Err(MixinError::DuplicateContribution {
            key: key.as_str().to_string(),
        });
    }
    Ok(())
}

/// Write a provider's result into the target under `key`.
///
/// Re-checks that the key is still free: a provider that re-entrantly
/// installed the same key between the caller's collision check and this
/// write makes the outer contribution the duplicate. Recorded entries
/// are enumerable, non-writable, non-configurable.
pub fn record_contribution(
    heap: &mut ObjectHeap,
    record: MappingRecord,
    key: &PropertyKey,
    value: JsValue,
) -> MixinResult<()> {
    ensure_key_free(heap, record, key)?;
    let defined = heap.define_property(
        record.target,
        key.clone(),
        PropertyDescriptor::permanent(value),
    )?;
    if !defined {
        return Err(MixinError::InstallRejected {
            key: key.as_str().to_string(),
        });
    }
    Ok(())
}
