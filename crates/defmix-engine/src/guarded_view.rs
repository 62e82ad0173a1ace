//! Read-only guarded views over mapping targets.
//!
//! A [`GuardedView`] is the only reference to a per-origin state object
//! ever handed to provider code. Reads pass straight through to the
//! target, so the view never diverges from it. Every mutating operation
//! reports "not performed" (`false`) without raising and without touching
//! the target — the read/observe-but-never-mutate capability the mixin
//! mechanism hands out, not a security boundary.
//!
//! The privileged mutable reference (the raw target handle) stays inside
//! the evaluator's mapping registry.

use serde::{Deserialize, Serialize};

use crate::object_model::{JsValue, ObjectError, ObjectHandle, ObjectHeap, PropertyKey};

/// Read-only façade over a mapping target object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GuardedView {
    target: ObjectHandle,
}

impl GuardedView {
    /// Wrap a target object. Views grant only reads, so constructing one
    /// confers no authority beyond observation.
    pub fn over(target: ObjectHandle) -> Self {
        Self { target }
    }

    // -- Reads: forwarded live to the target --------------------------------

    /// `get` — current value of an own key on the target.
    pub fn get(&self, heap: &ObjectHeap, key: &PropertyKey) -> Result<Option<JsValue>, ObjectError> {
        heap.get_value(self.target, key)
    }

    /// `has` — does the target currently own `key`?
    pub fn has(&self, heap: &ObjectHeap, key: &PropertyKey) -> Result<bool, ObjectError> {
        heap.has_own(self.target, key)
    }

    /// Own-key enumeration, reflecting the target's current contents.
    pub fn own_keys(&self, heap: &ObjectHeap) -> Result<Vec<PropertyKey>, ObjectError> {
        heap.own_keys(self.target)
    }

    /// Extensibility of the underlying target (a read).
    pub fn is_extensible(&self, heap: &ObjectHeap) -> Result<bool, ObjectError> {
        heap.is_extensible(self.target)
    }

    /// Prototype of the underlying target (a read).
    pub fn prototype_of(&self, heap: &ObjectHeap) -> Result<Option<ObjectHandle>, ObjectError> {
        heap.prototype_of(self.target)
    }

    // -- Mutations: all report not-performed --------------------------------

    /// `set` through the view is never performed.
    pub fn set(&self, _heap: &mut ObjectHeap, _key: PropertyKey, _value: JsValue) -> bool {
        false
    }

    /// `delete` through the view is never performed.
    pub fn delete(&self, _heap: &mut ObjectHeap, _key: &PropertyKey) -> bool {
        false
    }

    /// Property definition through the view is never performed.
    pub fn define_property(
        &self,
        _heap: &mut ObjectHeap,
        _key: PropertyKey,
        _value: JsValue,
    ) -> bool {
        false
    }

    /// `preventExtensions` through the view is never performed.
    pub fn prevent_extensions(&self, _heap: &mut ObjectHeap) -> bool {
        false
    }

    /// Prototype replacement through the view is never performed.
    pub fn set_prototype(&self, _heap: &mut ObjectHeap, _proto: Option<ObjectHandle>) -> bool {
        false
    }
}
