//! Object substrate for mixin installation.
//!
//! A reduced object model carrying exactly what binding installation and
//! per-origin state accumulation require:
//!
//! - **Data properties** with writable/enumerable/configurable flags and
//!   `[[DefineOwnProperty]]`-style compatibility checks.
//! - **Extensibility** (`[[PreventExtensions]]`) so a non-extensible
//!   context can reject installation.
//! - **A prototype slot** (chain traversal is not needed here).
//! - **Private-field slots** keyed by [`PrivateNameId`], initialized once
//!   per instance.
//!
//! `BTreeMap` everywhere for deterministic ordering and serialization.
//! Accessor descriptors, property enumeration order beyond key listing,
//! and reflection surfaces are deliberately absent.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scope::PrivateNameId;

/// Serialize `BTreeMap<PrivateNameId, JsValue>` as a sorted sequence of
/// `[id, value]` pairs. JSON maps require string keys but private-name
/// ids are numeric, so a vec-of-pairs representation preserves full
/// round-trip fidelity.
mod private_fields_as_seq {
    use super::{BTreeMap, JsValue, PrivateNameId};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<PrivateNameId, JsValue>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&PrivateNameId, &JsValue)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PrivateNameId, JsValue>, D::Error> {
        let pairs: Vec<(PrivateNameId, JsValue)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Handles and keys
// ---------------------------------------------------------------------------

/// Opaque handle referencing an object on the managed heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Opaque handle referencing a function in the function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function#{}", self.0)
    }
}

/// A string property key.
///
/// Mixin installation keys are always names or aliases; symbol keys never
/// arise here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyKey(String);

impl PropertyKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// JsValue — runtime value
// ---------------------------------------------------------------------------

/// Runtime value threaded through mixin evaluation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(ObjectHandle),
    Function(FunctionId),
}

impl JsValue {
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "number",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// SameValue comparison; structural equality is exact for this value
    /// set (no NaN, no -0).
    pub fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Object(h) => write!(f, "[{h}]"),
            Self::Function(id) => write!(f, "[{id}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// PropertyDescriptor — data properties only
// ---------------------------------------------------------------------------

/// A data property descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub value: JsValue,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Default data descriptor: writable, enumerable, configurable.
    pub fn data(value: JsValue) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Descriptor for an installed binding or a recorded contribution:
    /// enumerable but non-writable and non-configurable, so the slot can
    /// never change after initialization.
    pub fn permanent(value: JsValue) -> Self {
        Self {
            value,
            writable: false,
            enumerable: true,
            configurable: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectError
// ---------------------------------------------------------------------------

/// Heap-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectError {
    /// Handle does not reference a live heap object.
    NotFound(ObjectHandle),
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(h) => write!(f, "{h} not found"),
        }
    }
}

impl std::error::Error for ObjectError {}

// ---------------------------------------------------------------------------
// OrdinaryObject
// ---------------------------------------------------------------------------

/// An ordinary object with the internal slots mixin installation touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinaryObject {
    /// `[[Prototype]]` internal slot (`None` means null).
    pub prototype: Option<ObjectHandle>,
    /// `[[Extensible]]` internal slot.
    pub extensible: bool,
    /// Own data properties.
    pub properties: BTreeMap<PropertyKey, PropertyDescriptor>,
    /// Private fields installed on this instance.
    #[serde(with = "private_fields_as_seq")]
    pub private_fields: BTreeMap<PrivateNameId, JsValue>,
}

impl Default for OrdinaryObject {
    fn default() -> Self {
        Self {
            prototype: None,
            extensible: true,
            properties: BTreeMap::new(),
            private_fields: BTreeMap::new(),
        }
    }
}

impl OrdinaryObject {
    pub fn with_prototype(proto: Option<ObjectHandle>) -> Self {
        Self {
            prototype: proto,
            ..Self::default()
        }
    }

    /// `[[GetOwnProperty]]` — own descriptor for `key`.
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.properties.contains_key(key)
    }

    /// `[[DefineOwnProperty]]` — define or update a data property.
    ///
    /// Returns `true` when defined, `false` when rejected: new keys on a
    /// non-extensible object, or incompatible changes to an existing
    /// non-configurable property.
    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        if let Some(current) = self.properties.get(&key) {
            if !current.configurable {
                if desc.configurable {
                    return false;
                }
                if desc.enumerable != current.enumerable {
                    return false;
                }
                if !current.writable {
                    if desc.writable {
                        return false;
                    }
                    if !current.value.same_value(&desc.value) {
                        return false;
                    }
                }
            }
            self.properties.insert(key, desc);
            true
        } else {
            if !self.extensible {
                return false;
            }
            self.properties.insert(key, desc);
            true
        }
    }

    /// Ordinary `set`: update an existing writable data property or
    /// create a new default one. Returns `false` when rejected.
    pub fn set_value(&mut self, key: PropertyKey, value: JsValue) -> bool {
        if let Some(current) = self.properties.get_mut(&key) {
            if !current.writable {
                return false;
            }
            current.value = value;
            true
        } else {
            if !self.extensible {
                return false;
            }
            self.properties.insert(key, PropertyDescriptor::data(value));
            true
        }
    }

    /// `[[Delete]]` — returns `false` for non-configurable properties.
    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            Some(desc) if !desc.configurable => false,
            Some(_) => {
                self.properties.remove(key);
                true
            }
            // Absent keys delete vacuously.
            None => true,
        }
    }

    /// Own property keys in deterministic (lexicographic) order.
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        self.properties.keys().cloned().collect()
    }

    pub fn prevent_extensions(&mut self) {
        self.extensible = false;
    }
}

// ---------------------------------------------------------------------------
// ObjectHeap
// ---------------------------------------------------------------------------

/// Arena of ordinary objects with handle-based access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHeap {
    objects: Vec<OrdinaryObject>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh empty object.
    pub fn alloc(&mut self) -> ObjectHandle {
        self.alloc_object(OrdinaryObject::default())
    }

    /// Allocate a prepared object.
    pub fn alloc_object(&mut self, object: OrdinaryObject) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        self.objects.push(object);
        handle
    }

    pub fn get(&self, handle: ObjectHandle) -> Result<&OrdinaryObject, ObjectError> {
        self.objects
            .get(handle.0 as usize)
            .ok_or(ObjectError::NotFound(handle))
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Result<&mut OrdinaryObject, ObjectError> {
        self.objects
            .get_mut(handle.0 as usize)
            .ok_or(ObjectError::NotFound(handle))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // -- Property operations, handle-addressed ------------------------------

    pub fn define_property(
        &mut self,
        handle: ObjectHandle,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, ObjectError> {
        Ok(self.get_mut(handle)?.define_own_property(key, desc))
    }

    pub fn set_value(
        &mut self,
        handle: ObjectHandle,
        key: PropertyKey,
        value: JsValue,
    ) -> Result<bool, ObjectError> {
        Ok(self.get_mut(handle)?.set_value(key, value))
    }

    pub fn get_value(
        &self,
        handle: ObjectHandle,
        key: &PropertyKey,
    ) -> Result<Option<JsValue>, ObjectError> {
        Ok(self
            .get(handle)?
            .get_own_property(key)
            .map(|desc| desc.value.clone()))
    }

    pub fn has_own(&self, handle: ObjectHandle, key: &PropertyKey) -> Result<bool, ObjectError> {
        Ok(self.get(handle)?.has_own_property(key))
    }

    pub fn own_keys(&self, handle: ObjectHandle) -> Result<Vec<PropertyKey>, ObjectError> {
        Ok(self.get(handle)?.own_property_keys())
    }

    pub fn delete_property(
        &mut self,
        handle: ObjectHandle,
        key: &PropertyKey,
    ) -> Result<bool, ObjectError> {
        Ok(self.get_mut(handle)?.delete(key))
    }

    pub fn is_extensible(&self, handle: ObjectHandle) -> Result<bool, ObjectError> {
        Ok(self.get(handle)?.extensible)
    }

    pub fn prevent_extensions(&mut self, handle: ObjectHandle) -> Result<(), ObjectError> {
        self.get_mut(handle)?.prevent_extensions();
        Ok(())
    }

    pub fn prototype_of(&self, handle: ObjectHandle) -> Result<Option<ObjectHandle>, ObjectError> {
        Ok(self.get(handle)?.prototype)
    }

    pub fn set_prototype(
        &mut self,
        handle: ObjectHandle,
        proto: Option<ObjectHandle>,
    ) -> Result<(), ObjectError> {
        self.get_mut(handle)?.prototype = proto;
        Ok(())
    }

    // -- Private fields ------------------------------------------------------

    /// Initialize a private field on an instance. Returns `false` if the
    /// field is already initialized (initialization happens at most once).
    pub fn init_private(
        &mut self,
        handle: ObjectHandle,
        id: PrivateNameId,
        value: JsValue,
    ) -> Result<bool, ObjectError> {
        let object = self.get_mut(handle)?;
        if object.private_fields.contains_key(&id) {
            return Ok(false);
        }
        object.private_fields.insert(id, value);
        Ok(true)
    }

    pub fn get_private(
        &self,
        handle: ObjectHandle,
        id: PrivateNameId,
    ) -> Result<Option<JsValue>, ObjectError> {
        Ok(self.get(handle)?.private_fields.get(&id).cloned())
    }

    pub fn has_private(&self, handle: ObjectHandle, id: PrivateNameId) -> Result<bool, ObjectError> {
        Ok(self.get(handle)?.private_fields.contains_key(&id))
    }
}
