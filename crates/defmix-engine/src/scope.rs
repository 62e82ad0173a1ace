//! Scope records: lexical bindings, private names, and per-scope mixin
//! state.
//!
//! A [`ScopeRecord`] models the slice of an environment record the mixin
//! algorithm touches: named binding slots (immutable after initialization
//! for mixin-installed bindings), the private-name table of a class
//! scope, and exclusive ownership of the scope's [`MappingRegistry`].
//!
//! Private-name slots are hoisted (declared) before the provider that
//! fills them runs; the instance field itself is initialized at install
//! time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MixinError, MixinResult};
use crate::mapping::MappingRegistry;
use crate::object_model::JsValue;

// ---------------------------------------------------------------------------
// PrivateNameId
// ---------------------------------------------------------------------------

/// Opaque identity of a private name (`#name`) within a class scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrivateNameId(pub u32);

impl fmt::Display for PrivateNameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "private#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ScopeKind / BindingSlot
// ---------------------------------------------------------------------------

/// What kind of declaration owns this scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// A function body; mixin bindings become plain named constants.
    Function,
    /// A class body; encapsulated mixin bindings become private fields.
    Class,
}

/// A single binding slot in a scope record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSlot {
    pub name: String,
    pub value: JsValue,
    /// `false` for mixin-installed bindings: immutable after init.
    pub mutable: bool,
}

// ---------------------------------------------------------------------------
// ScopeRecord
// ---------------------------------------------------------------------------

/// The enclosing scope as seen by mixin evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRecord {
    pub kind: ScopeKind,
    bindings: BTreeMap<String, BindingSlot>,
    private_names: BTreeMap<String, PrivateNameId>,
    next_private: u32,
    /// Per-origin mixin state, owned exclusively by this scope.
    pub registry: MappingRegistry,
}

impl ScopeRecord {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            bindings: BTreeMap::new(),
            private_names: BTreeMap::new(),
            next_private: 0,
            registry: MappingRegistry::new(),
        }
    }

    // -- Lexical bindings ----------------------------------------------------

    /// Create an immutable, initialized binding. Duplicate declarations
    /// fail with a Syntax-kind error.
    pub fn create_immutable(&mut self, name: impl Into<String>, value: JsValue) -> MixinResult<()> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(MixinError::DuplicateBinding { name });
        }
        self.bindings.insert(
            name.clone(),
            BindingSlot {
                name,
                value,
                mutable: false,
            },
        );
        Ok(())
    }

    /// Create a mutable binding (host setup: contexts, provider
    /// references).
    pub fn create_mutable(&mut self, name: impl Into<String>, value: JsValue) -> MixinResult<()> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(MixinError::DuplicateBinding { name });
        }
        self.bindings.insert(
            name.clone(),
            BindingSlot {
                name,
                value,
                mutable: true,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&JsValue> {
        self.bindings.get(name).map(|slot| &slot.value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Assign to an existing binding. Immutable bindings reject the
    /// write with a Type-kind error.
    pub fn assign(&mut self, name: &str, value: JsValue) -> MixinResult<()> {
        match self.bindings.get_mut(name) {
            None => Err(MixinError::UnresolvedBinding {
                name: name.to_string(),
            }),
            Some(slot) if !slot.mutable => Err(MixinError::ImmutableBinding {
                name: name.to_string(),
            }),
            Some(slot) => {
                slot.value = value;
                Ok(())
            }
        }
    }

    // -- Private names -------------------------------------------------------

    /// Declare (hoist) a private name. Only class scopes carry a
    /// private-name table; duplicates and non-class scopes fail with a
    /// Syntax-kind error.
    pub fn declare_private(&mut self, name: impl Into<String>) -> MixinResult<PrivateNameId> {
        let name = name.into();
        if self.kind != ScopeKind::Class {
            return Err(MixinError::PrivateNameOutsideClass { name });
        }
        if self.private_names.contains_key(&name) {
            return Err(MixinError::DuplicatePrivateName { name });
        }
        let id = PrivateNameId(self.next_private);
        self.next_private += 1;
        self.private_names.insert(name, id);
        Ok(id)
    }

    pub fn private_id(&self, name: &str) -> Option<PrivateNameId> {
        self.private_names.get(name).copied()
    }
}
