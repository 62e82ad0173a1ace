//! Function table and callable representation.
//!
//! Functions are host-supplied Rust closures registered in a
//! [`FunctionTable`] and addressed by [`FunctionId`]. The table
//! distinguishes three kinds:
//!
//! - **Ordinary** — defined by a compilation unit, carries an
//!   [`OriginKey`]; the only kind accepted as a mixin provider.
//! - **Native** — host builtins with no defining unit.
//! - **Bound** — wrappers over another function; the origin of the
//!   wrapped target is deliberately not inherited.
//!
//! Bodies receive the evaluator itself, so an invoked provider can read
//! scope bindings, touch the heap through its guarded view, and even
//! re-entrantly evaluate further mixin declarations.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::declaration::ProviderCall;
use crate::error::{MixinError, MixinResult};
use crate::evaluator::MixinEvaluator;
use crate::object_model::{FunctionId, JsValue};
use crate::origin::OriginKey;

/// A function body: invoked with the evaluator and the structured call.
pub type NativeBody = Rc<dyn Fn(&mut MixinEvaluator, &ProviderCall) -> MixinResult<JsValue>>;

// ---------------------------------------------------------------------------
// FunctionKind
// ---------------------------------------------------------------------------

/// Classification of a callable, deciding origin resolvability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// Defined by a compilation unit.
    Ordinary { origin: OriginKey },
    /// Host builtin; no defining unit.
    Native,
    /// Bound wrapper; hides the target's origin.
    Bound { target: FunctionId },
}

impl FunctionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ordinary { .. } => "ordinary",
            Self::Native => "native",
            Self::Bound { .. } => "bound",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// FunctionObject
// ---------------------------------------------------------------------------

/// A callable registered in the table.
#[derive(Clone)]
pub struct FunctionObject {
    /// Display name. For direct function-reference sources it doubles as
    /// the contribution key and the default installed-binding name.
    pub name: String,
    pub kind: FunctionKind,
    pub body: NativeBody,
}

impl FunctionObject {
    pub fn ordinary(name: impl Into<String>, origin: OriginKey, body: NativeBody) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Ordinary { origin },
            body,
        }
    }

    pub fn native(name: impl Into<String>, body: NativeBody) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Native,
            body,
        }
    }

    pub fn bound(name: impl Into<String>, target: FunctionId, body: NativeBody) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Bound { target },
            body,
        }
    }

    /// Defining origin, if this callable has one.
    pub fn origin(&self) -> Option<OriginKey> {
        match self.kind {
            FunctionKind::Ordinary { origin } => Some(origin),
            FunctionKind::Native | FunctionKind::Bound { .. } => None,
        }
    }
}

impl fmt::Debug for FunctionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionObject")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FunctionTable
// ---------------------------------------------------------------------------

/// Monotonic registry of callables.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    entries: Vec<FunctionObject>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, function: FunctionObject) -> FunctionId {
        let id = FunctionId(self.entries.len() as u32);
        self.entries.push(function);
        id
    }

    pub fn get(&self, id: FunctionId) -> MixinResult<&FunctionObject> {
        self.entries
            .get(id.0 as usize)
            .ok_or(MixinError::UnknownFunction { id })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
