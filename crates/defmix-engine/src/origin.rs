//! Origin identity for mixin providers.
//!
//! Every provider must expose the identity of its defining compilation
//! unit (module or script). Identities are opaque [`OriginKey`] handles
//! interned at load time by the [`SourceUnitRegistry`]; each unit also
//! carries a SHA-256 digest of its source text for diagnostics and
//! cross-run stability.
//!
//! Only ordinary functions have an origin. Native and bound functions are
//! rejected as providers — there is no checkable compilation unit behind
//! them, which is the enforcement point that keeps the per-origin state
//! partition sound.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MixinError, MixinResult};
use crate::functions::FunctionObject;

// ---------------------------------------------------------------------------
// OriginKey
// ---------------------------------------------------------------------------

/// Opaque, stable identity of a compilation unit.
///
/// Assigned once at load time; equal keys mean the same defining unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OriginKey(pub u32);

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SourceUnit — one loaded module/script
// ---------------------------------------------------------------------------

/// A loaded compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Specifier the unit was loaded under.
    pub name: String,
    /// Lowercase hex SHA-256 of the unit's source text.
    pub digest: String,
}

/// SHA-256 of source text as lowercase hex.
pub fn content_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ---------------------------------------------------------------------------
// SourceUnitRegistry
// ---------------------------------------------------------------------------

/// Interns compilation units and assigns their origin keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnitRegistry {
    units: Vec<SourceUnit>,
    by_name: BTreeMap<String, OriginKey>,
}

impl SourceUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a unit, interning by name. Loading the same name again
    /// returns the previously assigned key unchanged.
    pub fn load(&mut self, name: impl Into<String>, source: &str) -> OriginKey {
        let name = name.into();
        if let Some(&key) = self.by_name.get(&name) {
            return key;
        }
        let key = OriginKey(self.units.len() as u32);
        self.units.push(SourceUnit {
            name: name.clone(),
            digest: content_digest(source),
        });
        self.by_name.insert(name, key);
        key
    }

    pub fn get(&self, key: OriginKey) -> Option<&SourceUnit> {
        self.units.get(key.0 as usize)
    }

    pub fn lookup(&self, name: &str) -> Option<OriginKey> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Origin resolution
// ---------------------------------------------------------------------------

/// Resolve the defining origin of a provider candidate.
///
/// Runs once per source, before any mapping record is created or any
/// provider invoked. Fails with a Type-kind error for callables without
/// a defining unit.
pub fn resolve_origin(function: &FunctionObject) -> MixinResult<OriginKey> {
    function
        .origin()
        .ok_or_else(|| MixinError::ProviderWithoutOrigin {
            name: function.name.clone(),
            kind: function.kind.label().to_string(),
        })
}
