//! Binding installation: the last step of each source's evaluation.
//!
//! A computed function lands in exactly one of three places:
//!
//! - a standard own data property on the context object (public);
//! - a private field on the instance under construction, keyed by a
//!   private name in the class scope (encapsulated, class elements);
//! - an immutable named binding in the enclosing lexical scope
//!   (encapsulated, function bodies).
//!
//! All three are immutable once initialized: the declaration establishes
//! capability, not mutable state.

use serde::{Deserialize, Serialize};

use crate::declaration::ContextArg;
use crate::error::{MixinError, MixinResult};
use crate::evaluator::{InvocationContext, MixinEvaluator};
use crate::object_model::{JsValue, PropertyDescriptor};

/// Where an installed binding landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallSite {
    /// Own data property on the context object.
    ContextProperty,
    /// Immutable binding in the enclosing lexical scope.
    LexicalBinding,
    /// Private field on the instance under construction.
    PrivateField,
}

impl std::fmt::Display for InstallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ContextProperty => "context property",
            Self::LexicalBinding => "lexical binding",
            Self::PrivateField => "private field",
        })
    }
}

/// Install `value` under `name` according to the declaration's placement
/// flags.
pub fn install(
    eval: &mut MixinEvaluator,
    inv: &InvocationContext,
    install_on_context: bool,
    class_element: bool,
    context: &ContextArg,
    name: &str,
    value: JsValue,
) -> MixinResult<InstallSite> {
    if install_on_context {
        let context_value = context.resolve(&eval.scope)?;
        let JsValue::Object(handle) = context_value else {
            return Err(MixinError::ContextNotObject {
                found: context_value.type_name().to_string(),
            });
        };
        let defined =
            eval.heap
                .define_property(handle, name.into(), PropertyDescriptor::permanent(value))?;
        if !defined {
            return Err(MixinError::InstallRejected {
                key: name.to_string(),
            });
        }
        return Ok(InstallSite::ContextProperty);
    }

    if class_element {
        let instance = inv.this.ok_or(MixinError::NotConstructed)?;
        // The private-name slot is hoisted by the evaluator before the
        // provider runs; resolve it, declaring on the spot if the caller
        // skipped hoisting.
        let id = match eval.scope.private_id(name) {
            Some(id) => id,
            None => eval.scope.declare_private(name)?,
        };
        let initialized = eval.heap.init_private(instance, id, value)?;
        if !initialized {
            return Err(MixinError::InstallRejected {
                key: name.to_string(),
            });
        }
        return Ok(InstallSite::PrivateField);
    }

    eval.scope.create_immutable(name, value)?;
    Ok(InstallSite::LexicalBinding)
}
