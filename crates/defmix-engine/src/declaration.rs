//! Parsed mixin declarations and the provider call surface.
//!
//! The host parser hands the evaluator a [`MixinDeclaration`]: a context
//! expression, an ordered source list (each with an optional alias), an
//! ordered list of extra binding expressions, placement flags, and the
//! evaluation variant. Expressions arrive pre-parsed as the minimal
//! forms the algorithm consumes ([`Expr`]); the host grammar itself is
//! out of scope.
//!
//! [`ProviderCall`] is what an invoked provider receives: the context
//! (value, live read-only alias, or the no-context sentinel), the
//! guarded view of its origin's state, and the shared extra arguments.

use serde::{Deserialize, Serialize};

use crate::error::{MixinError, MixinResult};
use crate::guarded_view::GuardedView;
use crate::object_model::{FunctionId, JsValue};
use crate::scope::ScopeRecord;

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Pre-parsed expression forms consumed by mixin evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value.
    Literal(JsValue),
    /// A binding lookup in the enclosing scope.
    Binding(String),
    /// A direct function reference.
    Function(FunctionId),
    /// The instance under construction.
    This,
}

// ---------------------------------------------------------------------------
// Declaration surface
// ---------------------------------------------------------------------------

/// One source of a mixin declaration: an expression plus optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinSource {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl MixinSource {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// How context and view are threaded into providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixinVariant {
    /// Context evaluated to a value before provider invocation.
    Direct,
    /// Context passed as a live read-only alias; no context object is
    /// materialized when installation onto the context is not requested.
    IndirectBinding,
}

/// A parsed mixin declaration, evaluated exactly once per dynamic
/// execution of its enclosing declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinDeclaration {
    pub variant: MixinVariant,
    pub context: Expr,
    pub sources: Vec<MixinSource>,
    pub extras: Vec<Expr>,
    /// Install results as public properties on the context object.
    pub install_on_context: bool,
    /// Declaration appears as a class element rather than a function-body
    /// statement.
    pub class_element: bool,
}

impl MixinDeclaration {
    pub fn new(variant: MixinVariant, context: Expr) -> Self {
        Self {
            variant,
            context,
            sources: Vec::new(),
            extras: Vec::new(),
            install_on_context: false,
            class_element: false,
        }
    }

    pub fn with_source(mut self, expr: Expr) -> Self {
        self.sources.push(MixinSource::new(expr));
        self
    }

    pub fn with_aliased_source(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.sources.push(MixinSource::aliased(expr, alias));
        self
    }

    pub fn with_extra(mut self, expr: Expr) -> Self {
        self.extras.push(expr);
        self
    }

    pub fn install_on_context(mut self, install: bool) -> Self {
        self.install_on_context = install;
        self
    }

    pub fn as_class_element(mut self) -> Self {
        self.class_element = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Indirect references and the provider call
// ---------------------------------------------------------------------------

/// Live, read-only alias to a scope binding. Dereferences to the
/// binding's current value at call time; there is no write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndirectRef {
    binding: String,
}

impl IndirectRef {
    pub fn new(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
        }
    }

    pub fn binding_name(&self) -> &str {
        &self.binding
    }

    /// Current value of the aliased binding.
    pub fn get(&self, scope: &ScopeRecord) -> MixinResult<JsValue> {
        scope
            .get(&self.binding)
            .cloned()
            .ok_or_else(|| MixinError::UnresolvedBinding {
                name: self.binding.clone(),
            })
    }
}

/// The context argument as a provider sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextArg {
    /// Resolved context value (Variant A).
    Value(JsValue),
    /// Live read-only alias to the context binding (Variant B).
    Indirect(IndirectRef),
    /// No context was materialized; providers observe `null`.
    None,
}

impl ContextArg {
    /// Resolve to the value the provider observes right now.
    pub fn resolve(&self, scope: &ScopeRecord) -> MixinResult<JsValue> {
        match self {
            Self::Value(v) => Ok(v.clone()),
            Self::Indirect(alias) => alias.get(scope),
            Self::None => Ok(JsValue::Null),
        }
    }
}

/// Arguments handed to a provider invocation:
/// `(context-or-null, guarded-view, ...extras)`.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub context: ContextArg,
    pub view: GuardedView,
    /// Extra binding arguments, evaluated once per declaration and
    /// reused verbatim for every source.
    pub extras: Vec<JsValue>,
}

impl ProviderCall {
    /// The context value at this moment (live for indirect aliases).
    pub fn context_value(&self, scope: &ScopeRecord) -> MixinResult<JsValue> {
        self.context.resolve(scope)
    }
}
