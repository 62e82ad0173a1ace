//! Mixin-declaration evaluation: the per-declaration state machine.
//!
//! One declaration runs `ResolvingContext -> ResolvingSources ->
//! ResolvingBindings -> Installing -> Done`, with the terminal
//! `Rejected` reachable from every non-terminal state. Evaluation is a
//! single synchronous step of the enclosing declaration's instantiation;
//! the only reachable interleaving is a provider that re-entrantly
//! evaluates another declaration in the same scope.
//!
//! Ordering guarantees:
//!
//! - Sources are processed strictly in declaration order.
//! - Variant A resolves every source reference (callability + origin)
//!   before any provider is invoked, so one invalid source rejects the
//!   declaration with zero provider side effects.
//! - Variant B interleaves resolution, invocation, and installation per
//!   source.
//! - Extra binding arguments are evaluated left-to-right exactly once
//!   and reused verbatim for every source.
//! - An alias renames only the installed binding. The contribution is
//!   always recorded into the origin's target under the source's own
//!   lookup name, so sibling providers from the same origin can reach
//!   each other through the view regardless of what consumers call them.
//!
//! Failures abort the remainder of the declaration; earlier sources'
//! installed bindings are deliberately not rolled back.

use serde::{Deserialize, Serialize};

use crate::declaration::{
    ContextArg, Expr, IndirectRef, MixinDeclaration, MixinSource, MixinVariant, ProviderCall,
};
use crate::error::{MixinError, MixinResult};
use crate::functions::FunctionTable;
use crate::installer::{self, InstallSite};
use crate::mapping;
use crate::object_model::{FunctionId, JsValue, ObjectHandle, ObjectHeap, PropertyKey};
use crate::origin::{self, OriginKey, SourceUnitRegistry};
use crate::scope::{ScopeKind, ScopeRecord};

// ---------------------------------------------------------------------------
// EvalPhase
// ---------------------------------------------------------------------------

/// States of the per-declaration evaluation machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalPhase {
    ResolvingContext,
    ResolvingSources,
    ResolvingBindings,
    Installing,
    Done,
    Rejected,
}

impl std::fmt::Display for EvalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ResolvingContext => "resolving_context",
            Self::ResolvingSources => "resolving_sources",
            Self::ResolvingBindings => "resolving_bindings",
            Self::Installing => "installing",
            Self::Done => "done",
            Self::Rejected => "rejected",
        })
    }
}

// ---------------------------------------------------------------------------
// InvocationContext
// ---------------------------------------------------------------------------

/// How the enclosing declaration was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Invoked with construction semantics (`new`-style call).
    pub constructed: bool,
    /// Instance under construction, when there is one.
    pub this: Option<ObjectHandle>,
}

impl InvocationContext {
    /// A plain (non-constructor) call.
    pub fn plain() -> Self {
        Self::default()
    }

    /// A constructor call with `this` under construction.
    pub fn constructor(this: ObjectHandle) -> Self {
        Self {
            constructed: true,
            this: Some(this),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// One binding produced by a successfully evaluated declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledBinding {
    /// Name the binding installed under (the alias when one was given).
    pub name: String,
    /// Key the contribution was recorded under in the origin's target:
    /// the source's own lookup name, never the alias.
    pub key: String,
    pub origin: OriginKey,
    pub site: InstallSite,
}

/// Receipt for a fully evaluated declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinOutcome {
    pub installed: Vec<InstalledBinding>,
}

/// A source after reference resolution.
#[derive(Debug, Clone)]
struct ResolvedSource {
    func: FunctionId,
    origin: OriginKey,
    /// Contribution key on the origin's target: the source's own lookup
    /// name.
    key: String,
    /// Installed-binding name: the alias when one was given, otherwise
    /// equal to `key`.
    name: String,
}

// ---------------------------------------------------------------------------
// MixinEvaluator
// ---------------------------------------------------------------------------

/// Evaluator for mixin declarations in one enclosing scope.
///
/// Owns the object heap, the function table, the source-unit registry,
/// and the scope record (which in turn owns the per-origin mapping
/// registry). Provider bodies receive `&mut MixinEvaluator`, so
/// re-entrant declaration evaluation is expressible and must be safe.
#[derive(Debug)]
pub struct MixinEvaluator {
    pub heap: ObjectHeap,
    pub functions: FunctionTable,
    pub units: SourceUnitRegistry,
    pub scope: ScopeRecord,
}

impl MixinEvaluator {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            heap: ObjectHeap::new(),
            functions: FunctionTable::new(),
            units: SourceUnitRegistry::new(),
            scope: ScopeRecord::new(kind),
        }
    }

    /// Evaluate one of the minimal expression forms.
    pub fn eval_expr(&self, expr: &Expr, inv: &InvocationContext) -> MixinResult<JsValue> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Binding(name) => {
                self.scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MixinError::UnresolvedBinding { name: name.clone() })
            }
            Expr::Function(id) => {
                self.functions.get(*id)?;
                Ok(JsValue::Function(*id))
            }
            Expr::This => inv
                .this
                .map(JsValue::Object)
                .ok_or_else(|| MixinError::UnresolvedBinding {
                    name: "this".to_string(),
                }),
        }
    }

    /// Evaluate a mixin declaration to completion.
    ///
    /// On failure, contributions already installed by earlier sources of
    /// the same declaration remain in place (no rollback).
    pub fn evaluate_declaration(
        &mut self,
        decl: &MixinDeclaration,
        inv: &InvocationContext,
    ) -> MixinResult<MixinOutcome> {
        self.run_declaration(decl, inv).inspect_err(|err| {
            tracing::debug!(
                phase = %EvalPhase::Rejected,
                code = err.code(),
                kind = %err.kind(),
                "mixin declaration rejected"
            );
        })
    }

    fn run_declaration(
        &mut self,
        decl: &MixinDeclaration,
        inv: &InvocationContext,
    ) -> MixinResult<MixinOutcome> {
        tracing::debug!(
            phase = %EvalPhase::ResolvingContext,
            sources = decl.sources.len(),
            class_element = decl.class_element,
            "evaluating mixin declaration"
        );

        // Construction check precedes all other work.
        if decl.class_element && (!inv.constructed || inv.this.is_none()) {
            return Err(MixinError::NotConstructed);
        }

        let context = self.resolve_context(decl, inv)?;

        tracing::debug!(phase = %EvalPhase::ResolvingSources, "resolving source references");
        let pre_resolved: Vec<ResolvedSource> = match decl.variant {
            MixinVariant::Direct => decl
                .sources
                .iter()
                .map(|source| self.resolve_source(source, inv))
                .collect::<MixinResult<_>>()?,
            MixinVariant::IndirectBinding => Vec::new(),
        };

        tracing::debug!(phase = %EvalPhase::ResolvingBindings, extras = decl.extras.len(), "evaluating extra binding arguments");
        let extras: Vec<JsValue> = decl
            .extras
            .iter()
            .map(|expr| self.eval_expr(expr, inv))
            .collect::<MixinResult<_>>()?;

        // Private-name slots hoist before their providers run.
        let hoists_private = decl.class_element && !decl.install_on_context;
        if decl.variant == MixinVariant::Direct && hoists_private {
            for resolved in &pre_resolved {
                self.scope.declare_private(&resolved.name)?;
            }
        }

        tracing::debug!(phase = %EvalPhase::Installing, "invoking providers and installing bindings");
        let mut installed = Vec::with_capacity(decl.sources.len());
        for (index, source) in decl.sources.iter().enumerate() {
            let resolved = match decl.variant {
                MixinVariant::Direct => pre_resolved[index].clone(),
                MixinVariant::IndirectBinding => {
                    let resolved = self.resolve_source(source, inv)?;
                    if hoists_private {
                        self.scope.declare_private(&resolved.name)?;
                    }
                    resolved
                }
            };
            let key: PropertyKey = resolved.key.as_str().into();

            let record = self
                .scope
                .registry
                .resolve_or_create(&mut self.heap, resolved.origin);
            mapping::ensure_key_free(&self.heap, record, &key)?;

            let call = ProviderCall {
                context: context.clone(),
                view: record.view,
                extras: extras.clone(),
            };
            tracing::trace!(key = %resolved.key, origin = %resolved.origin, "invoking provider");
            let body = std::rc::Rc::clone(&self.functions.get(resolved.func)?.body);
            let result = body.as_ref()(self, &call)?;

            if !result.is_callable() {
                return Err(MixinError::ResultNotCallable {
                    key: resolved.key.clone(),
                    found: result.type_name().to_string(),
                });
            }

            mapping::record_contribution(&mut self.heap, record, &key, result.clone())?;
            let site = installer::install(
                self,
                inv,
                decl.install_on_context,
                decl.class_element,
                &context,
                &resolved.name,
                result,
            )?;
            tracing::trace!(key = %resolved.key, name = %resolved.name, site = %site, "binding installed");
            installed.push(InstalledBinding {
                name: resolved.name,
                key: resolved.key,
                origin: resolved.origin,
                site,
            });
        }

        tracing::debug!(phase = %EvalPhase::Done, installed = installed.len(), "mixin declaration complete");
        Ok(MixinOutcome { installed })
    }

    fn resolve_context(
        &self,
        decl: &MixinDeclaration,
        inv: &InvocationContext,
    ) -> MixinResult<ContextArg> {
        match decl.variant {
            MixinVariant::Direct => {
                let value = self.eval_expr(&decl.context, inv)?;
                if decl.install_on_context && !value.is_object() {
                    return Err(MixinError::ContextNotObject {
                        found: value.type_name().to_string(),
                    });
                }
                Ok(ContextArg::Value(value))
            }
            MixinVariant::IndirectBinding => {
                if !decl.install_on_context {
                    // No context object is materialized at all.
                    return Ok(ContextArg::None);
                }
                match &decl.context {
                    Expr::Binding(name) => {
                        let current = self.scope.get(name).cloned().ok_or_else(|| {
                            MixinError::UnresolvedBinding { name: name.clone() }
                        })?;
                        if !current.is_object() {
                            return Err(MixinError::ContextNotObject {
                                found: current.type_name().to_string(),
                            });
                        }
                        Ok(ContextArg::Indirect(IndirectRef::new(name.clone())))
                    }
                    other => {
                        // A non-binding context has no aliasable slot;
                        // its value is the alias's referent.
                        let value = self.eval_expr(other, inv)?;
                        if !value.is_object() {
                            return Err(MixinError::ContextNotObject {
                                found: value.type_name().to_string(),
                            });
                        }
                        Ok(ContextArg::Value(value))
                    }
                }
            }
        }
    }

    fn resolve_source(
        &self,
        source: &MixinSource,
        inv: &InvocationContext,
    ) -> MixinResult<ResolvedSource> {
        let value = self.eval_expr(&source.expr, inv)?;
        let JsValue::Function(func) = value else {
            return Err(MixinError::SourceNotCallable {
                found: value.type_name().to_string(),
            });
        };
        let function = self.functions.get(func)?;
        let origin = origin::resolve_origin(function)?;
        // The contribution key is always the source's own lookup name; a
        // provider module cannot know what alias a consumer picked.
        let key = match &source.expr {
            Expr::Binding(name) => name.clone(),
            _ => function.name.clone(),
        };
        let name = source.alias.clone().unwrap_or_else(|| key.clone());
        Ok(ResolvedSource {
            func,
            origin,
            key,
            name,
        })
    }
}
