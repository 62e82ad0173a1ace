//! Definition-mixin evaluation core.
//!
//! Implements the binding-resolution and state-isolation algorithm behind
//! definition mixins: a composition context (an instance under
//! construction, or a function-scoped object) pulls in externally defined
//! function providers, instantiates them against the context and an
//! isolated per-origin state bag, and binds the results as public
//! properties or immutable/private bindings.
//!
//! Pieces, leaves first:
//!
//! - [`origin`] — stable identity for a provider's defining compilation
//!   unit; the gate that rejects origin-less callables.
//! - [`mapping`] — per-scope, per-origin mapping records (mutable target
//!   plus guarded view) with idempotent lazy resolution and collision
//!   checking.
//! - [`guarded_view`] — the read-only façade handed to providers.
//! - [`evaluator`] — the per-declaration state machine, direct and
//!   indirect-binding variants.
//! - [`installer`] — installation as context property, lexical constant,
//!   or private field.
//!
//! The host parser and general environment-record machinery stay outside;
//! [`declaration`] defines the parsed surface the host hands in.

#![forbid(unsafe_code)]

pub mod declaration;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod guarded_view;
pub mod installer;
pub mod mapping;
pub mod object_model;
pub mod origin;
pub mod scope;

pub use declaration::{ContextArg, Expr, MixinDeclaration, MixinSource, MixinVariant, ProviderCall};
pub use error::{ErrorKind, MixinError, MixinResult};
pub use evaluator::{EvalPhase, InvocationContext, MixinEvaluator, MixinOutcome};
pub use functions::{FunctionKind, FunctionObject, FunctionTable, NativeBody};
pub use guarded_view::GuardedView;
pub use installer::InstallSite;
pub use mapping::{MappingRecord, MappingRegistry};
pub use object_model::{
    FunctionId, JsValue, ObjectHandle, ObjectHeap, PropertyDescriptor, PropertyKey,
};
pub use origin::{OriginKey, SourceUnit, SourceUnitRegistry};
pub use scope::{PrivateNameId, ScopeKind, ScopeRecord};
