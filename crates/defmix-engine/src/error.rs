//! Central error taxonomy for mixin-declaration evaluation.
//!
//! Every failure is synchronous and classified by [`ErrorKind`] into the
//! host language's three error families:
//!
//! - **Reference** — evaluation outside a constructible call, unresolved
//!   bindings, and duplicate contributions to a mapping target.
//! - **Type** — non-object contexts, non-callable sources or results, and
//!   providers without a resolvable origin.
//! - **Syntax** — duplicate private-name or lexical-binding declarations.
//!
//! A failure aborts the remainder of the declaration; contributions
//! already installed are kept (no rollback).
//!
//! Codes are append-only: once assigned, a code string is permanent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::object_model::{FunctionId, ObjectError};

// ---------------------------------------------------------------------------
// ErrorKind — host error family
// ---------------------------------------------------------------------------

/// Host-language error family a [`MixinError`] maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Reference,
    Type,
    Syntax,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "ReferenceError",
            Self::Type => "TypeError",
            Self::Syntax => "SyntaxError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MixinError
// ---------------------------------------------------------------------------

/// Failure raised during mixin-declaration evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MixinError {
    /// A class-element declaration was evaluated outside a constructible
    /// invocation (no `new`-style call, no instance under construction).
    #[error("ReferenceError: mixin declaration evaluated outside a constructible call")]
    NotConstructed,

    /// An expression referenced a binding that does not exist in the
    /// enclosing scope.
    #[error("ReferenceError: binding '{name}' is not defined")]
    UnresolvedBinding { name: String },

    /// The computed contribution key already exists on the origin's
    /// mapping target (duplicate contribution, possibly across
    /// declarations).
    #[error("ReferenceError: duplicate mixin contribution for key '{key}'")]
    DuplicateContribution { key: String },

    /// The context expression produced a non-object value while
    /// installation onto the context was requested.
    #[error("TypeError: mixin context must be an object, found {found}")]
    ContextNotObject { found: String },

    /// A source expression evaluated to a non-callable value.
    #[error("TypeError: mixin source must be callable, found {found}")]
    SourceNotCallable { found: String },

    /// A source evaluated to a callable with no resolvable defining
    /// origin (native or bound function).
    #[error("TypeError: function '{name}' ({kind}) has no defining origin and cannot be a mixin provider")]
    ProviderWithoutOrigin { name: String, kind: String },

    /// A provider returned a non-callable value.
    #[error("TypeError: provider for '{key}' returned a non-callable value ({found})")]
    ResultNotCallable { key: String, found: String },

    /// The installation target rejected the binding (non-extensible
    /// context, or a private field already initialized on the instance).
    #[error("TypeError: installation of '{key}' was rejected by its target")]
    InstallRejected { key: String },

    /// Assignment attempted on an immutable binding.
    #[error("TypeError: assignment to immutable binding '{name}'")]
    ImmutableBinding { name: String },

    /// A function id had no entry in the function table.
    #[error("TypeError: {id} is not a known function")]
    UnknownFunction { id: FunctionId },

    /// A private name collided with one already declared in the same
    /// class scope.
    #[error("SyntaxError: private name '#{name}' is already declared in this scope")]
    DuplicatePrivateName { name: String },

    /// A private name was declared in a scope that is not a class body.
    #[error("SyntaxError: private name '#{name}' declared outside a class scope")]
    PrivateNameOutsideClass { name: String },

    /// A lexical binding collided with one already declared in the same
    /// scope.
    #[error("SyntaxError: binding '{name}' is already declared in this scope")]
    DuplicateBinding { name: String },

    /// Heap-level object failure.
    #[error(transparent)]
    Object(#[from] ObjectError),
}

impl MixinError {
    /// The host error family this failure belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConstructed
            | Self::UnresolvedBinding { .. }
            | Self::DuplicateContribution { .. } => ErrorKind::Reference,
            Self::ContextNotObject { .. }
            | Self::SourceNotCallable { .. }
            | Self::ProviderWithoutOrigin { .. }
            | Self::ResultNotCallable { .. }
            | Self::InstallRejected { .. }
            | Self::ImmutableBinding { .. }
            | Self::UnknownFunction { .. }
            | Self::Object(_) => ErrorKind::Type,
            Self::DuplicatePrivateName { .. }
            | Self::PrivateNameOutsideClass { .. }
            | Self::DuplicateBinding { .. } => ErrorKind::Syntax,
        }
    }

    /// Stable snake_case code for this failure. Codes are append-only and
    /// never reused.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConstructed => "not_constructed",
            Self::UnresolvedBinding { .. } => "unresolved_binding",
            Self::DuplicateContribution { .. } => "duplicate_contribution",
            Self::ContextNotObject { .. } => "context_not_object",
            Self::SourceNotCallable { .. } => "source_not_callable",
            Self::ProviderWithoutOrigin { .. } => "provider_without_origin",
            Self::ResultNotCallable { .. } => "result_not_callable",
            Self::InstallRejected { .. } => "install_rejected",
            Self::ImmutableBinding { .. } => "immutable_binding",
            Self::UnknownFunction { .. } => "unknown_function",
            Self::DuplicatePrivateName { .. } => "duplicate_private_name",
            Self::PrivateNameOutsideClass { .. } => "private_name_outside_class",
            Self::DuplicateBinding { .. } => "duplicate_binding",
            Self::Object(_) => "object_error",
        }
    }
}

/// Result alias used throughout the crate.
pub type MixinResult<T> = Result<T, MixinError>;
