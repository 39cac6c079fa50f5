//! Guard error taxonomy.

use thiserror::Error;
use warden_auth::{AuthorizationError, MalformedPermissionError};

use crate::registry::MethodId;

/// A selector could not be resolved against the bound value.
///
/// An unresolvable policy cannot be proven satisfied, so this always denies
/// the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("selector '{selector}': identifier '{binding}' is not bound")]
    Unbound { selector: String, binding: String },

    #[error("selector '{selector}': field '{field}' not found")]
    MissingField { selector: String, field: String },

    #[error("selector '{selector}': cannot read '{field}' from null")]
    NullTraversal { selector: String, field: String },

    #[error("selector '{selector}': cannot {operation} a {kind} value")]
    WrongShape {
        selector: String,
        operation: &'static str,
        kind: &'static str,
    },
}

/// Failure while building a [`crate::PolicyRegistry`]. Raised at startup,
/// never per call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Malformed(#[from] MalformedPermissionError),

    #[error("method '{0}' is registered twice")]
    DuplicateMethod(MethodId),

    #[error("parameter {index} is declared twice")]
    DuplicateParameter { index: usize },

    #[error("invalid policy document: {0}")]
    Document(String),
}

/// Configuration could not be resolved. Fatal at startup; never replaced by a
/// permissive default.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid security configuration: {0}")]
    Parse(String),
}

/// Reasons the guard refused a call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error(transparent)]
    Denied(#[from] AuthorizationError),

    #[error("authorization policy could not be evaluated: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("method '{method}' declares a requirement on parameter {index} but was called with {len} arguments")]
    MissingArgument {
        method: MethodId,
        index: usize,
        len: usize,
    },
}

impl GuardError {
    /// The access denial, if this is one.
    pub fn denial(&self) -> Option<&AuthorizationError> {
        match self {
            GuardError::Denied(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of a guarded invocation that did not return normally.
#[derive(Debug, Error)]
pub enum InvocationError<E> {
    /// The guard refused the call (before or after the operation ran).
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The wrapped operation failed on its own.
    #[error("operation failed: {0}")]
    Operation(E),
}

impl<E> InvocationError<E> {
    pub fn denial(&self) -> Option<&AuthorizationError> {
        match self {
            InvocationError::Guard(err) => err.denial(),
            InvocationError::Operation(_) => None,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        self.denial().is_some()
    }
}
