//! Error types for the FHIRPath engine.
//!
//! Two domains share one enum: compile-time (`Parse`) and run-time
//! (everything else). Most unusual run-time conditions in FHIRPath produce an
//! empty collection rather than an error; the variants here are reserved for
//! program-level bugs, resource-limit violations, and the arithmetic and
//! adapter failures the language designates as hard errors.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Which injected adapter produced an [`Error::Adapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Resolver,
    Terminology,
    Profile,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::Resolver => f.write_str("reference resolver"),
            AdapterKind::Terminology => f.write_str("terminology service"),
            AdapterKind::Profile => f.write_str("profile validator"),
        }
    }
}

/// FHIRPath compilation and evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("type mismatch in {op}: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        op: &'static str,
    },

    #[error("{0} requires a singleton collection")]
    SingletonExpected(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("incompatible units: '{left}' vs '{right}'")]
    UnitIncompatible { left: String, right: String },

    #[error("recursion depth limit of {0} exceeded")]
    DepthExceeded(usize),

    #[error("collection size limit of {0} exceeded")]
    SizeExceeded(usize),

    #[error("evaluation deadline exceeded")]
    Timeout,

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    #[error("{kind} error: {message}")]
    Adapter { kind: AdapterKind, message: String },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {function} called with {got} arguments (expects {min}..={max})")]
    Arity {
        function: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("undefined variable: %{0}")]
    UndefinedVariable(String),

    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl Error {
    pub(crate) fn type_mismatch(
        op: &'static str,
        expected: impl Into<Arc<str>>,
        actual: impl Into<Arc<str>>,
    ) -> Self {
        Error::TypeMismatch {
            expected: expected.into().to_string(),
            actual: actual.into().to_string(),
            op,
        }
    }
}
