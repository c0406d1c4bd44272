//! Compilation errors.
//!
//! Every failure aborts the compile. Errors are raised while the element
//! tree is being built; emission never fails on type grounds, so the only
//! error it can report is [`CompilationError::Internal`].

use thiserror::Error;

use crate::Span;

/// Categories of compilation errors, for callers that match on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeMismatch,
    AmbiguousMatch,
    UndefinedName,
    InvalidExplicitCast,
    MalformedReduction,
    Internal,
}

impl ErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::AmbiguousMatch => "ambiguous match",
            ErrorKind::UndefinedName => "undefined name",
            ErrorKind::InvalidExplicitCast => "invalid explicit cast",
            ErrorKind::MalformedReduction => "malformed reduction",
            ErrorKind::Internal => "internal error",
        }
    }
}

/// Errors raised while building or emitting an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// Operand types are not legal for the operation.
    #[error("at {span}: {message}")]
    TypeMismatch {
        /// Description of the mismatch, naming the offending types.
        message: String,
        /// Where the mismatch occurred.
        span: Span,
    },

    /// More than one operator or overload matched equally well.
    #[error("at {span}: ambiguous match for '{name}': could be {candidates}")]
    AmbiguousMatch {
        /// Operator or member name.
        name: String,
        /// Description of the tied candidates.
        candidates: String,
        /// Where the call or operator appeared.
        span: Span,
    },

    /// A member name did not resolve in its scope.
    #[error("at {span}: '{name}' is not defined in {scope}")]
    UndefinedName {
        /// The name that was looked up.
        name: String,
        /// The type or namespace that was searched.
        scope: String,
        /// Where the name was referenced.
        span: Span,
    },

    /// No rule allows the requested cast.
    #[error("at {span}: cannot cast '{from}' to '{to}'")]
    InvalidExplicitCast {
        /// Source type name.
        from: String,
        /// Target type name.
        to: String,
        /// Where the cast appeared.
        span: Span,
    },

    /// The reduction stream does not describe a well-formed tree.
    #[error("at {span}: malformed reduction: {message}")]
    MalformedReduction {
        /// What was wrong with the stream.
        message: String,
        /// Position of the offending event, if known.
        span: Span,
    },

    /// An invariant of the backend itself was violated.
    #[error("internal compiler error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::TypeMismatch { span, .. } => *span,
            CompilationError::AmbiguousMatch { span, .. } => *span,
            CompilationError::UndefinedName { span, .. } => *span,
            CompilationError::InvalidExplicitCast { span, .. } => *span,
            CompilationError::MalformedReduction { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompilationError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            CompilationError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            CompilationError::UndefinedName { .. } => ErrorKind::UndefinedName,
            CompilationError::InvalidExplicitCast { .. } => ErrorKind::InvalidExplicitCast,
            CompilationError::MalformedReduction { .. } => ErrorKind::MalformedReduction,
            CompilationError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Shorthand for a [`CompilationError::TypeMismatch`].
    pub fn mismatch(message: impl Into<String>, span: Span) -> Self {
        CompilationError::TypeMismatch {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for a [`CompilationError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}
