//! Error taxonomy for the matching engine.
//!
//! Nothing in this module aborts a match pass. [`ModelError`] is returned by
//! resolution and assertion planning; every kind of [`MatchError`] is
//! recorded against a field in a [`crate::MatchVerdict`].

use crate::strategy::TypeKind;
use thiserror::Error;

/// The contract's declared shape is internally inconsistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A value can not be resolved to either side
    #[error("Unresolvable value: {0}")]
    Unresolvable(String),

    /// A regular expression does not compile
    #[error("Invalid pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The pattern as declared in the contract
        pattern: String,
        /// Compiler diagnostic
        reason: String,
    },

    /// A predefined pattern name is not in the built-in table
    #[error("Unknown predefined pattern: {0}")]
    UnknownPredefined(String),

    /// A rule path can not be parsed
    #[error("Invalid path {path}: {reason}")]
    InvalidPath {
        /// The path as declared in the contract
        path: String,
        /// Parser diagnostic
        reason: String,
    },

    /// A field that must hold a mapping holds something else
    #[error("Field {0} must be a mapping")]
    NotAMapping(String),

    /// An equality rule has no contract value at its path
    #[error("No contract value at {0} to compare against")]
    MissingExpected(String),

    /// A strategy is applied to a value it can not handle
    #[error("Strategy {strategy} can not be applied to {found}")]
    IncompatibleType {
        /// Strategy description
        strategy: String,
        /// Description of the offending value
        found: String,
    },
}

impl ModelError {
    /// Create an unresolvable-value error.
    #[must_use]
    pub fn unresolvable(msg: impl Into<String>) -> Self {
        Self::Unresolvable(msg.into())
    }

    /// Create an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an incompatible type error.
    #[must_use]
    pub fn incompatible(strategy: impl Into<String>, found: impl Into<String>) -> Self {
        Self::IncompatibleType {
            strategy: strategy.into(),
            found: found.into(),
        }
    }
}

/// Coarse classification of a [`MatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Contract shape problem
    Model,
    /// Declared path not present in the observed structure
    Traversal,
    /// Lexical validation of a type strategy failed
    Grammar,
    /// Value present but different from the expectation
    Mismatch,
    /// External verification command missing or failing
    CommandInvocation,
    /// Observed payload could not be parsed at all
    MalformedBody,
}

/// A field-level match failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Contract shape problem surfaced at match time
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Declared path does not resolve in the observed structure
    #[error("Path {0} did not resolve to any node")]
    Traversal(String),

    /// Type grammar rejected the observed value
    #[error("Value {value:?} is not a valid {kind}")]
    Grammar {
        /// The type kind that was checked
        kind: TypeKind,
        /// Observed value in textual form
        value: String,
    },

    /// Observed value does not satisfy the expectation
    #[error("Expected {expected} but found {actual}")]
    Mismatch {
        /// Rendered expectation
        expected: String,
        /// Rendered observed value
        actual: String,
    },

    /// Verification command missing, failing, or rejecting the value
    #[error("Command {command} failed: {reason}")]
    CommandInvocation {
        /// Command name
        command: String,
        /// Failure reason
        reason: String,
    },

    /// Observed body could not be parsed
    #[error("Malformed observed body: {0}")]
    MalformedBody(String),
}

impl MatchError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Model(_) => ErrorKind::Model,
            Self::Traversal(_) => ErrorKind::Traversal,
            Self::Grammar { .. } => ErrorKind::Grammar,
            Self::Mismatch { .. } => ErrorKind::Mismatch,
            Self::CommandInvocation { .. } => ErrorKind::CommandInvocation,
            Self::MalformedBody(_) => ErrorKind::MalformedBody,
        }
    }

    /// Create a traversal error for the given path.
    #[must_use]
    pub fn traversal(path: impl Into<String>) -> Self {
        Self::Traversal(path.into())
    }

    /// Create a mismatch error.
    #[must_use]
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a grammar error.
    #[must_use]
    pub fn grammar(kind: TypeKind, value: impl Into<String>) -> Self {
        Self::Grammar {
            kind,
            value: value.into(),
        }
    }

    /// Create a command invocation error.
    #[must_use]
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandInvocation {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed body error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBody(msg.into())
    }
}
