//! Match verdicts and per-field diagnostics.

use crate::error::{ErrorKind, MatchError};
use crate::rule::RuleScope;
use std::fmt;
use tracing::debug;

/// One field that did not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Scope of the field; `None` for method, URL and status
    pub scope: Option<RuleScope>,
    /// Concrete location or entry name
    pub path: String,
    /// What went wrong
    pub error: MatchError,
}

impl FieldFailure {
    /// Create a scoped failure.
    #[must_use]
    pub fn new(scope: RuleScope, path: impl Into<String>, error: MatchError) -> Self {
        Self {
            scope: Some(scope),
            path: path.into(),
            error,
        }
    }

    /// Create a failure on the method, URL or status line.
    #[must_use]
    pub fn unscoped(path: impl Into<String>, error: MatchError) -> Self {
        Self {
            scope: None,
            path: path.into(),
            error,
        }
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{scope} {}: {}", self.path, self.error),
            None => write!(f, "{}: {}", self.path, self.error),
        }
    }
}

/// Outcome of evaluating observed data against a contract.
///
/// A verdict is exact when no field failed. Failures past the configured cap
/// are counted in [`MatchVerdict::suppressed`] but not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchVerdict {
    failures: Vec<FieldFailure>,
    suppressed: usize,
}

impl MatchVerdict {
    /// A verdict with no failures.
    #[must_use]
    pub const fn exact() -> Self {
        Self {
            failures: Vec::new(),
            suppressed: 0,
        }
    }

    /// A verdict holding a single failure.
    #[must_use]
    pub fn failed(failure: FieldFailure) -> Self {
        Self {
            failures: vec![failure],
            suppressed: 0,
        }
    }

    /// Record a failure, keeping at most `cap` of them.
    pub fn push(&mut self, failure: FieldFailure, cap: usize) {
        debug!(path = %failure.path, error = %failure.error, "Field did not match");
        if self.failures.len() < cap {
            self.failures.push(failure);
        } else {
            self.suppressed += 1;
        }
    }

    /// Fold another verdict into this one.
    pub fn merge(&mut self, other: Self, cap: usize) {
        self.suppressed += other.suppressed;
        for failure in other.failures {
            if self.failures.len() < cap {
                self.failures.push(failure);
            } else {
                self.suppressed += 1;
            }
        }
    }

    /// Whether every field held.
    #[must_use]
    pub fn is_exact_match(&self) -> bool {
        self.failures.is_empty() && self.suppressed == 0
    }

    /// Recorded failures, in evaluation order.
    #[must_use]
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Failures counted but not recorded.
    #[must_use]
    pub const fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Paths of recorded failures.
    #[must_use]
    pub fn failing_paths(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.path.as_str()).collect()
    }

    /// Whether any recorded failure is of the given kind.
    #[must_use]
    pub fn has_failure_kind(&self, kind: ErrorKind) -> bool {
        self.failures.iter().any(|f| f.error.kind() == kind)
    }
}

impl fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact_match() {
            return f.write_str("exact match");
        }
        let described: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, "{}", described.join("; "))?;
        if self.suppressed > 0 {
            write!(f, " (+{} more)", self.suppressed)?;
        }
        Ok(())
    }
}
