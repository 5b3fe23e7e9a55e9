//! Matching engines.
//!
//! Every backend extracts scalars by path and hands them to the shared
//! checks in this module, so a strategy behaves the same whatever structure
//! the value came from.

pub mod json;
pub mod keyed;
pub mod xml;

use crate::command::{CommandInvocation, CommandRegistry, DeferredCommands};
use crate::config::MatcherConfig;
use crate::error::{MatchError, ModelError};
use crate::rule::RuleScope;
use crate::strategy::{MatchingStrategy, RegexFlavor, compile_pattern, textual};
use crate::value::{Resolved, ResolvedValue};
use crate::verdict::{FieldFailure, MatchVerdict};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::borrow::Cow;

static DEFERRED: DeferredCommands = DeferredCommands;

/// Everything a match pass needs besides the data itself.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    /// Tunables
    pub config: &'a MatcherConfig,
    /// Registry consulted by `by_command` rules
    pub commands: &'a dyn CommandRegistry,
    /// Scope failures are reported under
    pub scope: RuleScope,
}

impl<'a> MatchContext<'a> {
    /// Create a context with deferred commands.
    #[must_use]
    pub fn new(config: &'a MatcherConfig, scope: RuleScope) -> Self {
        Self {
            config,
            commands: &DEFERRED,
            scope,
        }
    }

    /// Use a specific command registry.
    #[must_use]
    pub fn with_commands(mut self, commands: &'a dyn CommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    /// The same context reporting under another scope.
    #[must_use]
    pub const fn scoped(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    /// Record a failure at `path` into `verdict`, honouring the cap.
    pub fn record(&self, verdict: &mut MatchVerdict, path: impl Into<String>, error: MatchError) {
        verdict.push(
            FieldFailure::new(self.scope, path, error),
            self.config.max_reported_failures,
        );
    }
}

impl std::fmt::Debug for MatchContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchContext")
            .field("config", self.config)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Apply a strategy to an extracted scalar.
///
/// `expected` is the contract value at the same location, consulted by
/// `Equality` only. `observed` is `None` when the path selected nothing.
///
/// # Errors
///
/// Returns the field-level [`MatchError`] describing why the value does not
/// hold.
pub fn check_value(
    strategy: &MatchingStrategy,
    expected: Option<&JsonValue>,
    observed: Option<&JsonValue>,
    location: &str,
    ctx: &MatchContext<'_>,
) -> Result<(), MatchError> {
    PreparedStrategy::new(strategy, ctx.config)?.check(expected, observed, location, ctx)
}

/// A strategy ready to be applied to many nodes.
///
/// Predefined names are expanded and patterns compiled once, so a rule that
/// selects every element of an array pays for compilation a single time.
#[derive(Debug)]
pub enum PreparedStrategy<'s> {
    /// Compiled pattern with the text reported on mismatch
    Regex {
        /// Anchored regex
        re: Regex,
        /// Pattern as written
        pattern: String,
        /// Stringification of observed values
        flavor: RegexFlavor,
    },
    /// Any strategy that needs no compilation
    Plain(Cow<'s, MatchingStrategy>),
}

impl<'s> PreparedStrategy<'s> {
    /// Expand and compile a strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] for unknown predefined names and patterns that
    /// do not compile within the configured size limit.
    pub fn new(strategy: &'s MatchingStrategy, config: &MatcherConfig) -> Result<Self, ModelError> {
        let strategy = strategy.normalized()?;
        match strategy.as_ref() {
            MatchingStrategy::Regex { pattern, flavor } => Ok(Self::Regex {
                re: compile_pattern(pattern, *flavor, config.regex_size_limit)?,
                pattern: pattern.clone(),
                flavor: *flavor,
            }),
            _ => Ok(Self::Plain(strategy)),
        }
    }

    /// Apply the strategy to one extracted scalar.
    ///
    /// # Errors
    ///
    /// Returns the field-level [`MatchError`] describing why the value does
    /// not hold.
    pub fn check(
        &self,
        expected: Option<&JsonValue>,
        observed: Option<&JsonValue>,
        location: &str,
        ctx: &MatchContext<'_>,
    ) -> Result<(), MatchError> {
        let strategy = match self {
            Self::Regex { re, pattern, flavor } => {
                let observed = observed.ok_or_else(|| MatchError::traversal(location))?;
                let text = flavor.stringify(observed)?;
                return if re.is_match(&text) {
                    Ok(())
                } else {
                    Err(MatchError::mismatch(format!("/{pattern}/"), text))
                };
            }
            Self::Plain(strategy) => strategy.as_ref(),
        };
        if matches!(strategy, MatchingStrategy::Null) {
            return match observed {
                None | Some(JsonValue::Null) => Ok(()),
                Some(other) => Err(MatchError::mismatch("null", other.to_string())),
            };
        }
        let observed = observed.ok_or_else(|| MatchError::traversal(location))?;
        match strategy {
            MatchingStrategy::Equality => {
                let expected =
                    expected.ok_or_else(|| ModelError::MissingExpected(location.to_string()))?;
                if json_eq(expected, observed) {
                    Ok(())
                } else {
                    Err(MatchError::mismatch(expected.to_string(), observed.to_string()))
                }
            }
            MatchingStrategy::Type(kind) => kind.validate(observed),
            MatchingStrategy::Command(expression) => {
                let invocation =
                    CommandInvocation::new(expression.clone(), observed.clone(), location);
                let outcome = ctx.commands.invoke(&invocation)?;
                if outcome.accepted {
                    Ok(())
                } else {
                    Err(MatchError::command(
                        invocation.name(),
                        format!("rejected {}", textual(observed)),
                    ))
                }
            }
            MatchingStrategy::Null
            | MatchingStrategy::Regex { .. }
            | MatchingStrategy::Predefined(_) => Ok(()),
        }
    }
}

/// Check an observed value against a contract value resolved for one side.
///
/// # Errors
///
/// Returns the field-level [`MatchError`] describing why the value does not
/// hold.
pub fn check_resolved(
    expected: &ResolvedValue,
    observed: Option<&JsonValue>,
    location: &str,
    ctx: &MatchContext<'_>,
) -> Result<(), MatchError> {
    if expected.optional && observed.is_none() {
        return Ok(());
    }
    match &expected.resolved {
        Resolved::Absent => check_value(&MatchingStrategy::Null, None, observed, location, ctx),
        Resolved::Literal(literal) => {
            check_value(&MatchingStrategy::Equality, Some(literal), observed, location, ctx)
        }
        Resolved::Matcher(strategy) => check_value(strategy, None, observed, location, ctx),
    }
}

/// Deep equality with numbers compared by value, so `1` equals `1.0`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn json_eq(left: &JsonValue, right: &JsonValue) -> bool {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
        }
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_eq(x, y))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| json_eq(x, y)))
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandTable;
    use crate::error::ErrorKind;
    use crate::strategy::TypeKind;
    use serde_json::json;

    fn check(strategy: &MatchingStrategy, observed: Option<&JsonValue>) -> Result<(), MatchError> {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        check_value(strategy, None, observed, "$.x", &ctx)
    }

    #[test]
    fn test_json_eq_numbers() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(json_eq(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
        assert!(!json_eq(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!json_eq(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_null_strategy() {
        assert!(check(&MatchingStrategy::Null, None).is_ok());
        assert!(check(&MatchingStrategy::Null, Some(&json!(null))).is_ok());
        let err = check(&MatchingStrategy::Null, Some(&json!(5))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mismatch);
    }

    #[test]
    fn test_missing_value_is_traversal_error() {
        let err = check(&MatchingStrategy::regex("a"), None).unwrap_err();
        assert_eq!(err, MatchError::traversal("$.x"));
    }

    #[test]
    fn test_regex_strategy() {
        let strategy = MatchingStrategy::regex("[0-9]{3}");
        assert!(check(&strategy, Some(&json!("123"))).is_ok());
        assert!(check(&strategy, Some(&json!(123))).is_ok());
        assert_eq!(
            check(&strategy, Some(&json!("12"))).unwrap_err().kind(),
            ErrorKind::Mismatch
        );
        assert_eq!(
            check(&strategy, Some(&json!([1]))).unwrap_err().kind(),
            ErrorKind::Model
        );
        assert_eq!(
            check(&MatchingStrategy::regex("[0-9"), Some(&json!("1")))
                .unwrap_err()
                .kind(),
            ErrorKind::Model
        );
    }

    #[test]
    fn test_predefined_strategy() {
        let strategy = MatchingStrategy::predefined("uuid");
        assert!(check(&strategy, Some(&json!("00000000-0000-0000-0000-000000000000"))).is_ok());
        assert!(check(&strategy, Some(&json!("nope"))).is_err());
        assert_eq!(
            check(&MatchingStrategy::predefined("bogus"), Some(&json!("x")))
                .unwrap_err()
                .kind(),
            ErrorKind::Model
        );
    }

    #[test]
    fn test_type_strategy() {
        let strategy = MatchingStrategy::Type(TypeKind::Date);
        assert!(check(&strategy, Some(&json!("2024-02-29"))).is_ok());
        assert_eq!(
            check(&strategy, Some(&json!("2023-02-29"))).unwrap_err().kind(),
            ErrorKind::Grammar
        );
    }

    #[test]
    fn test_equality_without_expected_is_model_error() {
        let err = check(&MatchingStrategy::Equality, Some(&json!(1))).unwrap_err();
        assert_eq!(
            err,
            MatchError::Model(ModelError::MissingExpected("$.x".to_string()))
        );
    }

    #[test]
    fn test_command_deferred_and_registered() {
        let strategy = MatchingStrategy::command("executeMe($it)");
        assert!(check(&strategy, Some(&json!("whatever"))).is_ok());

        let config = MatcherConfig::default();
        let table = CommandTable::new().register("executeMe", |v| Ok(v == &json!("ok")));
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody).with_commands(&table);
        assert!(check_value(&strategy, None, Some(&json!("ok")), "$.x", &ctx).is_ok());
        let err = check_value(&strategy, None, Some(&json!("ko")), "$.x", &ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommandInvocation);

        let empty = CommandTable::new();
        let ctx = ctx.with_commands(&empty);
        let err = check_value(&strategy, None, Some(&json!("ok")), "$.x", &ctx).unwrap_err();
        assert!(err.to_string().contains("executeMe"));
    }

    #[test]
    fn test_prepared_strategy_is_reusable() {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        let strategy = MatchingStrategy::predefined("integer");
        let prepared = PreparedStrategy::new(&strategy, &config).unwrap();
        assert!(matches!(prepared, PreparedStrategy::Regex { .. }));

        for (i, value) in [json!(1), json!("-20"), json!(300)].iter().enumerate() {
            assert!(prepared.check(None, Some(value), &format!("$[{i}]"), &ctx).is_ok());
        }
        let err = prepared.check(None, Some(&json!("x1")), "$[3]", &ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mismatch);
        assert_eq!(
            prepared.check(None, None, "$[4]", &ctx).unwrap_err(),
            MatchError::traversal("$[4]")
        );

        let invalid = MatchingStrategy::regex("[0-9");
        assert!(matches!(
            PreparedStrategy::new(&invalid, &config),
            Err(ModelError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_check_resolved_optional() {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        let optional = ResolvedValue {
            resolved: Resolved::Literal(json!("a")),
            optional: true,
        };
        assert!(check_resolved(&optional, None, "$.x", &ctx).is_ok());
        assert!(check_resolved(&optional, Some(&json!("a")), "$.x", &ctx).is_ok());
        assert!(check_resolved(&optional, Some(&json!("b")), "$.x", &ctx).is_err());

        let required = ResolvedValue::required(Resolved::Literal(json!("a")));
        assert!(check_resolved(&required, None, "$.x", &ctx).is_err());
    }
}
