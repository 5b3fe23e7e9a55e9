//! Matching for named entries: headers, cookies and query parameters.
//!
//! Entries are textual, so contract literals are compared in their textual
//! form. Header names are case-insensitive; cookie and query parameter names
//! are not.

use super::{MatchContext, check_resolved, check_value};
use crate::contract::NamedValue;
use crate::error::MatchError;
use crate::rule::{MatchingRule, RuleScope};
use crate::strategy::textual;
use crate::value::{Resolved, Side, resolve_part};
use crate::verdict::MatchVerdict;
use serde_json::Value as JsonValue;

fn names_match(scope: RuleScope, left: &str, right: &str) -> bool {
    match scope {
        RuleScope::RequestHeaders | RuleScope::ResponseHeaders => left.eq_ignore_ascii_case(right),
        _ => left == right,
    }
}

fn first_observed<'a>(
    observed: &'a [(String, String)],
    name: &str,
    scope: RuleScope,
) -> Option<&'a str> {
    observed
        .iter()
        .find(|(key, _)| names_match(scope, key, name))
        .map(|(_, value)| value.as_str())
}

fn textual_literal(resolved: Resolved) -> Resolved {
    match resolved {
        Resolved::Literal(value) if !value.is_string() => {
            Resolved::Literal(JsonValue::String(textual(&value)))
        }
        other => other,
    }
}

/// Match observed entries against declared entries and keyed rules.
///
/// A declared entry with a rule of the same name is checked by the rule
/// only. When several observed entries share a name, the first one is used.
pub fn match_keyed(
    observed: &[(String, String)],
    declared: &[NamedValue],
    rules: &[MatchingRule],
    side: Side,
    ctx: &MatchContext<'_>,
) -> MatchVerdict {
    let scope = ctx.scope;
    let mut verdict = MatchVerdict::exact();

    for entry in declared {
        if rules.iter().any(|rule| names_match(scope, &rule.path, &entry.name)) {
            continue;
        }
        let found = first_observed(observed, &entry.name, scope).map(JsonValue::from);
        let outcome = resolve_part(&entry.value, side, scope.part())
            .map_err(MatchError::from)
            .and_then(|mut resolved| {
                resolved.resolved = textual_literal(resolved.resolved);
                check_resolved(&resolved, found.as_ref(), &entry.name, ctx)
            });
        if let Err(err) = outcome {
            ctx.record(&mut verdict, entry.name.clone(), err);
        }
    }

    for rule in rules {
        let expected = declared
            .iter()
            .find(|entry| names_match(scope, &entry.name, &rule.path))
            .and_then(|entry| resolve_part(&entry.value, side, scope.part()).ok())
            .and_then(|resolved| match textual_literal(resolved.resolved) {
                Resolved::Literal(value) => Some(value),
                _ => None,
            });
        let found = first_observed(observed, &rule.path, scope).map(JsonValue::from);
        if let Err(err) = check_value(&rule.strategy, expected.as_ref(), found.as_ref(), &rule.path, ctx) {
            ctx.record(&mut verdict, rule.path.clone(), err);
        }
    }
    verdict
}
