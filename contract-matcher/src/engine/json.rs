//! JSON matching backend.
//!
//! Contract bodies match by default: every leaf of the contract body is an
//! implicit equality check at its own location unless an explicit rule
//! selects that location or one of its ancestors.

use super::{MatchContext, PreparedStrategy, check_resolved};
use crate::contract::BodyNode;
use crate::error::MatchError;
use crate::path::{Location, PathExpr, Segment, Step, Syntax};
use crate::rule::MatchingRule;
use crate::strategy::MatchingStrategy;
use crate::value::{Side, Value, resolve_part};
use crate::verdict::MatchVerdict;
use serde_json::{Map, Value as JsonValue};
use tracing::{instrument, warn};

/// A tree of mappings and sequences that JSON paths can walk.
pub trait JsonTree {
    /// Value under a mapping key.
    fn child(&self, key: &str) -> Option<&Self>;
    /// Sequence element.
    fn element(&self, index: usize) -> Option<&Self>;
    /// Direct children of a mapping or sequence, in order.
    fn children(&self) -> Vec<(Segment, &Self)>;
}

impl JsonTree for JsonValue {
    fn child(&self, key: &str) -> Option<&Self> {
        self.as_object()?.get(key)
    }

    fn element(&self, index: usize) -> Option<&Self> {
        self.as_array()?.get(index)
    }

    fn children(&self) -> Vec<(Segment, &Self)> {
        match self {
            Self::Object(fields) => fields
                .iter()
                .map(|(key, value)| (Segment::Key(key.clone()), value))
                .collect(),
            Self::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, value)| (Segment::Index(index), value))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl JsonTree for BodyNode {
    fn child(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    fn element(&self, index: usize) -> Option<&Self> {
        match self {
            Self::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn children(&self) -> Vec<(Segment, &Self)> {
        match self {
            Self::Object(fields) => fields
                .iter()
                .map(|(key, node)| (Segment::Key(key.clone()), node))
                .collect(),
            Self::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, node)| (Segment::Index(index), node))
                .collect(),
            Self::Value(_) => Vec::new(),
        }
    }
}

/// Every node selected by a path, with its concrete location.
pub fn select<'a, T: JsonTree>(path: &PathExpr, root: &'a T) -> Vec<(Location, &'a T)> {
    let mut current = vec![(Location::root(Syntax::Json), root)];
    for step in path.steps() {
        let mut next = Vec::new();
        for (location, node) in current {
            match step {
                Step::Child {
                    name: Some(key), ..
                } => {
                    if let Some(child) = node.child(key) {
                        next.push((location.join(Segment::Key(key.clone())), child));
                    }
                }
                Step::Child { name: None, .. } | Step::Index(None) => {
                    for (segment, child) in node.children() {
                        next.push((location.join(segment), child));
                    }
                }
                Step::Index(Some(index)) => {
                    if let Some(child) = node.element(*index) {
                        next.push((location.join(Segment::Index(*index)), child));
                    }
                }
                Step::Descendant(key) => collect_descendants(&location, node, key, &mut next),
                Step::Attribute(_) | Step::Text => {}
            }
        }
        current = next;
    }
    current
}

fn collect_descendants<'a, T: JsonTree>(
    location: &Location,
    node: &'a T,
    key: &str,
    out: &mut Vec<(Location, &'a T)>,
) {
    for (segment, child) in node.children() {
        let child_location = location.join(segment);
        if matches!(child_location.segments().last(), Some(Segment::Key(k)) if k == key) {
            out.push((child_location.clone(), child));
        }
        collect_descendants(&child_location, child, key, out);
    }
}

/// Node at a concrete location.
pub fn lookup<'a, T: JsonTree>(root: &'a T, location: &Location) -> Option<&'a T> {
    location
        .segments()
        .iter()
        .try_fold(root, |node, segment| match segment {
            Segment::Key(key) => node.child(key),
            Segment::Index(index) => node.element(*index),
            _ => None,
        })
}

/// A contract body leaf: a value or an empty container.
pub(crate) enum Leaf<'a> {
    Value(&'a Value),
    EmptyObject,
    EmptyArray,
}

pub(crate) fn leaves<'a>(location: Location, node: &'a BodyNode, out: &mut Vec<(Location, Leaf<'a>)>) {
    match node {
        BodyNode::Value(value) => out.push((location, Leaf::Value(value))),
        BodyNode::Object(fields) if fields.is_empty() => out.push((location, Leaf::EmptyObject)),
        BodyNode::Array(items) if items.is_empty() => out.push((location, Leaf::EmptyArray)),
        _ => {
            for (segment, child) in node.children() {
                leaves(location.join(segment), child, out);
            }
        }
    }
}

/// Match an observed JSON document against a contract body and its rules.
///
/// `side` selects which representation of the contract body is expected.
/// Extra observed fields are ignored; arrays are compared position by
/// position.
///
/// # Examples
///
/// ```
/// use contract_matcher::{BodyNode, MatchContext, MatcherConfig, RuleScope, Side};
/// use contract_matcher::engine::json::match_json;
/// use serde_json::json;
///
/// let config = MatcherConfig::default();
/// let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
/// let body = BodyNode::from(json!({"foo": "bar"}));
///
/// let verdict = match_json(&json!({"foo": "baz"}), Some(&body), &[], Side::Client, &ctx);
/// assert_eq!(verdict.failing_paths(), vec!["$.foo"]);
/// ```
#[instrument(skip_all, fields(scope = %ctx.scope, rules = rules.len()))]
pub fn match_json(
    observed: &JsonValue,
    body: Option<&BodyNode>,
    rules: &[MatchingRule],
    side: Side,
    ctx: &MatchContext<'_>,
) -> MatchVerdict {
    let mut verdict = MatchVerdict::exact();
    let mut parsed = Vec::with_capacity(rules.len());
    for rule in rules {
        match PathExpr::parse_json(&rule.path) {
            Ok(path) => parsed.push((rule, path)),
            Err(err) => {
                warn!(path = %rule.path, error = %err, "Invalid rule path");
                ctx.record(&mut verdict, rule.path.clone(), err.into());
            }
        }
    }

    if let Some(body) = body {
        let covered: Vec<Location> = parsed
            .iter()
            .flat_map(|(_, path)| select(path, body).into_iter().map(|(location, _)| location))
            .collect();
        let mut implicit = Vec::new();
        leaves(Location::root(Syntax::Json), body, &mut implicit);
        for (location, leaf) in implicit {
            if covered.iter().any(|c| c.is_prefix_of(&location)) {
                continue;
            }
            if let Err(err) = check_leaf(&leaf, lookup(observed, &location), &location, side, ctx) {
                ctx.record(&mut verdict, location.to_string(), err);
            }
        }
    }

    for (rule, path) in &parsed {
        apply_rule(rule, path, observed, body, side, ctx, &mut verdict);
    }
    verdict
}

fn check_leaf(
    leaf: &Leaf<'_>,
    observed: Option<&JsonValue>,
    location: &Location,
    side: Side,
    ctx: &MatchContext<'_>,
) -> Result<(), MatchError> {
    let (expected, is_empty): (&str, fn(&JsonValue) -> bool) = match leaf {
        Leaf::Value(value) => {
            let resolved = resolve_part(value, side, ctx.scope.part())?;
            return check_resolved(&resolved, observed, &location.to_string(), ctx);
        }
        Leaf::EmptyObject => ("{}", |v| v.as_object().is_some_and(Map::is_empty)),
        Leaf::EmptyArray => ("[]", |v| v.as_array().is_some_and(Vec::is_empty)),
    };
    match observed {
        Some(value) if is_empty(value) => Ok(()),
        Some(value) => Err(MatchError::mismatch(expected, value.to_string())),
        None => Err(MatchError::traversal(location.to_string())),
    }
}

fn apply_rule(
    rule: &MatchingRule,
    path: &PathExpr,
    observed: &JsonValue,
    body: Option<&BodyNode>,
    side: Side,
    ctx: &MatchContext<'_>,
    verdict: &mut MatchVerdict,
) {
    let prepared = match PreparedStrategy::new(&rule.strategy, ctx.config) {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!(path = %rule.path, error = %err, "Invalid rule strategy");
            ctx.record(verdict, rule.path.clone(), err.into());
            return;
        }
    };
    let hits = select(path, observed);
    if hits.is_empty() {
        if let Err(err) = prepared.check(None, None, &rule.path, ctx) {
            ctx.record(verdict, rule.path.clone(), err);
        }
        return;
    }
    for (location, value) in hits {
        let location_text = location.to_string();
        let expected = if rule.strategy == MatchingStrategy::Equality {
            match body.and_then(|b| lookup(b, &location)) {
                Some(node) => match node.to_json(side, ctx.scope.part()) {
                    Ok(json) => Some(json),
                    Err(err) => {
                        ctx.record(verdict, location_text, err.into());
                        continue;
                    }
                },
                None => None,
            }
        } else {
            None
        };
        if let Err(err) = prepared.check(expected.as_ref(), Some(value), &location_text, ctx) {
            ctx.record(verdict, location_text, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherConfig;
    use crate::error::ErrorKind;
    use crate::rule::RuleScope;
    use crate::strategy::TypeKind;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn run(observed: &JsonValue, body: Option<&BodyNode>, rules: &[MatchingRule]) -> MatchVerdict {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        match_json(observed, body, rules, Side::Server, &ctx)
    }

    #[test]
    fn test_select_wildcards_and_descendants() {
        let doc = json!({"a": [{"id": 1}, {"id": 2}], "b": {"c": {"id": 3}}});
        let ids: Vec<String> = select(&PathExpr::parse_json("$..id").unwrap(), &doc)
            .into_iter()
            .map(|(location, _)| location.to_string())
            .collect();
        assert_eq!(ids, vec!["$.a[0].id", "$.a[1].id", "$.b.c.id"]);

        let items = select(&PathExpr::parse_json("$.a[*].id").unwrap(), &doc);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].1, &json!(2));
    }

    #[test]
    fn test_implicit_equality() {
        let body = BodyNode::from(json!({"foo": "bar"}));
        assert!(run(&json!({"foo": "bar"}), Some(&body), &[]).is_exact_match());

        let verdict = run(&json!({"foo": "baz"}), Some(&body), &[]);
        assert_eq!(verdict.failing_paths(), vec!["$.foo"]);
        assert!(verdict.has_failure_kind(ErrorKind::Mismatch));
    }

    #[test]
    fn test_extra_observed_fields_are_ignored() {
        let body = BodyNode::from(json!({"a": 1}));
        assert!(run(&json!({"a": 1, "b": 2}), Some(&body), &[]).is_exact_match());
    }

    #[test]
    fn test_missing_field_is_traversal_failure() {
        let body = BodyNode::from(json!({"a": {"b": 1}}));
        let verdict = run(&json!({"a": {}}), Some(&body), &[]);
        assert_eq!(verdict.failing_paths(), vec!["$.a.b"]);
        assert!(verdict.has_failure_kind(ErrorKind::Traversal));
    }

    #[test]
    fn test_arrays_are_positional() {
        let body = BodyNode::from(json!({"items": [1, 2]}));
        assert!(run(&json!({"items": [1, 2]}), Some(&body), &[]).is_exact_match());
        let verdict = run(&json!({"items": [2, 1]}), Some(&body), &[]);
        assert_eq!(verdict.failing_paths(), vec!["$.items[0]", "$.items[1]"]);
    }

    #[test]
    fn test_empty_containers() {
        let body = BodyNode::from(json!({"tags": [], "meta": {}}));
        assert!(run(&json!({"tags": [], "meta": {}}), Some(&body), &[]).is_exact_match());
        let verdict = run(&json!({"tags": {}, "meta": {}}), Some(&body), &[]);
        assert_eq!(verdict.failing_paths(), vec!["$.tags"]);
        let verdict = run(&json!({"tags": [1, 2], "meta": {"x": 1}}), Some(&body), &[]);
        assert_eq!(verdict.failing_paths(), vec!["$.meta", "$.tags"]);
    }

    #[test]
    fn test_rule_overrides_implicit_equality() {
        let body = BodyNode::from(json!({"id": "123", "name": "duck"}));
        let rules = [MatchingRule::by_regex("$.id", "[0-9]+")];
        assert!(run(&json!({"id": "987", "name": "duck"}), Some(&body), &rules).is_exact_match());
        let verdict = run(&json!({"id": "abc", "name": "duck"}), Some(&body), &rules);
        assert_eq!(verdict.failing_paths(), vec!["$.id"]);
    }

    #[test]
    fn test_ancestor_rule_covers_subtree() {
        let body = BodyNode::from(json!({"list": [{"a": 1}, {"a": 2}]}));
        let rules = [MatchingRule::by_type("$.list[*].a", TypeKind::Number)];
        assert!(run(&json!({"list": [{"a": 5}, {"a": 6}]}), Some(&body), &rules).is_exact_match());
    }

    #[test]
    fn test_null_rule() {
        let rules = [MatchingRule::by_null("$.nullValue")];
        assert!(run(&json!({}), None, &rules).is_exact_match());
        assert!(run(&json!({"nullValue": null}), None, &rules).is_exact_match());
        let verdict = run(&json!({"nullValue": 5}), None, &rules);
        assert_eq!(verdict.failing_paths(), vec!["$.nullValue"]);
    }

    #[test]
    fn test_command_rule_is_deferred() {
        let body = BodyNode::from(json!({"foo3": "expected"}));
        let rules = [MatchingRule::by_command("$.foo3", "executeMe($it)")];
        assert!(run(&json!({"foo3": "anything"}), Some(&body), &rules).is_exact_match());
        let verdict = run(&json!({}), Some(&body), &rules);
        assert!(verdict.has_failure_kind(ErrorKind::Traversal));
    }

    #[test]
    fn test_rule_only_path() {
        let rules = [MatchingRule::by_type("$.when", TypeKind::DateTime)];
        assert!(run(&json!({"when": "2024-05-01T10:00:00Z"}), None, &rules).is_exact_match());
        assert!(!run(&json!({"when": "yesterday"}), None, &rules).is_exact_match());
    }

    #[test]
    fn test_equality_rule_takes_body_value() {
        let body = BodyNode::from(json!({"a": {"b": [1, 2]}}));
        let rules = [MatchingRule::by_equality("$.a")];
        assert!(run(&json!({"a": {"b": [1, 2]}}), Some(&body), &rules).is_exact_match());
        assert!(!run(&json!({"a": {"b": [1]}}), Some(&body), &rules).is_exact_match());
    }

    #[test]
    fn test_invalid_rule_path_is_reported() {
        let rules = [MatchingRule::by_null("$.[")];
        let verdict = run(&json!({}), None, &rules);
        assert!(verdict.has_failure_kind(ErrorKind::Model));
    }

    #[test]
    fn test_invalid_pattern_is_reported_once_per_rule() {
        let rules = [MatchingRule::by_regex("$.items[*]", "[0-9")];
        let verdict = run(&json!({"items": ["1", "2", "3"]}), None, &rules);
        assert_eq!(verdict.failing_paths(), vec!["$.items[*]"]);
        assert!(verdict.has_failure_kind(ErrorKind::Model));
    }

    #[test]
    fn test_wildcard_regex_rule_checks_every_element() {
        let rules = [MatchingRule::by_regex("$.items[*]", "[0-9]+")];
        let verdict = run(&json!({"items": ["1", "x", "3", "y"]}), None, &rules);
        assert_eq!(verdict.failing_paths(), vec!["$.items[1]", "$.items[3]"]);
    }

    #[test]
    fn test_date_time_rule_with_wide_digits_fails_cleanly() {
        let rules = [MatchingRule::by_type("$.when", TypeKind::DateTime)];
        let observed = json!({"when": "2024-05-01T10:00:00.\u{0660}0\u{0660}\u{0660}"});
        let verdict = run(&observed, None, &rules);
        assert_eq!(verdict.failing_paths(), vec!["$.when"]);
        assert!(verdict.has_failure_kind(ErrorKind::Grammar));
    }

    #[test]
    fn test_dual_leaf_resolves_per_side() {
        let body = BodyNode::Object(BTreeMap::from([(
            "id".to_string(),
            BodyNode::leaf(Value::dual(Value::regex("[a-z]+"), Value::literal("abc"))),
        )]));
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        let observed = json!({"id": "xyz"});
        assert!(match_json(&observed, Some(&body), &[], Side::Client, &ctx).is_exact_match());
        assert!(!match_json(&observed, Some(&body), &[], Side::Server, &ctx).is_exact_match());
    }

    #[test]
    fn test_optional_leaf() {
        let body = BodyNode::Object(BTreeMap::from([(
            "nick".to_string(),
            BodyNode::leaf(Value::optional(Value::literal("duck"))),
        )]));
        assert!(run(&json!({}), Some(&body), &[]).is_exact_match());
        assert!(run(&json!({"nick": "duck"}), Some(&body), &[]).is_exact_match());
        assert!(!run(&json!({"nick": "goose"}), Some(&body), &[]).is_exact_match());
    }
}
