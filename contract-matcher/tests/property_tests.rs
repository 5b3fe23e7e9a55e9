//! Property-based tests for the matching engine.
//!
//! Tests validate:
//! - Property 1: Generated Regex Examples Match Their Pattern
//! - Property 2: Implicit Equality Follows Deep Equality
//! - Property 3: Optional Values Tolerate Absence Only
//! - Property 4: GraphQL Query Comparison Ignores Whitespace
//! - Property 5: Unregistered Commands Degrade the Verdict

use contract_matcher::engine::check_resolved;
use contract_matcher::engine::json::match_json;
use contract_matcher::graphql::normalize_query;
use contract_matcher::{
    BodyNode, CommandTable, ContractMatcher, MatchContext, MatcherConfig, MatchingRule, Resolved,
    RuleScope, Side, Value, resolve,
};
use proptest::prelude::*;
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use test_utils::fixtures::{graphql_contract, graphql_request};
use test_utils::{
    graphql_query_strategy, json_document_strategy, json_leaf_strategy, json_object_strategy,
    json_scalar_strategy, key_strategy, pattern_strategy,
};

fn object(key: &str, value: JsonValue) -> JsonValue {
    let mut fields = Map::new();
    fields.insert(key.to_string(), value);
    JsonValue::Object(fields)
}

fn single_field(key: &str, value: Value) -> BodyNode {
    BodyNode::Object(BTreeMap::from([(key.to_string(), BodyNode::leaf(value))]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Generated Regex Examples Match Their Pattern**
    /// *For any* regex value, the example resolved for the client side SHALL
    /// satisfy the matcher resolved for the server side.
    #[test]
    fn prop_regex_example_round_trip(pattern in pattern_strategy()) {
        let value = Value::regex(pattern.clone());
        let client = resolve(&value, Side::Client).unwrap();
        let server = resolve(&value, Side::Server).unwrap();

        let Resolved::Literal(example) = &client.resolved else {
            return Err(TestCaseError::fail(format!("no example for {pattern}")));
        };
        prop_assert!(matches!(server.resolved, Resolved::Matcher(_)));

        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        prop_assert!(
            check_resolved(&server, Some(example), "$.v", &ctx).is_ok(),
            "example {} does not match {}", example, pattern
        );
    }

    /// **Property 1b: Example Generation Is Deterministic**
    #[test]
    fn prop_regex_example_is_deterministic(pattern in pattern_strategy()) {
        let value = Value::regex(pattern);
        prop_assert_eq!(
            resolve(&value, Side::Client).unwrap(),
            resolve(&value, Side::Client).unwrap()
        );
    }

    /// **Property 2: Implicit Equality Follows Deep Equality**
    /// *For any* contract body without rules, a leaf SHALL match iff the
    /// observed value at its path deep-equals the contract value.
    #[test]
    fn prop_implicit_equality_iff_equal(
        key in key_strategy(),
        expected in json_leaf_strategy(),
        observed in prop_oneof![json_leaf_strategy(), json_document_strategy()],
    ) {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        let body = BodyNode::from(object(&key, expected.clone()));
        let document = object(&key, observed.clone());

        let verdict = match_json(&document, Some(&body), &[], Side::Server, &ctx);
        prop_assert_eq!(verdict.is_exact_match(), expected == observed);
    }

    /// **Property 2b: A Document Matches Its Own Contract**
    #[test]
    fn prop_document_matches_itself(document in json_object_strategy()) {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        let body = BodyNode::from(document.clone());

        for side in [Side::Client, Side::Server] {
            let verdict = match_json(&document, Some(&body), &[], side, &ctx);
            prop_assert!(verdict.is_exact_match(), "{}", verdict);
        }
    }

    /// **Property 3: Optional Values Tolerate Absence Only**
    /// *For any* optional value, absence SHALL pass and a different present
    /// value SHALL fail.
    #[test]
    fn prop_optional_absence_passes(
        key in key_strategy(),
        expected in json_scalar_strategy(),
        observed in json_scalar_strategy(),
    ) {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
        let body = single_field(&key, Value::optional(Value::literal(expected.clone())));

        let absent = match_json(&json!({}), Some(&body), &[], Side::Server, &ctx);
        prop_assert!(absent.is_exact_match());

        let present = match_json(&object(&key, observed.clone()), Some(&body), &[], Side::Server, &ctx);
        prop_assert_eq!(present.is_exact_match(), expected == observed);
    }

    /// **Property 4: GraphQL Query Comparison Ignores Whitespace**
    #[test]
    fn prop_graphql_whitespace_insensitive((compact, formatted) in graphql_query_strategy()) {
        prop_assert_eq!(normalize_query(&formatted), compact.clone());

        let mut contract = graphql_contract();
        contract.request = contract.request.with_body(contract_matcher::Body::json(json!({
            "query": compact,
            "variables": {"personName": "Old Enough"},
            "operationName": "queryName",
        })));
        let request = graphql_request().with_body(
            json!({
                "query": formatted,
                "variables": {"personName": "Old Enough"},
                "operationName": "queryName",
            })
            .to_string(),
        );
        let verdict = ContractMatcher::default().match_request(&contract, &request);
        prop_assert!(verdict.is_exact_match(), "{}", verdict);
    }

    /// **Property 5: Unregistered Commands Degrade the Verdict**
    /// *For any* observed value, a command missing from the table SHALL
    /// produce a non-exact verdict naming the command, never a panic.
    #[test]
    fn prop_unregistered_command_is_reported(
        name in "[a-z][a-zA-Z]{2,10}",
        observed in json_scalar_strategy(),
    ) {
        let config = MatcherConfig::default();
        let table = CommandTable::new();
        let ctx = MatchContext::new(&config, RuleScope::ResponseBody).with_commands(&table);
        let rules = [MatchingRule::by_command("$.value", format!("{name}($it)"))];

        let verdict = match_json(&json!({"value": observed}), None, &rules, Side::Server, &ctx);
        prop_assert!(!verdict.is_exact_match());
        prop_assert!(verdict.to_string().contains(&name));
    }
}

#[test]
fn test_null_is_absent_in_both_directions() {
    let config = MatcherConfig::default();
    let ctx = MatchContext::new(&config, RuleScope::ResponseBody);
    let body = BodyNode::from(json!({"gone": null}));

    assert!(match_json(&json!({}), Some(&body), &[], Side::Server, &ctx).is_exact_match());
    assert!(match_json(&json!({"gone": null}), Some(&body), &[], Side::Server, &ctx).is_exact_match());
    assert!(!match_json(&json!({"gone": 5}), Some(&body), &[], Side::Server, &ctx).is_exact_match());
}
