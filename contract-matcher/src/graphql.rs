//! GraphQL envelope layer.
//!
//! A GraphQL request body is JSON of the form
//! `{"query": "...", "variables": {...}, "operationName": "..."}`. The query
//! document is compared with whitespace collapsed, `variables` as a nested
//! structure and `operationName` by plain equality. Declared header rules
//! and body rules are evaluated by the generic engines on top.

use crate::config::MatcherConfig;
use crate::contract::{Body, Contract};
use crate::engine::json::match_json;
use crate::engine::keyed::match_keyed;
use crate::engine::{MatchContext, json_eq};
use crate::envelope::EnvelopeMatcher;
use crate::error::{MatchError, ModelError};
use crate::rule::RuleScope;
use crate::stub::ObservedRequest;
use crate::value::{Part, Resolved, Side, resolve_part};
use crate::verdict::MatchVerdict;
use serde_json::{Map, Value as JsonValue};
use tracing::{instrument, warn};

/// Query document key.
pub const QUERY: &str = "query";
/// Variables key.
pub const VARIABLES: &str = "variables";
/// Operation name key.
pub const OPERATION_NAME: &str = "operationName";

/// Collapse every whitespace run to a single space and trim.
///
/// # Examples
///
/// ```
/// use contract_matcher::graphql::normalize_query;
///
/// assert_eq!(normalize_query("query Q {\n  a\n}\n"), "query Q { a }");
/// ```
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The envelope a contract declares, ready for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExpectedEnvelope {
    query: String,
    operation_name: Option<JsonValue>,
    variables: Map<String, JsonValue>,
}

/// Matches GraphQL-over-HTTP requests.
#[derive(Debug, Clone)]
pub struct GraphQlMatcher {
    tools: Vec<String>,
}

impl Default for GraphQlMatcher {
    fn default() -> Self {
        Self::from_config(&MatcherConfig::default())
    }
}

impl GraphQlMatcher {
    /// Create a matcher applicable to the default `graphql` tool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher applicable to the configured tools.
    #[must_use]
    pub fn from_config(config: &MatcherConfig) -> Self {
        Self {
            tools: config.graphql_tools.clone(),
        }
    }
}

impl EnvelopeMatcher for GraphQlMatcher {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn is_applicable(&self, tool: &str) -> bool {
        let tool = tool.trim();
        self.tools.iter().any(|t| t.eq_ignore_ascii_case(tool))
    }

    #[instrument(skip_all, fields(contract = %contract.name))]
    fn match_request(
        &self,
        contract: &Contract,
        observed: &ObservedRequest,
        ctx: &MatchContext<'_>,
    ) -> MatchVerdict {
        let cap = ctx.config.max_reported_failures;
        let body_ctx = ctx.scoped(RuleScope::RequestBody);
        let mut verdict = MatchVerdict::exact();

        let expected = match expected_envelope(contract) {
            Ok(expected) => expected,
            Err(err) => {
                warn!(error = %err, "Contract does not declare a usable GraphQL envelope");
                body_ctx.record(&mut verdict, "$", err.into());
                return verdict;
            }
        };
        let document = match parse_observed(observed.body.as_deref()) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "Observed request is not a GraphQL envelope");
                body_ctx.record(&mut verdict, "$", err);
                return verdict;
            }
        };

        match document.get(QUERY).and_then(JsonValue::as_str) {
            Some(query) => {
                let query = normalize_query(query);
                if query != expected.query {
                    body_ctx.record(
                        &mut verdict,
                        "$.query",
                        MatchError::mismatch(&expected.query, query),
                    );
                }
            }
            None => body_ctx.record(&mut verdict, "$.query", MatchError::traversal("$.query")),
        }

        let operation_name = non_null(document.get(OPERATION_NAME));
        if expected.operation_name.as_ref() != operation_name {
            body_ctx.record(
                &mut verdict,
                "$.operationName",
                MatchError::mismatch(render(expected.operation_name.as_ref()), render(operation_name)),
            );
        }

        match observed_variables(&document) {
            Ok(variables) => {
                let expected_vars = JsonValue::Object(expected.variables);
                let observed_vars = JsonValue::Object(variables);
                if !json_eq(&expected_vars, &observed_vars) {
                    body_ctx.record(
                        &mut verdict,
                        "$.variables",
                        MatchError::mismatch(expected_vars.to_string(), observed_vars.to_string()),
                    );
                }
            }
            Err(err) => body_ctx.record(&mut verdict, "$.variables", err),
        }

        verdict.merge(
            match_keyed(
                &observed.headers,
                &contract.request.headers,
                contract.rules(RuleScope::RequestHeaders),
                Side::Client,
                &ctx.scoped(RuleScope::RequestHeaders),
            ),
            cap,
        );
        let body_rules = contract.rules(RuleScope::RequestBody);
        if !body_rules.is_empty() {
            verdict.merge(
                match_json(&document, None, body_rules, Side::Client, &body_ctx),
                cap,
            );
        }
        verdict
    }
}

fn non_null(value: Option<&JsonValue>) -> Option<&JsonValue> {
    value.filter(|v| !v.is_null())
}

fn render(value: Option<&JsonValue>) -> String {
    value.map_or_else(|| "null".to_string(), ToString::to_string)
}

fn expected_envelope(contract: &Contract) -> Result<ExpectedEnvelope, ModelError> {
    let document = match &contract.request.body {
        Some(Body::Json(node)) => node.to_json(Side::Client, Part::Request)?,
        Some(Body::Text(value)) => match resolve_part(value, Side::Client, Part::Request)?.resolved {
            Resolved::Literal(JsonValue::String(text)) => serde_json::from_str(&text)
                .map_err(|e| ModelError::unresolvable(format!("request body is not JSON: {e}")))?,
            _ => return Err(ModelError::unresolvable("request body has no concrete text")),
        },
        Some(Body::Xml(_)) | None => {
            return Err(ModelError::unresolvable(
                "GraphQL contract needs a JSON request body",
            ));
        }
    };
    let JsonValue::Object(mut fields) = document else {
        return Err(ModelError::NotAMapping("body".to_string()));
    };
    let query = fields
        .get(QUERY)
        .and_then(JsonValue::as_str)
        .map(normalize_query)
        .ok_or_else(|| ModelError::MissingExpected("$.query".to_string()))?;
    let operation_name = fields.remove(OPERATION_NAME).filter(|v| !v.is_null());
    let variables = match fields.remove(VARIABLES) {
        None | Some(JsonValue::Null) => Map::new(),
        Some(JsonValue::Object(variables)) => variables,
        Some(_) => return Err(ModelError::NotAMapping(VARIABLES.to_string())),
    };
    Ok(ExpectedEnvelope {
        query,
        operation_name,
        variables,
    })
}

fn parse_observed(body: Option<&str>) -> Result<JsonValue, MatchError> {
    let body = body
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| MatchError::malformed("request body is empty"))?;
    let document: JsonValue =
        serde_json::from_str(body).map_err(|e| MatchError::malformed(e.to_string()))?;
    if document.is_object() {
        Ok(document)
    } else {
        Err(MatchError::malformed("request body is not a JSON object"))
    }
}

fn observed_variables(document: &JsonValue) -> Result<Map<String, JsonValue>, MatchError> {
    match document.get(VARIABLES) {
        None | Some(JsonValue::Null) => Ok(Map::new()),
        Some(JsonValue::Object(variables)) => Ok(variables.clone()),
        Some(JsonValue::String(text)) => serde_json::from_str(text)
            .map_err(|_| MatchError::malformed("variables is not a JSON mapping")),
        Some(_) => Err(MatchError::malformed("variables is not a JSON mapping")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Request, Response, UrlSpec};
    use crate::error::ErrorKind;
    use crate::rule::MatchingRule;
    use crate::value::Value;
    use serde_json::json;

    const QUERY_TEXT: &str =
        "query queryName($personName: String!) {\n  personToCheck(name: $personName) {\n    name\n    age\n  }\n}\n\n\n\n";

    fn contract(body: Body) -> Contract {
        Contract::new(
            "graphql",
            Request::new("POST", UrlSpec::Url(Value::literal("/graphql")))
                .with_header("Content-Type", "application/json")
                .with_body(body),
            Response::new(200),
        )
        .with_metadata("verifier", json!({"tool": "graphql"}))
    }

    fn valid_contract() -> Contract {
        contract(Body::json(json!({
            "query": "query queryName($personName: String!) { personToCheck(name: $personName) { name age } }",
            "variables": {"personName": "Old Enough"},
            "operationName": "queryName"
        })))
    }

    fn observed(body: &JsonValue) -> ObservedRequest {
        ObservedRequest::new("POST", "/graphql")
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    fn run(contract: &Contract, request: &ObservedRequest) -> MatchVerdict {
        let config = MatcherConfig::default();
        let ctx = MatchContext::new(&config, RuleScope::RequestBody);
        GraphQlMatcher::new().match_request(contract, request, &ctx)
    }

    #[test]
    fn test_applicability() {
        let matcher = GraphQlMatcher::new();
        assert!(matcher.is_applicable("graphql"));
        assert!(matcher.is_applicable("GraphQL"));
        assert!(!matcher.is_applicable("unknown"));
    }

    #[test]
    fn test_matches_regardless_of_query_whitespace() {
        let request = observed(&json!({
            "query": QUERY_TEXT,
            "variables": {"personName": "Old Enough"},
            "operationName": "queryName"
        }));
        assert!(run(&valid_contract(), &request).is_exact_match());
    }

    #[test]
    fn test_query_mismatch() {
        let request = observed(&json!({
            "query": "this should not match",
            "variables": {"personName": "Old Enough"},
            "operationName": "queryName"
        }));
        let verdict = run(&valid_contract(), &request);
        assert_eq!(verdict.failing_paths(), vec!["$.query"]);
    }

    #[test]
    fn test_variables_mismatch() {
        let request = observed(&json!({
            "query": QUERY_TEXT,
            "variables": {"Not matching key": "Not matching value"},
            "operationName": "queryName"
        }));
        let verdict = run(&valid_contract(), &request);
        assert_eq!(verdict.failing_paths(), vec!["$.variables"]);
    }

    #[test]
    fn test_operation_name_mismatch() {
        let request = observed(&json!({
            "query": QUERY_TEXT,
            "variables": {"personName": "Old Enough"},
            "operationName": "not matching operation name"
        }));
        let verdict = run(&valid_contract(), &request);
        assert_eq!(verdict.failing_paths(), vec!["$.operationName"]);
    }

    #[test]
    fn test_variables_string_in_contract_is_model_error() {
        let broken = contract(Body::json(json!({
            "query": "query Q { a }",
            "variables": "This should actually be a map not a string",
            "operationName": "Q"
        })));
        let request = observed(&json!({"query": "query Q { a }", "operationName": "Q"}));
        let verdict = run(&broken, &request);
        assert!(!verdict.is_exact_match());
        assert!(verdict.has_failure_kind(ErrorKind::Model));
    }

    #[test]
    fn test_missing_or_malformed_observed_body() {
        let empty = ObservedRequest::new("POST", "/graphql");
        let verdict = run(&valid_contract(), &empty);
        assert!(verdict.has_failure_kind(ErrorKind::MalformedBody));

        let garbage = ObservedRequest::new("POST", "/graphql").with_body("{not json");
        let verdict = run(&valid_contract(), &garbage);
        assert!(verdict.has_failure_kind(ErrorKind::MalformedBody));
    }

    #[test]
    fn test_absent_and_null_variables_are_equivalent() {
        let lean = contract(Body::json(json!({"query": "query Q { a }"})));
        let request = observed(&json!({"query": "query Q {\n  a\n}", "variables": null}));
        assert!(run(&lean, &request).is_exact_match());

        let request = observed(&json!({"query": "query Q { a }", "variables": {}}));
        assert!(run(&lean, &request).is_exact_match());
    }

    #[test]
    fn test_variables_sent_as_string() {
        let request = observed(&json!({
            "query": QUERY_TEXT,
            "variables": "{\"personName\": \"Old Enough\"}",
            "operationName": "queryName"
        }));
        assert!(run(&valid_contract(), &request).is_exact_match());
    }

    #[test]
    fn test_header_and_body_rules_apply() {
        let mut contract = valid_contract();
        contract
            .request
            .matchers
            .body
            .push(MatchingRule::by_regex("$.variables.personName", "[A-Za-z ]+"));
        let request = ObservedRequest::new("POST", "/graphql")
            .with_header("Content-Type", "text/plain")
            .with_body(
                json!({
                    "query": QUERY_TEXT,
                    "variables": {"personName": "Old Enough"},
                    "operationName": "queryName"
                })
                .to_string(),
            );
        let verdict = run(&contract, &request);
        assert_eq!(verdict.failing_paths(), vec!["Content-Type"]);
    }
}
