//! Assertion plans for code generators.
//!
//! A plan lists every check a contract implies for one message, already
//! resolved for the side that performs it. Rendering the plan into test
//! source is left to the caller.

use crate::command::CommandInvocation;
use crate::contract::{Body, Contract, NamedValue, UrlSpec};
use crate::engine::json::{Leaf, leaves, select as select_json};
use crate::engine::xml::select as select_xml;
use crate::error::ModelError;
use crate::path::{Location, PathExpr, Syntax};
use crate::rule::{MatchingRule, RuleScope};
use crate::strategy::{MatchingStrategy, TypeKind, textual};
use crate::value::{Part, Resolved, ResolvedValue, Side, Value, resolve_part};
use serde_json::{Value as JsonValue, json};

/// What must hold for the value at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Deep equality with a literal
    Equals(JsonValue),
    /// Textual form matches an anchored pattern
    Matches(String),
    /// Lexical form belongs to a type grammar
    OfType(TypeKind),
    /// Absent or null
    IsNull,
    /// Delegated to a named command; holds the declared expression
    Command(String),
}

/// One check within a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionSpec {
    /// Scope of the checked value; `None` for method, URL and status
    pub scope: Option<RuleScope>,
    /// Bracketed JSON path, XML path, or entry name
    pub path: String,
    /// Side performing the check
    pub side: Side,
    /// The check itself
    pub expectation: Expectation,
}

impl AssertionSpec {
    /// The command call to emit, with `$it` replaced by `accessor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_matcher::assertion::{AssertionSpec, Expectation};
    /// use contract_matcher::{RuleScope, Side};
    ///
    /// let spec = AssertionSpec {
    ///     scope: Some(RuleScope::ResponseBody),
    ///     path: "['foo3']".to_string(),
    ///     side: Side::Server,
    ///     expectation: Expectation::Command("executeMe($it)".to_string()),
    /// };
    /// assert_eq!(spec.render_command("body['foo3']").as_deref(), Some("executeMe(body['foo3'])"));
    /// ```
    #[must_use]
    pub fn render_command(&self, accessor: &str) -> Option<String> {
        match &self.expectation {
            Expectation::Command(expression) => Some(
                CommandInvocation::new(expression.clone(), JsonValue::Null, self.path.clone())
                    .render_with(accessor),
            ),
            _ => None,
        }
    }
}

/// Checks a stub applies to an incoming request.
///
/// # Errors
///
/// Returns a [`ModelError`] when a value can not be resolved, a rule path
/// does not parse, or an equality rule has nothing to compare against.
pub fn plan_request(contract: &Contract) -> Result<Vec<AssertionSpec>, ModelError> {
    let side = Side::Client;
    let request = &contract.request;
    let mut plan = Planner::new(side);

    plan.value(None, "method", &request.method, Part::Request)?;
    match &request.url {
        UrlSpec::Url(value) => plan.value(None, "url", value, Part::Request)?,
        UrlSpec::UrlPath(value) => plan.value(None, "urlPath", value, Part::Request)?,
    }
    for (scope, declared) in [
        (RuleScope::QueryParameters, &request.query_parameters),
        (RuleScope::RequestHeaders, &request.headers),
        (RuleScope::RequestCookies, &request.cookies),
    ] {
        plan.keyed(scope, declared, contract.rules(scope))?;
    }
    plan.body(
        RuleScope::RequestBody,
        request.body.as_ref(),
        contract.rules(RuleScope::RequestBody),
    )?;
    Ok(plan.specs)
}

/// Checks a generated producer test applies to the response.
///
/// # Errors
///
/// Returns a [`ModelError`] under the same conditions as [`plan_request`].
pub fn plan_response(contract: &Contract) -> Result<Vec<AssertionSpec>, ModelError> {
    let side = Side::Server;
    let response = &contract.response;
    let mut plan = Planner::new(side);

    plan.push(None, "status", Expectation::Equals(json!(response.status)));
    for (scope, declared) in [
        (RuleScope::ResponseHeaders, &response.headers),
        (RuleScope::ResponseCookies, &response.cookies),
    ] {
        plan.keyed(scope, declared, contract.rules(scope))?;
    }
    plan.body(
        RuleScope::ResponseBody,
        response.body.as_ref(),
        contract.rules(RuleScope::ResponseBody),
    )?;
    Ok(plan.specs)
}

struct Planner {
    side: Side,
    specs: Vec<AssertionSpec>,
}

impl Planner {
    const fn new(side: Side) -> Self {
        Self {
            side,
            specs: Vec::new(),
        }
    }

    fn push(&mut self, scope: Option<RuleScope>, path: impl Into<String>, expectation: Expectation) {
        self.specs.push(AssertionSpec {
            scope,
            path: path.into(),
            side: self.side,
            expectation,
        });
    }

    fn value(
        &mut self,
        scope: Option<RuleScope>,
        path: &str,
        value: &Value,
        part: Part,
    ) -> Result<(), ModelError> {
        let resolved = resolve_part(value, self.side, part)?;
        let expectation = from_resolved(&resolved, path)?;
        self.push(scope, path, expectation);
        Ok(())
    }

    fn keyed(
        &mut self,
        scope: RuleScope,
        declared: &[NamedValue],
        rules: &[MatchingRule],
    ) -> Result<(), ModelError> {
        let same_name = |left: &str, right: &str| match scope {
            RuleScope::RequestHeaders | RuleScope::ResponseHeaders => left.eq_ignore_ascii_case(right),
            _ => left == right,
        };
        for entry in declared {
            if rules.iter().any(|rule| same_name(&rule.path, &entry.name)) {
                continue;
            }
            let resolved = resolve_part(&entry.value, self.side, scope.part())?;
            let expectation = match from_resolved(&resolved, &entry.name)? {
                Expectation::Equals(literal) => Expectation::Equals(JsonValue::String(textual(&literal))),
                other => other,
            };
            self.push(Some(scope), entry.name.clone(), expectation);
        }
        for rule in rules {
            let expected = declared
                .iter()
                .find(|entry| same_name(&entry.name, &rule.path))
                .map(|entry| resolve_part(&entry.value, self.side, scope.part()))
                .transpose()?
                .and_then(|resolved| resolved.as_literal().map(|v| JsonValue::String(textual(v))));
            let expectation = from_strategy(&rule.strategy, expected.as_ref(), &rule.path)?;
            self.push(Some(scope), rule.path.clone(), expectation);
        }
        Ok(())
    }

    fn body(
        &mut self,
        scope: RuleScope,
        body: Option<&Body>,
        rules: &[MatchingRule],
    ) -> Result<(), ModelError> {
        match body {
            Some(Body::Json(node)) => {
                let parsed = rules
                    .iter()
                    .map(|rule| PathExpr::parse_json(&rule.path).map(|path| (rule, path)))
                    .collect::<Result<Vec<_>, _>>()?;
                let covered: Vec<Location> = parsed
                    .iter()
                    .flat_map(|(_, path)| select_json(path, node).into_iter().map(|(l, _)| l))
                    .collect();
                let mut implicit = Vec::new();
                leaves(Location::root(Syntax::Json), node, &mut implicit);
                for (location, leaf) in implicit {
                    if covered.iter().any(|c| c.is_prefix_of(&location)) {
                        continue;
                    }
                    let path = location.bracketed();
                    let expectation = match leaf {
                        Leaf::Value(value) => {
                            from_resolved(&resolve_part(value, self.side, scope.part())?, &path)?
                        }
                        Leaf::EmptyObject => Expectation::Equals(json!({})),
                        Leaf::EmptyArray => Expectation::Equals(json!([])),
                    };
                    self.push(Some(scope), path, expectation);
                }
                for (rule, path) in &parsed {
                    if rule.strategy != MatchingStrategy::Equality {
                        let expectation = from_strategy(&rule.strategy, None, &rule.path)?;
                        self.push(Some(scope), path.bracketed(), expectation);
                        continue;
                    }
                    let hits = select_json(path, node);
                    if hits.is_empty() {
                        return Err(ModelError::MissingExpected(rule.path.clone()));
                    }
                    for (location, hit) in hits {
                        let literal = hit.to_json(self.side, scope.part())?;
                        self.push(Some(scope), location.bracketed(), Expectation::Equals(literal));
                    }
                }
            }
            Some(Body::Xml(template)) => {
                let document = roxmltree::Document::parse(template)
                    .map_err(|e| ModelError::unresolvable(format!("XML template: {e}")))?;
                for rule in rules {
                    let path = PathExpr::parse_xml(&rule.path)?;
                    if rule.strategy != MatchingStrategy::Equality {
                        let expectation = from_strategy(&rule.strategy, None, &rule.path)?;
                        self.push(Some(scope), rule.path.clone(), expectation);
                        continue;
                    }
                    let hits = select_xml(&path, &document);
                    if hits.is_empty() {
                        return Err(ModelError::MissingExpected(rule.path.clone()));
                    }
                    for hit in hits {
                        let literal = JsonValue::String(hit.value(true));
                        self.push(Some(scope), hit.location().to_string(), Expectation::Equals(literal));
                    }
                }
            }
            Some(Body::Text(value)) => {
                self.value(Some(scope), "body", value, scope.part())?;
                for rule in rules {
                    let expectation = from_strategy(&rule.strategy, None, &rule.path)?;
                    self.push(Some(scope), rule.path.clone(), expectation);
                }
            }
            None => {
                for rule in rules {
                    let path = if rule.path.starts_with('/') {
                        PathExpr::parse_xml(&rule.path)?.to_string()
                    } else {
                        PathExpr::parse_json(&rule.path)?.bracketed()
                    };
                    let expectation = from_strategy(&rule.strategy, None, &rule.path)?;
                    self.push(Some(scope), path, expectation);
                }
            }
        }
        Ok(())
    }
}

fn from_resolved(resolved: &ResolvedValue, path: &str) -> Result<Expectation, ModelError> {
    if resolved.optional {
        return Ok(Expectation::Matches(resolved.render()));
    }
    match &resolved.resolved {
        Resolved::Absent => Ok(Expectation::IsNull),
        Resolved::Literal(literal) => Ok(Expectation::Equals(literal.clone())),
        Resolved::Matcher(strategy) => from_strategy(strategy, None, path),
    }
}

fn from_strategy(
    strategy: &MatchingStrategy,
    expected: Option<&JsonValue>,
    path: &str,
) -> Result<Expectation, ModelError> {
    let expectation = match strategy.normalized()?.as_ref() {
        MatchingStrategy::Equality => Expectation::Equals(
            expected
                .cloned()
                .ok_or_else(|| ModelError::MissingExpected(path.to_string()))?,
        ),
        MatchingStrategy::Regex { pattern, flavor } => {
            Expectation::Matches(flavor.prepare(pattern).into_owned())
        }
        MatchingStrategy::Type(kind) => Expectation::OfType(*kind),
        MatchingStrategy::Null => Expectation::IsNull,
        MatchingStrategy::Command(expression) => Expectation::Command(expression.clone()),
        MatchingStrategy::Predefined(name) => {
            return Err(ModelError::UnknownPredefined(name.clone()));
        }
    };
    Ok(expectation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Request, Response};
    use crate::rule::{RequestMatchers, ResponseMatchers};

    fn response_contract() -> Contract {
        Contract::new(
            "response plan",
            Request::new("GET", UrlSpec::UrlPath(Value::literal("/ducks"))),
            Response::new(200)
                .with_header("Content-Type", Value::regex("application/json.*"))
                .with_body(Body::json(json!({
                    "foo": "bar",
                    "foo3": "anything",
                    "nullValue": null,
                    "items": [],
                })))
                .with_matchers(ResponseMatchers {
                    body: vec![
                        MatchingRule::by_command("$.foo3", "executeMe($it)"),
                        MatchingRule::by_null("$.nullValue"),
                    ],
                    ..ResponseMatchers::default()
                }),
        )
    }

    fn find<'a>(plan: &'a [AssertionSpec], path: &str) -> &'a Expectation {
        &plan
            .iter()
            .find(|spec| spec.path == path)
            .unwrap_or_else(|| panic!("no assertion at {path}"))
            .expectation
    }

    #[test]
    fn test_plan_response() {
        let plan = plan_response(&response_contract()).unwrap();
        assert!(plan.iter().all(|spec| spec.side == Side::Server));
        assert_eq!(find(&plan, "status"), &Expectation::Equals(json!(200)));
        assert_eq!(
            find(&plan, "Content-Type"),
            &Expectation::Matches("application/json.*".to_string())
        );
        assert_eq!(find(&plan, "['foo']"), &Expectation::Equals(json!("bar")));
        assert_eq!(find(&plan, "['items']"), &Expectation::Equals(json!([])));
        assert_eq!(
            find(&plan, "['foo3']"),
            &Expectation::Command("executeMe($it)".to_string())
        );
        assert_eq!(find(&plan, "['nullValue']"), &Expectation::IsNull);
        assert_eq!(plan.iter().filter(|s| s.path == "['foo3']").count(), 1);
    }

    #[test]
    fn test_command_rendering() {
        let plan = plan_response(&response_contract()).unwrap();
        let spec = plan.iter().find(|s| s.path == "['foo3']").unwrap();
        assert_eq!(
            spec.render_command("parsedJson.read(\"$.foo3\")").as_deref(),
            Some("executeMe(parsedJson.read(\"$.foo3\"))")
        );
        assert_eq!(plan[0].render_command("x"), None);
    }

    #[test]
    fn test_plan_request_uses_client_matchers() {
        let contract = Contract::new(
            "request plan",
            Request::new("PUT", UrlSpec::Url(Value::regex("/ducks/[0-9]+")))
                .with_query_parameter("limit", Value::literal(10))
                .with_header("Accept", Value::optional(Value::literal("application/json")))
                .with_body(Body::json(json!({"id": 1, "tags": ["a"]})))
                .with_matchers(RequestMatchers {
                    body: vec![MatchingRule::by_type("$.tags[*]", TypeKind::NonEmptyString)],
                    ..RequestMatchers::default()
                }),
            Response::new(204),
        );
        let plan = plan_request(&contract).unwrap();
        assert!(plan.iter().all(|spec| spec.side == Side::Client));
        assert_eq!(find(&plan, "method"), &Expectation::Equals(json!("PUT")));
        assert_eq!(find(&plan, "url"), &Expectation::Matches("/ducks/[0-9]+".to_string()));
        assert_eq!(find(&plan, "limit"), &Expectation::Equals(json!("10")));
        assert_eq!(
            find(&plan, "Accept"),
            &Expectation::Matches("(application/json)?".to_string())
        );
        assert_eq!(find(&plan, "['id']"), &Expectation::Equals(json!(1)));
        assert_eq!(find(&plan, "['tags'][*]"), &Expectation::OfType(TypeKind::NonEmptyString));
        assert!(plan.iter().all(|spec| spec.path != "['tags'][0]"));
    }

    #[test]
    fn test_predefined_and_equality_rules() {
        let contract = Contract::new(
            "rules",
            Request::new("GET", UrlSpec::UrlPath(Value::literal("/"))),
            Response::new(200)
                .with_body(Body::json(json!({"id": "x", "code": 5})))
                .with_matchers(ResponseMatchers {
                    body: vec![
                        MatchingRule::new("$.id", MatchingStrategy::predefined("uuid")),
                        MatchingRule::by_equality("$.code"),
                    ],
                    ..ResponseMatchers::default()
                }),
        );
        let plan = plan_response(&contract).unwrap();
        assert!(matches!(find(&plan, "['id']"), Expectation::Matches(p) if p.starts_with("[a-f0-9]{8}")));
        assert_eq!(find(&plan, "['code']"), &Expectation::Equals(json!(5)));
    }

    #[test]
    fn test_xml_plan() {
        let contract = Contract::new(
            "xml",
            Request::new("GET", UrlSpec::UrlPath(Value::literal("/"))),
            Response::new(200)
                .with_body(Body::xml("<test><duck type='xtype'>123</duck></test>"))
                .with_matchers(ResponseMatchers {
                    body: vec![
                        MatchingRule::by_regex("/test/duck/text()", "[0-9]{3}"),
                        MatchingRule::by_equality("/test/duck/@type"),
                    ],
                    ..ResponseMatchers::default()
                }),
        );
        let plan = plan_response(&contract).unwrap();
        assert_eq!(
            find(&plan, "/test/duck/text()"),
            &Expectation::Matches("[0-9]{3}".to_string())
        );
        assert_eq!(find(&plan, "/test/duck/@type"), &Expectation::Equals(json!("xtype")));
    }

    #[test]
    fn test_model_errors() {
        let missing = Contract::new(
            "missing",
            Request::new("GET", UrlSpec::UrlPath(Value::literal("/"))),
            Response::new(200).with_matchers(ResponseMatchers {
                body: vec![MatchingRule::by_equality("$.gone")],
                ..ResponseMatchers::default()
            }),
        );
        assert_eq!(
            plan_response(&missing),
            Err(ModelError::MissingExpected("$.gone".to_string()))
        );

        let unknown = Contract::new(
            "unknown",
            Request::new("GET", UrlSpec::UrlPath(Value::predefined("nope"))),
            Response::new(200),
        );
        assert!(matches!(plan_request(&unknown), Err(ModelError::UnknownPredefined(_))));
    }
}
