//! Sample contracts.
//!
//! Each fixture pairs a contract with observed messages that match it
//! exactly, so tests can start from a passing exchange and perturb it.

use contract_matcher::{
    Body, Contract, MatchingRule, MatchingStrategy, ObservedRequest, ObservedResponse, Request,
    RequestMatchers, Response, ResponseMatchers, TypeKind, UrlSpec, Value,
};
use serde_json::{Value as JsonValue, json};

/// GraphQL query declared by [`graphql_contract`].
pub const GRAPHQL_QUERY: &str =
    "query queryName($personName: String!) { personToCheck(name: $personName) { name age } }";

/// A JSON contract with regex, type, null and command rules.
#[must_use]
pub fn json_contract() -> Contract {
    Contract::new(
        "should find a duck",
        Request::new("POST", UrlSpec::UrlPath(Value::literal("/ducks")))
            .with_query_parameter("limit", Value::regex("[0-9]{1,3}"))
            .with_header("Content-Type", "application/json")
            .with_body(Body::json(json!({"name": "duck", "age": 3})))
            .with_matchers(RequestMatchers {
                body: vec![MatchingRule::by_type("$.age", TypeKind::Number)],
                ..RequestMatchers::default()
            }),
        Response::new(200)
            .with_header(
                "Content-Type",
                Value::dual(
                    Value::literal("application/json"),
                    Value::regex("application/json.*"),
                ),
            )
            .with_body(Body::json(json!({
                "foo": "bar",
                "foo2": "2016-01-01",
                "foo3": "executed",
                "nullValue": null,
                "items": [{"id": 1}, {"id": 2}],
            })))
            .with_matchers(ResponseMatchers {
                body: vec![
                    MatchingRule::by_type("$.foo2", TypeKind::Date),
                    MatchingRule::by_command("$.foo3", "executeMe($it)"),
                    MatchingRule::by_null("$.nullValue"),
                    MatchingRule::new("$.items[*].id", MatchingStrategy::predefined("positive int")),
                ],
                ..ResponseMatchers::default()
            }),
    )
    .with_description("Returns the duck with a generated id")
}

/// A request matching [`json_contract`].
#[must_use]
pub fn json_request() -> ObservedRequest {
    ObservedRequest::new("POST", "/ducks")
        .with_query("limit", "10")
        .with_header("Content-Type", "application/json")
        .with_body(json!({"name": "duck", "age": 7}).to_string())
}

/// A response matching [`json_contract`].
#[must_use]
pub fn json_response() -> ObservedResponse {
    ObservedResponse::new(200)
        .with_header("Content-Type", "application/json;charset=UTF-8")
        .with_body(json_response_body().to_string())
}

/// Body of [`json_response`].
#[must_use]
pub fn json_response_body() -> JsonValue {
    json!({
        "foo": "bar",
        "foo2": "2020-02-29",
        "foo3": "whatever the command decides",
        "items": [{"id": 10}, {"id": 20}],
        "extra": true,
    })
}

/// A GraphQL contract declaring query, variables and operation name.
#[must_use]
pub fn graphql_contract() -> Contract {
    Contract::new(
        "should find a person",
        Request::new("POST", UrlSpec::Url(Value::literal("/graphql")))
            .with_header("Content-Type", "application/json")
            .with_body(Body::json(json!({
                "query": GRAPHQL_QUERY,
                "variables": {"personName": "Old Enough"},
                "operationName": "queryName",
            }))),
        Response::new(200).with_body(Body::json(json!({
            "data": {"personToCheck": {"name": "Old Enough", "age": 40}}
        }))),
    )
    .with_metadata("verifier", json!({"tool": "graphql"}))
}

/// A request matching [`graphql_contract`] with the query reformatted.
#[must_use]
pub fn graphql_request() -> ObservedRequest {
    let query = "query queryName($personName: String!) {\n  personToCheck(name: $personName) {\n    name\n    age\n  }\n}\n";
    ObservedRequest::new("POST", "/graphql")
        .with_header("Content-Type", "application/json")
        .with_body(
            json!({
                "query": query,
                "variables": {"personName": "Old Enough"},
                "operationName": "queryName",
            })
            .to_string(),
        )
}

/// An XML contract whose checks are all explicit rules.
#[must_use]
pub fn xml_contract() -> Contract {
    Contract::new(
        "should return xml",
        Request::new("GET", UrlSpec::UrlPath(Value::literal("/test"))),
        Response::new(200)
            .with_header("Content-Type", "application/xml")
            .with_body(Body::xml(
                "<test><duck type='xtype'>123</duck><alpha>abc</alpha><number>7</number></test>",
            ))
            .with_matchers(ResponseMatchers {
                body: vec![
                    MatchingRule::by_regex("/test/duck/text()", "[0-9]{3}"),
                    MatchingRule::by_equality("/test/duck/@type"),
                    MatchingRule::by_regex("/test/alpha/text()", "[a-z]+"),
                    MatchingRule::by_type("/test/number", TypeKind::Number),
                ],
                ..ResponseMatchers::default()
            }),
    )
}

/// A response matching [`xml_contract`].
#[must_use]
pub fn xml_response() -> ObservedResponse {
    ObservedResponse::new(200)
        .with_header("Content-Type", "application/xml")
        .with_body("<test><duck type='xtype'>456</duck><alpha>xyz</alpha><number>12</number></test>")
}
