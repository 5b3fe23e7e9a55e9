//! Stub-facing matching of whole requests and responses.
//!
//! [`ContractMatcher`] is what a stub server or a producer-side verifier
//! talks to: it splits an observed exchange into its parts, runs the
//! engines for each part and folds the results into one verdict.

use crate::command::{CommandRegistry, DeferredCommands};
use crate::config::MatcherConfig;
use crate::contract::{Body, Contract, UrlSpec};
use crate::engine::json::match_json;
use crate::engine::keyed::match_keyed;
use crate::engine::xml::match_xml;
use crate::engine::{MatchContext, check_resolved};
use crate::envelope::EnvelopeMatcher;
use crate::error::MatchError;
use crate::graphql::GraphQlMatcher;
use crate::rule::{MatchingRule, RuleScope};
use crate::strategy::textual;
use crate::value::{Part, Resolved, Side, Value, resolve_part};
use crate::verdict::{FieldFailure, MatchVerdict};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;
use url::form_urlencoded;

/// Base used to resolve relative request targets.
const BASE_URL: &str = "http://localhost";

/// A request as received by a stub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedRequest {
    /// HTTP method
    pub method: String,
    /// URL path, without query string
    pub path: String,
    /// Decoded query parameters, in order
    pub query: Vec<(String, String)>,
    /// Headers, in order
    pub headers: Vec<(String, String)>,
    /// Cookies, in order
    pub cookies: Vec<(String, String)>,
    /// Raw body
    pub body: Option<String>,
}

impl ObservedRequest {
    /// Create a request without query string.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a request from a request target such as `/items?page=2`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the target is not a valid URL or path.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_matcher::ObservedRequest;
    ///
    /// let request = ObservedRequest::from_url("GET", "/items?page=2&q=a%20b").unwrap();
    /// assert_eq!(request.path, "/items");
    /// assert_eq!(request.query[1], ("q".to_string(), "a b".to_string()));
    /// ```
    pub fn from_url(method: impl Into<String>, target: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(BASE_URL)?.join(target)?;
        Ok(Self {
            method: method.into(),
            path: url.path().to_string(),
            query: url.query_pairs().into_owned().collect(),
            ..Self::default()
        })
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Path followed by the encoded query string, if any.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{query}", self.path)
    }
}

/// A response as returned by a producer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedResponse {
    /// HTTP status code
    pub status: u16,
    /// Headers, in order
    pub headers: Vec<(String, String)>,
    /// Cookies, in order
    pub cookies: Vec<(String, String)>,
    /// Raw body
    pub body: Option<String>,
}

impl ObservedResponse {
    /// Create a response with a status code.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Matches observed exchanges against contracts.
///
/// Holds no per-call state; one instance can serve many threads.
pub struct ContractMatcher {
    config: MatcherConfig,
    commands: Arc<dyn CommandRegistry>,
    layers: Vec<Box<dyn EnvelopeMatcher>>,
}

impl Default for ContractMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

impl fmt::Debug for ContractMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers: Vec<&str> = self.layers.iter().map(|layer| layer.name()).collect();
        f.debug_struct("ContractMatcher")
            .field("config", &self.config)
            .field("layers", &layers)
            .finish_non_exhaustive()
    }
}

impl ContractMatcher {
    /// Create a matcher with deferred commands and the GraphQL layer.
    #[must_use]
    pub fn new(config: MatcherConfig) -> Self {
        let graphql = GraphQlMatcher::from_config(&config);
        Self {
            config,
            commands: Arc::new(DeferredCommands),
            layers: vec![Box::new(graphql)],
        }
    }

    /// Use a command registry for `by_command` rules.
    #[must_use]
    pub fn with_commands(mut self, commands: Arc<dyn CommandRegistry>) -> Self {
        self.commands = commands;
        self
    }

    /// Add an envelope layer. Layers are consulted in insertion order.
    #[must_use]
    pub fn with_layer(mut self, layer: Box<dyn EnvelopeMatcher>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn context(&self, scope: RuleScope) -> MatchContext<'_> {
        MatchContext::new(&self.config, scope).with_commands(self.commands.as_ref())
    }

    fn layer_for(&self, contract: &Contract) -> Option<&dyn EnvelopeMatcher> {
        let tool = contract.tool()?;
        self.layers
            .iter()
            .find(|layer| layer.is_applicable(tool))
            .map(|layer| &**layer)
    }

    /// Match a request sent by a consumer against the contract's client
    /// side.
    #[instrument(skip_all, fields(contract = %contract.name))]
    pub fn match_request(&self, contract: &Contract, observed: &ObservedRequest) -> MatchVerdict {
        let cap = self.config.max_reported_failures;
        let request = &contract.request;
        let mut verdict = MatchVerdict::exact();

        if let Err(err) = check_line(
            &request.method,
            &observed.method.to_uppercase(),
            Part::Request,
            Side::Client,
            true,
            &self.context(RuleScope::RequestBody),
        ) {
            verdict.push(FieldFailure::unscoped("method", err), cap);
        }

        let (label, url_value, target) = match &request.url {
            UrlSpec::Url(value) => ("url", value, observed.path_and_query()),
            UrlSpec::UrlPath(value) => ("urlPath", value, observed.path.clone()),
        };
        if let Err(err) = check_line(
            url_value,
            &target,
            Part::Request,
            Side::Client,
            false,
            &self.context(RuleScope::RequestBody),
        ) {
            verdict.push(FieldFailure::unscoped(label, err), cap);
        }

        verdict.merge(
            match_keyed(
                &observed.query,
                &request.query_parameters,
                contract.rules(RuleScope::QueryParameters),
                Side::Client,
                &self.context(RuleScope::QueryParameters),
            ),
            cap,
        );
        verdict.merge(
            match_keyed(
                &observed.cookies,
                &request.cookies,
                contract.rules(RuleScope::RequestCookies),
                Side::Client,
                &self.context(RuleScope::RequestCookies),
            ),
            cap,
        );

        if let Some(layer) = self.layer_for(contract) {
            debug!(layer = layer.name(), "Delegating request envelope");
            verdict.merge(
                layer.match_request(contract, observed, &self.context(RuleScope::RequestBody)),
                cap,
            );
            return verdict;
        }

        verdict.merge(
            match_keyed(
                &observed.headers,
                &request.headers,
                contract.rules(RuleScope::RequestHeaders),
                Side::Client,
                &self.context(RuleScope::RequestHeaders),
            ),
            cap,
        );
        verdict.merge(
            match_body(
                request.body.as_ref(),
                observed.body.as_deref(),
                contract.rules(RuleScope::RequestBody),
                Side::Client,
                &self.context(RuleScope::RequestBody),
            ),
            cap,
        );
        verdict
    }

    /// Match a response returned by a producer against the contract's server
    /// side.
    #[instrument(skip_all, fields(contract = %contract.name))]
    pub fn match_response(&self, contract: &Contract, observed: &ObservedResponse) -> MatchVerdict {
        let cap = self.config.max_reported_failures;
        let response = &contract.response;
        let mut verdict = MatchVerdict::exact();

        if observed.status != response.status {
            verdict.push(
                FieldFailure::unscoped(
                    "status",
                    MatchError::mismatch(response.status.to_string(), observed.status.to_string()),
                ),
                cap,
            );
        }
        verdict.merge(
            match_keyed(
                &observed.headers,
                &response.headers,
                contract.rules(RuleScope::ResponseHeaders),
                Side::Server,
                &self.context(RuleScope::ResponseHeaders),
            ),
            cap,
        );
        verdict.merge(
            match_keyed(
                &observed.cookies,
                &response.cookies,
                contract.rules(RuleScope::ResponseCookies),
                Side::Server,
                &self.context(RuleScope::ResponseCookies),
            ),
            cap,
        );
        verdict.merge(
            match_body(
                response.body.as_ref(),
                observed.body.as_deref(),
                contract.rules(RuleScope::ResponseBody),
                Side::Server,
                &self.context(RuleScope::ResponseBody),
            ),
            cap,
        );
        verdict
    }

    /// Pick the contract a stub should answer with.
    ///
    /// Ignored contracts are skipped; the rest are tried by ascending
    /// priority, contracts without a priority last, declaration order
    /// breaking ties.
    #[must_use]
    pub fn select<'c>(
        &self,
        contracts: &'c [Contract],
        observed: &ObservedRequest,
    ) -> Option<&'c Contract> {
        let mut candidates: Vec<&Contract> = contracts.iter().filter(|c| !c.ignored).collect();
        candidates.sort_by_key(|c| c.priority.unwrap_or(u32::MAX));
        candidates
            .into_iter()
            .find(|contract| self.match_request(contract, observed).is_exact_match())
    }
}

/// Method or URL: a single textual value.
fn check_line(
    value: &Value,
    observed: &str,
    part: Part,
    side: Side,
    uppercase: bool,
    ctx: &MatchContext<'_>,
) -> Result<(), MatchError> {
    let mut resolved = resolve_part(value, side, part)?;
    if let Resolved::Literal(literal) = &resolved.resolved {
        let text = textual(literal);
        let text = if uppercase { text.to_uppercase() } else { text };
        resolved.resolved = Resolved::Literal(JsonValue::String(text));
    }
    check_resolved(&resolved, Some(&JsonValue::from(observed)), observed, ctx)
}

fn match_body(
    body: Option<&Body>,
    observed: Option<&str>,
    rules: &[MatchingRule],
    side: Side,
    ctx: &MatchContext<'_>,
) -> MatchVerdict {
    match body {
        Some(Body::Json(node)) => match parse_json(observed) {
            Ok(document) => match_json(&document, Some(node), rules, side, ctx),
            Err(err) => malformed(err, ctx),
        },
        Some(Body::Xml(template)) => match observed {
            Some(text) => match_xml(text, Some(template.as_str()), rules, ctx),
            None => malformed(MatchError::malformed("body is empty"), ctx),
        },
        Some(Body::Text(value)) => {
            let mut verdict = MatchVerdict::exact();
            let found = observed.map(JsonValue::from);
            let outcome = resolve_part(value, side, ctx.scope.part())
                .map_err(MatchError::from)
                .and_then(|resolved| check_resolved(&resolved, found.as_ref(), "body", ctx));
            if let Err(err) = outcome {
                ctx.record(&mut verdict, "body", err);
            }
            verdict
        }
        None if rules.is_empty() => MatchVerdict::exact(),
        None if rules.iter().all(|rule| rule.path.starts_with('/')) => match observed {
            Some(text) => match_xml(text, None, rules, ctx),
            None => malformed(MatchError::malformed("body is empty"), ctx),
        },
        None => match parse_json(observed) {
            Ok(document) => match_json(&document, None, rules, side, ctx),
            Err(err) => malformed(err, ctx),
        },
    }
}

fn parse_json(observed: Option<&str>) -> Result<JsonValue, MatchError> {
    match observed {
        None => Ok(JsonValue::Null),
        Some(text) if text.trim().is_empty() => Ok(JsonValue::Null),
        Some(text) => serde_json::from_str(text).map_err(|e| MatchError::malformed(e.to_string())),
    }
}

fn malformed(err: MatchError, ctx: &MatchContext<'_>) -> MatchVerdict {
    let mut verdict = MatchVerdict::exact();
    ctx.record(&mut verdict, "$", err);
    verdict
}
