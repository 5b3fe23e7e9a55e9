//! Matching rules: a path bound to a strategy, grouped per scope.

use crate::strategy::{MatchingStrategy, TypeKind};
use crate::value::Part;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Part of the exchange a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Request body
    RequestBody,
    /// Response body
    ResponseBody,
    /// Request headers
    RequestHeaders,
    /// Response headers
    ResponseHeaders,
    /// Request cookies
    RequestCookies,
    /// Response cookies
    ResponseCookies,
    /// URL query parameters
    QueryParameters,
}

impl RuleScope {
    /// Whether the scope addresses a body rather than named entries.
    #[must_use]
    pub const fn is_body(self) -> bool {
        matches!(self, Self::RequestBody | Self::ResponseBody)
    }

    /// Message the scope belongs to.
    #[must_use]
    pub const fn part(self) -> Part {
        match self {
            Self::RequestBody | Self::RequestHeaders | Self::RequestCookies | Self::QueryParameters => {
                Part::Request
            }
            Self::ResponseBody | Self::ResponseHeaders | Self::ResponseCookies => Part::Response,
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequestBody => "request body",
            Self::ResponseBody => "response body",
            Self::RequestHeaders => "request headers",
            Self::ResponseHeaders => "response headers",
            Self::RequestCookies => "request cookies",
            Self::ResponseCookies => "response cookies",
            Self::QueryParameters => "query parameters",
        };
        f.write_str(name)
    }
}

/// A path bound to a matching strategy.
///
/// Body rules carry a JSON path (`$.a[0].b`) or an XML path
/// (`/a/b/text()`); keyed scopes carry the entry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    /// Path or entry name
    pub path: String,
    /// How the addressed value is compared
    pub strategy: MatchingStrategy,
}

impl MatchingRule {
    /// Create a rule.
    #[must_use]
    pub fn new(path: impl Into<String>, strategy: MatchingStrategy) -> Self {
        Self {
            path: path.into(),
            strategy,
        }
    }

    /// `by_regex` rule.
    #[must_use]
    pub fn by_regex(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(path, MatchingStrategy::regex(pattern))
    }

    /// `by_equality` rule.
    #[must_use]
    pub fn by_equality(path: impl Into<String>) -> Self {
        Self::new(path, MatchingStrategy::Equality)
    }

    /// `by_type` rule.
    #[must_use]
    pub fn by_type(path: impl Into<String>, kind: TypeKind) -> Self {
        Self::new(path, MatchingStrategy::Type(kind))
    }

    /// `by_null` rule.
    #[must_use]
    pub fn by_null(path: impl Into<String>) -> Self {
        Self::new(path, MatchingStrategy::Null)
    }

    /// `by_command` rule.
    #[must_use]
    pub fn by_command(path: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(path, MatchingStrategy::command(expression))
    }
}

/// Rules attached to a request, one ordered list per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMatchers {
    /// Body rules
    #[serde(default)]
    pub body: Vec<MatchingRule>,
    /// Header rules, keyed by header name
    #[serde(default)]
    pub headers: Vec<MatchingRule>,
    /// Cookie rules, keyed by cookie name
    #[serde(default)]
    pub cookies: Vec<MatchingRule>,
    /// Query parameter rules, keyed by parameter name
    #[serde(default)]
    pub query_parameters: Vec<MatchingRule>,
}

/// Rules attached to a response, one ordered list per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMatchers {
    /// Body rules
    #[serde(default)]
    pub body: Vec<MatchingRule>,
    /// Header rules
    #[serde(default)]
    pub headers: Vec<MatchingRule>,
    /// Cookie rules
    #[serde(default)]
    pub cookies: Vec<MatchingRule>,
}
