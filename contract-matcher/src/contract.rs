//! Contract types.
//!
//! A contract is built once by an external parser and shared read-only by
//! every matcher and generator afterwards.

use crate::error::ModelError;
use contract_common::ToolkitError;
use crate::rule::{MatchingRule, RequestMatchers, ResponseMatchers, RuleScope};
use crate::value::{Part, Resolved, Side, Value, resolve_part};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// One request/response exchange plus its matching rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract name
    pub name: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stub selection priority, lower wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Skipped by generators and stub selection
    #[serde(default)]
    pub ignored: bool,
    /// Work in progress: stubs are served, tests are not generated
    #[serde(default)]
    pub in_progress: bool,
    /// Expected request
    pub request: Request,
    /// Expected response
    pub response: Response,
    /// Free-form metadata, e.g. `{"verifier": {"tool": "graphql"}}`
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl Contract {
    /// Create a contract.
    #[must_use]
    pub fn new(name: impl Into<String>, request: Request, response: Response) -> Self {
        Self {
            name: name.into(),
            description: None,
            priority: None,
            ignored: false,
            in_progress: false,
            request,
            response,
            metadata: Map::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark the contract as ignored.
    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Tool discriminator selecting a specialized matching layer.
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        self.metadata
            .get("verifier")
            .and_then(|verifier| verifier.get("tool"))
            .and_then(JsonValue::as_str)
    }

    /// Ordered rules declared for a scope.
    #[must_use]
    pub fn rules(&self, scope: RuleScope) -> &[MatchingRule] {
        match scope {
            RuleScope::RequestBody => &self.request.matchers.body,
            RuleScope::RequestHeaders => &self.request.matchers.headers,
            RuleScope::RequestCookies => &self.request.matchers.cookies,
            RuleScope::QueryParameters => &self.request.matchers.query_parameters,
            RuleScope::ResponseBody => &self.response.matchers.body,
            RuleScope::ResponseHeaders => &self.response.matchers.headers,
            RuleScope::ResponseCookies => &self.response.matchers.cookies,
        }
    }

    /// Load contracts from a JSON document holding one contract or an array.
    ///
    /// # Errors
    ///
    /// Returns [`ToolkitError::Serialization`] if the document does not
    /// describe contracts.
    pub fn load_all(json: &str) -> Result<Vec<Self>, ToolkitError> {
        let document: JsonValue = serde_json::from_str(json)?;
        let contracts = match document {
            JsonValue::Array(_) => serde_json::from_value(document)?,
            single => vec![serde_json::from_value(single)?],
        };
        Ok(contracts)
    }
}

/// Where the request is addressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlSpec {
    /// Path plus query string
    Url(Value),
    /// Path only; query parameters are declared separately
    UrlPath(Value),
}

/// A named header, cookie or query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    /// Entry name
    pub name: String,
    /// Entry value
    pub value: Value,
}

impl NamedValue {
    /// Create a named value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Expected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method
    pub method: Value,
    /// URL or URL path
    pub url: UrlSpec,
    /// Headers
    #[serde(default)]
    pub headers: Vec<NamedValue>,
    /// Cookies
    #[serde(default)]
    pub cookies: Vec<NamedValue>,
    /// Query parameters
    #[serde(default)]
    pub query_parameters: Vec<NamedValue>,
    /// Body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Matching rules
    #[serde(default)]
    pub matchers: RequestMatchers,
}

impl Request {
    /// Create a request for a method and URL.
    #[must_use]
    pub fn new(method: impl Into<Value>, url: UrlSpec) -> Self {
        Self {
            method: method.into(),
            url,
            headers: Vec::new(),
            cookies: Vec::new(),
            query_parameters: Vec::new(),
            body: None,
            matchers: RequestMatchers::default(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.push(NamedValue::new(name, value));
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cookies.push(NamedValue::new(name, value));
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_parameters.push(NamedValue::new(name, value));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the matching rules.
    #[must_use]
    pub fn with_matchers(mut self, matchers: RequestMatchers) -> Self {
        self.matchers = matchers;
        self
    }
}

/// Expected response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Headers
    #[serde(default)]
    pub headers: Vec<NamedValue>,
    /// Cookies
    #[serde(default)]
    pub cookies: Vec<NamedValue>,
    /// Body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Matching rules
    #[serde(default)]
    pub matchers: ResponseMatchers,
    /// Delay applied by stub servers before answering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_delay_milliseconds: Option<u64>,
}

impl Response {
    /// Create a response with a status code.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
            matchers: ResponseMatchers {
                body: Vec::new(),
                headers: Vec::new(),
                cookies: Vec::new(),
            },
            fixed_delay_milliseconds: None,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.push(NamedValue::new(name, value));
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cookies.push(NamedValue::new(name, value));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the matching rules.
    #[must_use]
    pub fn with_matchers(mut self, matchers: ResponseMatchers) -> Self {
        self.matchers = matchers;
        self
    }

    /// Set the stub delay.
    #[must_use]
    pub const fn with_fixed_delay(mut self, milliseconds: u64) -> Self {
        self.fixed_delay_milliseconds = Some(milliseconds);
        self
    }
}

/// Request or response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    /// Structured body compared path by path
    Json(BodyNode),
    /// XML template; only explicit rules are evaluated against it
    Xml(String),
    /// Raw text compared as a single value
    Text(Value),
}

impl Body {
    /// Structured body from a JSON document.
    #[must_use]
    pub fn json(value: JsonValue) -> Self {
        Self::Json(BodyNode::from(value))
    }

    /// XML template body.
    #[must_use]
    pub fn xml(template: impl Into<String>) -> Self {
        Self::Xml(template.into())
    }
}

/// A node of a structured contract body.
///
/// Leaves are [`Value`]s, so a body can embed patterns and client/server
/// divergence at any depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyNode {
    /// Mapping
    Object(BTreeMap<String, BodyNode>),
    /// Sequence
    Array(Vec<BodyNode>),
    /// Leaf
    Value(Value),
}

impl BodyNode {
    /// Leaf node.
    #[must_use]
    pub fn leaf(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Concrete JSON for one side of a message.
    ///
    /// Absent leaves become `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Unresolvable`] when a leaf resolves to a matcher
    /// on that side.
    pub fn to_json(&self, side: Side, part: Part) -> Result<JsonValue, ModelError> {
        match self {
            Self::Object(fields) => fields
                .iter()
                .map(|(key, node)| node.to_json(side, part).map(|v| (key.clone(), v)))
                .collect::<Result<Map<_, _>, _>>()
                .map(JsonValue::Object),
            Self::Array(items) => items
                .iter()
                .map(|node| node.to_json(side, part))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            Self::Value(value) => match resolve_part(value, side, part)?.resolved {
                Resolved::Absent => Ok(JsonValue::Null),
                Resolved::Literal(literal) => Ok(literal),
                Resolved::Matcher(strategy) => Err(ModelError::unresolvable(format!(
                    "{} has no concrete value",
                    strategy.describe()
                ))),
            },
        }
    }
}

impl From<JsonValue> for BodyNode {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(fields) => {
                Self::Object(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            scalar => Self::Value(Value::from(scalar)),
        }
    }
}
