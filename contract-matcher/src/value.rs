//! Value resolution model.
//!
//! A contract [`Value`] may diverge between what the consumer sends or
//! expects (the client side) and what the producer receives or returns (the
//! server side). [`resolve`] picks one side and reduces the value to a
//! [`ResolvedValue`]: a literal, absence, or a matcher to apply.

use crate::error::ModelError;
use crate::regex_gen;
use crate::strategy::{MatchingStrategy, PredefinedPattern, RegexFlavor, compile_pattern};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Size limit used when validating patterns during resolution.
const RESOLUTION_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Which party of the contract a value is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The consumer: sends requests, expects responses
    Client,
    /// The producer: receives requests, returns responses
    Server,
}

/// Which message a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Sent by the client, verified by the server
    Request,
    /// Sent by the server, verified by the client
    Response,
}

impl Part {
    /// The side that builds this message from concrete example values; the
    /// other side verifies it with the matchers.
    #[must_use]
    pub const fn example_side(self) -> Side {
        match self {
            Self::Request => Side::Server,
            Self::Response => Side::Client,
        }
    }
}

/// A logical property of a request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// No value; resolves to the reserved absence literal
    Absent,
    /// The same literal on both sides
    Literal(JsonValue),
    /// A matching strategy standing in for a literal
    Strategy(MatchingStrategy),
    /// The wrapped value may be missing altogether
    Optional(Box<Value>),
    /// Distinct client and server representations
    Dual {
        /// Consumer-side representation
        client: Box<Value>,
        /// Producer-side representation
        server: Box<Value>,
    },
}

impl Value {
    /// Create a literal value.
    #[must_use]
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::Literal(value.into())
    }

    /// Create a regex-valued property.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Strategy(MatchingStrategy::regex(pattern))
    }

    /// Create a command-valued property.
    #[must_use]
    pub fn command(expression: impl Into<String>) -> Self {
        Self::Strategy(MatchingStrategy::command(expression))
    }

    /// Create a property validated by a type grammar.
    #[must_use]
    pub const fn of_type(kind: crate::strategy::TypeKind) -> Self {
        Self::Strategy(MatchingStrategy::Type(kind))
    }

    /// Create a property matched by a predefined pattern.
    #[must_use]
    pub fn predefined(name: impl Into<String>) -> Self {
        Self::Strategy(MatchingStrategy::predefined(name))
    }

    /// Create a value with distinct client and server representations.
    #[must_use]
    pub fn dual(client: Self, server: Self) -> Self {
        Self::Dual {
            client: Box::new(client),
            server: Box::new(server),
        }
    }

    /// Mark a value as optional.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Whether resolution can never depend on the side.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Absent)
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Absent,
            other => Self::Literal(other),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Literal(JsonValue::from(value))
    }
}

/// What a value reduces to on one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Reserved absence literal
    Absent,
    /// Concrete value
    Literal(JsonValue),
    /// Observed data must satisfy this strategy
    Matcher(MatchingStrategy),
}

/// A resolved value plus its optionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    /// The resolved form
    pub resolved: Resolved,
    /// Absence must be tolerated
    pub optional: bool,
}

impl ResolvedValue {
    /// Wrap a resolved form as a required value.
    #[must_use]
    pub const fn required(resolved: Resolved) -> Self {
        Self {
            resolved,
            optional: false,
        }
    }

    /// The literal, if this resolved to one.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&JsonValue> {
        match &self.resolved {
            Resolved::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Textual rendering for pattern and parameter contexts.
    ///
    /// Absence renders as `null`; optional values as `(x)?` with literal text
    /// escaped.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_matcher::{Side, Value, resolve};
    ///
    /// let value = Value::optional(Value::literal("a.b"));
    /// let resolved = resolve(&value, Side::Server).unwrap();
    /// assert_eq!(resolved.render(), r"(a\.b)?");
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let text = match &self.resolved {
            Resolved::Absent => "null".to_string(),
            Resolved::Literal(JsonValue::String(s)) => s.clone(),
            Resolved::Literal(other) => other.to_string(),
            Resolved::Matcher(strategy) => render_matcher(strategy),
        };
        if !self.optional {
            return text;
        }
        match &self.resolved {
            Resolved::Matcher(_) => format!("({text})?"),
            _ => format!("({})?", regex::escape(&text)),
        }
    }
}

fn render_matcher(strategy: &MatchingStrategy) -> String {
    match strategy {
        MatchingStrategy::Regex { pattern, flavor } => flavor.prepare(pattern).into_owned(),
        MatchingStrategy::Type(kind) => kind.grammar().to_string(),
        MatchingStrategy::Command(expression) => expression.clone(),
        MatchingStrategy::Null => "null".to_string(),
        MatchingStrategy::Predefined(name) => name
            .parse::<PredefinedPattern>()
            .map_or_else(|_| name.clone(), |p| p.pattern().to_string()),
        MatchingStrategy::Equality => String::new(),
    }
}

/// Resolve a value for one side of the contract.
///
/// A strategy wrapped directly in a value resolves to a generated example on
/// the client side and to the matcher itself on the server side, as for a
/// response. A strategy placed in an explicit [`Value::Dual`] branch resolves
/// to the matcher on that branch's side.
///
/// # Errors
///
/// Returns a [`ModelError`] when the value can not be reduced: an equality
/// strategy used as a value, an invalid pattern, or an unknown predefined
/// pattern name.
pub fn resolve(value: &Value, side: Side) -> Result<ResolvedValue, ModelError> {
    resolve_part(value, side, Part::Response)
}

/// Resolve a value belonging to a given message.
///
/// Bare strategies resolve to an example on [`Part::example_side`] and to
/// the matcher on the other side.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_part(value: &Value, side: Side, part: Part) -> Result<ResolvedValue, ModelError> {
    resolve_inner(value, side, part.example_side(), false)
}

fn resolve_inner(
    value: &Value,
    side: Side,
    example_side: Side,
    pinned: bool,
) -> Result<ResolvedValue, ModelError> {
    match value {
        Value::Absent | Value::Literal(JsonValue::Null) => {
            Ok(ResolvedValue::required(Resolved::Absent))
        }
        Value::Literal(literal) => Ok(ResolvedValue::required(Resolved::Literal(literal.clone()))),
        Value::Strategy(strategy) => {
            let wants_example = side == example_side && !pinned;
            resolve_strategy(strategy, wants_example).map(ResolvedValue::required)
        }
        Value::Optional(inner) => {
            let mut resolved = resolve_inner(inner, side, example_side, pinned)?;
            resolved.optional = true;
            Ok(resolved)
        }
        Value::Dual { client, server } => match side {
            Side::Client => resolve_inner(client, side, example_side, true),
            Side::Server => resolve_inner(server, side, example_side, true),
        },
    }
}

fn resolve_strategy(strategy: &MatchingStrategy, wants_example: bool) -> Result<Resolved, ModelError> {
    match strategy {
        MatchingStrategy::Equality => Err(ModelError::unresolvable(
            "equality is a rule, it has no value of its own",
        )),
        MatchingStrategy::Null => Ok(Resolved::Absent),
        MatchingStrategy::Command(_) => Ok(Resolved::Matcher(strategy.clone())),
        MatchingStrategy::Regex { pattern, flavor } => {
            compile_pattern(pattern, *flavor, RESOLUTION_REGEX_SIZE_LIMIT)?;
            if wants_example {
                let example = regex_gen::example(&flavor.prepare(pattern))?;
                Ok(Resolved::Literal(JsonValue::String(example)))
            } else {
                Ok(Resolved::Matcher(strategy.clone()))
            }
        }
        MatchingStrategy::Predefined(name) => {
            let predefined: PredefinedPattern = name.parse()?;
            let regex = MatchingStrategy::regex_with(predefined.pattern(), RegexFlavor::Default);
            resolve_strategy(&regex, wants_example)
        }
        MatchingStrategy::Type(kind) => {
            if wants_example {
                Ok(Resolved::Literal(kind.example()))
            } else {
                Ok(Resolved::Matcher(strategy.clone()))
            }
        }
    }
}

/// Render a query parameter the way the producer's generated test sends it:
/// server side of the request, textual.
///
/// # Errors
///
/// Propagates resolution errors.
pub fn resolve_param_value(value: &Value) -> Result<String, ModelError> {
    resolve_part(value, Side::Server, Part::Request).map(|resolved| resolved.render())
}
