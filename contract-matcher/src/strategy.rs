//! Matching strategies: how a single scalar is compared.

use crate::error::{MatchError, ModelError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Comparison policy applied to a single scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Deep equality with the contract value at the same path
    Equality,
    /// Full match of the stringified value against a pattern
    Regex {
        /// Pattern text
        pattern: String,
        /// How the pattern is written and how values are stringified
        #[serde(default)]
        flavor: RegexFlavor,
    },
    /// Lexical validation against a type grammar
    Type(TypeKind),
    /// Path must be absent or explicitly null
    Null,
    /// Deferred to an externally registered verification command
    Command(String),
    /// A library-supplied pattern, by name
    Predefined(String),
}

impl MatchingStrategy {
    /// Create a default-flavor regex strategy.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            flavor: RegexFlavor::Default,
        }
    }

    /// Create a regex strategy with an explicit flavor.
    #[must_use]
    pub fn regex_with(pattern: impl Into<String>, flavor: RegexFlavor) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            flavor,
        }
    }

    /// Create a command strategy, e.g. `executeMe($it)`.
    #[must_use]
    pub fn command(expression: impl Into<String>) -> Self {
        Self::Command(expression.into())
    }

    /// Create a predefined-pattern strategy.
    #[must_use]
    pub fn predefined(name: impl Into<String>) -> Self {
        Self::Predefined(name.into())
    }

    /// Short description used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Equality => "by_equality".to_string(),
            Self::Regex { pattern, .. } => format!("by_regex({pattern})"),
            Self::Type(kind) => format!("by_type({kind})"),
            Self::Null => "by_null".to_string(),
            Self::Command(expression) => format!("by_command({expression})"),
            Self::Predefined(name) => format!("predefined({name})"),
        }
    }

    /// Replace a predefined strategy by the regex it stands for.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownPredefined`] for names outside the table.
    pub fn normalized(&self) -> Result<Cow<'_, Self>, ModelError> {
        match self {
            Self::Predefined(name) => {
                let predefined: PredefinedPattern = name.parse()?;
                Ok(Cow::Owned(Self::regex(predefined.pattern())))
            }
            other => Ok(Cow::Borrowed(other)),
        }
    }
}

/// How a regex is written and how the observed value is stringified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexFlavor {
    /// Scalars only; strings verbatim, numbers and booleans in JSON form
    #[default]
    Default,
    /// Any value, containers stringified as compact JSON
    AsString,
    /// Pattern escaped for a JSON-path filter (`\/` stands for `/`)
    JsonPath,
}

impl RegexFlavor {
    /// The pattern as it should be handed to the regex compiler.
    #[must_use]
    pub fn prepare(self, pattern: &str) -> Cow<'_, str> {
        match self {
            Self::JsonPath if pattern.contains("\\/") => Cow::Owned(pattern.replace("\\/", "/")),
            _ => Cow::Borrowed(pattern),
        }
    }

    /// Stringify an observed value for matching.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IncompatibleType`] when a scalar-only flavor
    /// meets an object or array.
    pub fn stringify(self, value: &JsonValue) -> Result<String, ModelError> {
        match (self, value) {
            (_, JsonValue::String(s)) => Ok(s.clone()),
            (Self::AsString, other) => Ok(other.to_string()),
            (_, JsonValue::Array(_) | JsonValue::Object(_)) => Err(ModelError::incompatible(
                "by_regex",
                describe_json(value),
            )),
            (_, scalar) => Ok(scalar.to_string()),
        }
    }
}

/// Compile a pattern anchored on both ends.
///
/// # Errors
///
/// Returns [`ModelError::InvalidPattern`] if the pattern does not compile or
/// exceeds `size_limit`.
pub fn compile_pattern(
    pattern: &str,
    flavor: RegexFlavor,
    size_limit: usize,
) -> Result<Regex, ModelError> {
    let prepared = flavor.prepare(pattern);
    RegexBuilder::new(&format!("^(?:{prepared})$"))
        .size_limit(size_limit)
        .build()
        .map_err(|e| ModelError::invalid_pattern(pattern, e.to_string()))
}

/// Type grammars understood by [`MatchingStrategy::Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// ISO date, `yyyy-MM-dd`
    Date,
    /// ISO time, `HH:mm:ss` with optional fraction
    Time,
    /// ISO timestamp, `yyyy-MM-ddTHH:mm:ss` with optional fraction and offset
    DateTime,
    /// JSON number or numeric string
    Number,
    /// Boolean literal
    Boolean,
    /// String of length > 0
    NonEmptyString,
}

const DATE_GRAMMAR: &str = r"([0-9]{4})-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])";
const TIME_GRAMMAR: &str = r"(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])(\.[0-9]+)?";
const DATE_TIME_GRAMMAR: &str = r"([0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])T(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])(\.[0-9]+)?(Z|[+-][01][0-9]:[0-5][0-9])?";
const NUMBER_GRAMMAR: &str = r"-?([0-9]*\.[0-9]+|[0-9]+)";
const BOOLEAN_GRAMMAR: &str = "(true|false)";
const NON_EMPTY_GRAMMAR: &str = r"[\S\s]+";

fn anchored(grammar: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{grammar})$")).ok()
}

static DATE_RE: Lazy<Option<Regex>> = Lazy::new(|| anchored(DATE_GRAMMAR));
static TIME_RE: Lazy<Option<Regex>> = Lazy::new(|| anchored(TIME_GRAMMAR));
static DATE_TIME_RE: Lazy<Option<Regex>> = Lazy::new(|| anchored(DATE_TIME_GRAMMAR));
static NUMBER_RE: Lazy<Option<Regex>> = Lazy::new(|| anchored(NUMBER_GRAMMAR));

impl TypeKind {
    /// Regex describing the lexical form of this kind.
    #[must_use]
    pub const fn grammar(self) -> &'static str {
        match self {
            Self::Date => DATE_GRAMMAR,
            Self::Time => TIME_GRAMMAR,
            Self::DateTime => DATE_TIME_GRAMMAR,
            Self::Number => NUMBER_GRAMMAR,
            Self::Boolean => BOOLEAN_GRAMMAR,
            Self::NonEmptyString => NON_EMPTY_GRAMMAR,
        }
    }

    /// Fixed example value handed to the side that needs a concrete value.
    #[must_use]
    pub fn example(self) -> JsonValue {
        match self {
            Self::Date => JsonValue::from("2024-01-01"),
            Self::Time => JsonValue::from("12:00:00"),
            Self::DateTime => JsonValue::from("2024-01-01T12:00:00"),
            Self::Number => JsonValue::from(42),
            Self::Boolean => JsonValue::from(true),
            Self::NonEmptyString => JsonValue::from("example"),
        }
    }

    /// Validate the lexical form of an observed value.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Grammar`] when the value is not of this kind.
    pub fn validate(self, value: &JsonValue) -> Result<(), MatchError> {
        let valid = match (self, value) {
            (Self::Number, JsonValue::Number(_)) | (Self::Boolean, JsonValue::Bool(_)) => true,
            (Self::NonEmptyString, JsonValue::String(s)) => !s.is_empty(),
            (Self::Boolean, JsonValue::String(s)) => s == "true" || s == "false",
            (Self::Number, JsonValue::String(s)) => grammar_matches(&NUMBER_RE, s),
            (Self::Date, JsonValue::String(s)) => {
                grammar_matches(&DATE_RE, s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }
            (Self::Time, JsonValue::String(s)) => {
                grammar_matches(&TIME_RE, s) && NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
            }
            (Self::DateTime, JsonValue::String(s)) => {
                grammar_matches(&DATE_TIME_RE, s) && is_calendar_timestamp(s)
            }
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(MatchError::grammar(self, textual(value)))
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date-time",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::NonEmptyString => "non-empty string",
        };
        f.write_str(name)
    }
}

fn grammar_matches(re: &Lazy<Option<Regex>>, value: &str) -> bool {
    (**re).as_ref().is_some_and(|re| re.is_match(value))
}

fn is_calendar_timestamp(value: &str) -> bool {
    let has_offset = value.ends_with('Z')
        || value
            .get(value.len().saturating_sub(6)..)
            .is_some_and(|tail| tail.contains(['+', '-']));
    if has_offset {
        DateTime::parse_from_rfc3339(value).is_ok()
    } else {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
    }
}

/// Library-supplied patterns addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedPattern {
    /// Unicode letters only
    OnlyAlphaUnicode,
    /// ASCII letters and digits
    AlphaNumeric,
    /// Integer or decimal number
    Number,
    /// Signed integer
    Integer,
    /// Positive integer without leading zeros
    PositiveInt,
    /// Decimal number with a fractional part
    Double,
    /// Hexadecimal digits
    Hex,
    /// `true` or `false`
    Boolean,
    /// Dotted IPv4 address
    IpAddress,
    /// Scheme plus host name
    Hostname,
    /// E-mail address
    Email,
    /// HTTP, HTTPS or FTP URL
    Url,
    /// HTTPS URL
    HttpsUrl,
    /// Lowercase UUID
    Uuid,
    /// Lowercase version 4 UUID
    Uuid4,
    /// ISO date
    IsoDate,
    /// ISO date time without offset
    IsoDateTime,
    /// ISO time
    IsoTime,
    /// ISO 8601 timestamp with offset
    Iso8601WithOffset,
    /// At least one character
    NonEmpty,
    /// At least one non-whitespace character
    NonBlank,
    /// US phone number
    UsPhoneNumber,
}

impl PredefinedPattern {
    /// Every entry of the table.
    pub const ALL: [Self; 22] = [
        Self::OnlyAlphaUnicode,
        Self::AlphaNumeric,
        Self::Number,
        Self::Integer,
        Self::PositiveInt,
        Self::Double,
        Self::Hex,
        Self::Boolean,
        Self::IpAddress,
        Self::Hostname,
        Self::Email,
        Self::Url,
        Self::HttpsUrl,
        Self::Uuid,
        Self::Uuid4,
        Self::IsoDate,
        Self::IsoDateTime,
        Self::IsoTime,
        Self::Iso8601WithOffset,
        Self::NonEmpty,
        Self::NonBlank,
        Self::UsPhoneNumber,
    ];

    /// The regex this entry expands to.
    #[must_use]
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::OnlyAlphaUnicode => r"[\p{L}]*",
            Self::AlphaNumeric => "[a-zA-Z0-9]+",
            Self::Number => NUMBER_GRAMMAR,
            Self::Integer => r"-?([0-9]+)",
            Self::PositiveInt => r"([1-9][0-9]*)",
            Self::Double => r"-?([0-9]*\.[0-9]+)",
            Self::Hex => "[a-fA-F0-9]+",
            Self::Boolean => BOOLEAN_GRAMMAR,
            Self::IpAddress => {
                r"([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5])\.([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5])\.([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5])\.([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5])"
            }
            Self::Hostname => r"((http[s]?|ftp):/)/?([^:/\s]+)(:[0-9]{1,5})?",
            Self::Email => r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}",
            Self::Url => r"(https?|ftp)://[a-zA-Z0-9.-]+(:[0-9]{1,5})?(/[a-zA-Z0-9._~%-]*)*",
            Self::HttpsUrl => r"https://[a-zA-Z0-9.-]+(:[0-9]{1,5})?(/[a-zA-Z0-9._~%-]*)*",
            Self::Uuid => "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}",
            Self::Uuid4 => "[a-f0-9]{8}-[a-f0-9]{4}-4[a-f0-9]{3}-[89ab][a-f0-9]{3}-[a-f0-9]{12}",
            Self::IsoDate => DATE_GRAMMAR,
            Self::IsoDateTime => {
                "([0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])T(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])"
            }
            Self::IsoTime => "(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])",
            Self::Iso8601WithOffset => {
                r"([0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])T(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])(\.[0-9]+)?(Z|[+-][01][0-9]:[0-5][0-9])"
            }
            Self::NonEmpty => NON_EMPTY_GRAMMAR,
            Self::NonBlank => r"\s*\S[\S\s]*",
            Self::UsPhoneNumber => r"\(?([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})",
        }
    }
}

impl FromStr for PredefinedPattern {
    type Err = ModelError;

    /// Accepts snake, kebab and camel case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let pattern = match key.as_str() {
            "onlyalphaunicode" => Self::OnlyAlphaUnicode,
            "alphanumeric" => Self::AlphaNumeric,
            "number" | "anynumber" => Self::Number,
            "integer" | "aninteger" => Self::Integer,
            "positiveint" => Self::PositiveInt,
            "double" | "adouble" => Self::Double,
            "hex" => Self::Hex,
            "boolean" | "anyboolean" | "trueorfalse" => Self::Boolean,
            "ipaddress" => Self::IpAddress,
            "hostname" => Self::Hostname,
            "email" => Self::Email,
            "url" => Self::Url,
            "httpsurl" => Self::HttpsUrl,
            "uuid" => Self::Uuid,
            "uuid4" => Self::Uuid4,
            "isodate" | "date" => Self::IsoDate,
            "isodatetime" | "datetime" => Self::IsoDateTime,
            "isotime" | "time" => Self::IsoTime,
            "iso8601withoffset" => Self::Iso8601WithOffset,
            "nonempty" => Self::NonEmpty,
            "nonblank" => Self::NonBlank,
            "usphonenumber" | "phonenumber" => Self::UsPhoneNumber,
            _ => return Err(ModelError::UnknownPredefined(s.to_string())),
        };
        Ok(pattern)
    }
}

/// Render a JSON value for diagnostics: strings verbatim, others as JSON.
pub(crate) fn textual(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Name the JSON type of a value.
pub(crate) const fn describe_json(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
