//! Matcher configuration with environment variable support.

use contract_common::{ToolkitError, load_dotenv, parse_env, parse_env_list};

/// Regex compilation size limit variable.
pub const ENV_REGEX_SIZE_LIMIT: &str = "CONTRACT_MATCHER_REGEX_SIZE_LIMIT";
/// Diagnostic cap variable.
pub const ENV_MAX_REPORTED_FAILURES: &str = "CONTRACT_MATCHER_MAX_REPORTED_FAILURES";
/// XML text trimming variable.
pub const ENV_TRIM_XML_TEXT: &str = "CONTRACT_MATCHER_TRIM_XML_TEXT";
/// GraphQL tool discriminators variable.
pub const ENV_GRAPHQL_TOOLS: &str = "CONTRACT_MATCHER_GRAPHQL_TOOLS";

const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;
const DEFAULT_MAX_REPORTED_FAILURES: usize = 64;
const DEFAULT_GRAPHQL_TOOLS: &[&str] = &["graphql"];

/// Tunables shared by every matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Compiled size limit for rule patterns, in bytes
    pub regex_size_limit: usize,
    /// Failures recorded in a verdict before further ones are only counted
    pub max_reported_failures: usize,
    /// Trim whitespace around extracted XML text
    pub trim_xml_text: bool,
    /// Tool discriminators routed to the GraphQL layer, lowercase
    pub graphql_tools: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
            max_reported_failures: DEFAULT_MAX_REPORTED_FAILURES,
            trim_xml_text: true,
            graphql_tools: DEFAULT_GRAPHQL_TOOLS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl MatcherConfig {
    /// Load configuration from the process environment, after reading a
    /// `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns [`ToolkitError::InvalidConfig`] if a variable is set to an
    /// unusable value.
    pub fn from_env() -> Result<Self, ToolkitError> {
        load_dotenv();
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ToolkitError::InvalidConfig`] if a variable is set to an
    /// unusable value.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ToolkitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            regex_size_limit: parse_env(lookup, ENV_REGEX_SIZE_LIMIT, DEFAULT_REGEX_SIZE_LIMIT)?,
            max_reported_failures: parse_env(
                lookup,
                ENV_MAX_REPORTED_FAILURES,
                DEFAULT_MAX_REPORTED_FAILURES,
            )?,
            trim_xml_text: parse_env(lookup, ENV_TRIM_XML_TEXT, true)?,
            graphql_tools: parse_env_list(lookup, ENV_GRAPHQL_TOOLS, DEFAULT_GRAPHQL_TOOLS)?
                .into_iter()
                .map(|tool| tool.to_lowercase())
                .collect(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ToolkitError::InvalidConfig`] naming the offending variable.
    pub fn validate(&self) -> Result<(), ToolkitError> {
        if self.regex_size_limit == 0 {
            return Err(ToolkitError::invalid_config(
                ENV_REGEX_SIZE_LIMIT,
                "must be greater than 0",
            ));
        }
        if self.max_reported_failures == 0 {
            return Err(ToolkitError::invalid_config(
                ENV_MAX_REPORTED_FAILURES,
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Set the regex size limit.
    #[must_use]
    pub const fn with_regex_size_limit(mut self, limit: usize) -> Self {
        self.regex_size_limit = limit;
        self
    }

    /// Set the diagnostic cap.
    #[must_use]
    pub const fn with_max_reported_failures(mut self, max: usize) -> Self {
        self.max_reported_failures = max;
        self
    }

    /// Enable or disable XML text trimming.
    #[must_use]
    pub const fn with_trim_xml_text(mut self, trim: bool) -> Self {
        self.trim_xml_text = trim;
        self
    }

    /// Replace the GraphQL tool discriminators.
    #[must_use]
    pub fn with_graphql_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.graphql_tools = tools.into_iter().map(|t| t.as_ref().to_lowercase()).collect();
        self
    }

    /// Whether a tool discriminator selects the GraphQL layer.
    #[must_use]
    pub fn is_graphql_tool(&self, tool: &str) -> bool {
        let tool = tool.trim().to_lowercase();
        self.graphql_tools.iter().any(|t| *t == tool)
    }
}
