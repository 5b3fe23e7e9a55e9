//! Environment-variable parsing helpers.
//!
//! Every helper takes a lookup function so configuration can be loaded from
//! the process environment in production and from a plain map in tests.

use crate::ToolkitError;
use std::str::FromStr;

/// Load a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }
}

/// Parse a variable with a default value.
///
/// # Errors
///
/// Returns [`ToolkitError::InvalidConfig`] if the variable is set but does not
/// parse as `T`.
///
/// # Examples
///
/// ```
/// use contract_common::parse_env;
///
/// let lookup = |name: &str| (name == "LIMIT").then(|| "42".to_string());
/// assert_eq!(parse_env(&lookup, "LIMIT", 7usize).unwrap(), 42);
/// assert_eq!(parse_env(&lookup, "OTHER", 7usize).unwrap(), 7);
/// ```
pub fn parse_env<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ToolkitError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e: T::Err| ToolkitError::invalid_config(name, e.to_string())),
        None => Ok(default),
    }
}

/// Parse a comma separated list variable, dropping empty entries.
///
/// # Errors
///
/// Returns [`ToolkitError::InvalidConfig`] if the variable is set but holds
/// no entries.
pub fn parse_env_list<F>(
    lookup: &F,
    name: &str,
    default: &[&str],
) -> Result<Vec<String>, ToolkitError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default.iter().map(|s| (*s).to_string()).collect());
    };
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if items.is_empty() {
        return Err(ToolkitError::invalid_config(name, "list is empty"));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_env_default_when_missing() {
        let lookup = lookup_from(&[]);
        assert!(parse_env(&lookup, "FLAG", true).unwrap());
    }

    #[test]
    fn test_parse_env_invalid_value() {
        let lookup = lookup_from(&[("SIZE", "lots")]);
        let err = parse_env(&lookup, "SIZE", 1usize).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("SIZE"));
    }

    #[test]
    fn test_parse_env_trims_whitespace() {
        let lookup = lookup_from(&[("FLAG", " false ")]);
        assert!(!parse_env(&lookup, "FLAG", true).unwrap());
    }

    #[test]
    fn test_parse_env_list() {
        let lookup = lookup_from(&[("TOOLS", "graphql, gql ,,")]);
        assert_eq!(
            parse_env_list(&lookup, "TOOLS", &["x"]).unwrap(),
            vec!["graphql".to_string(), "gql".to_string()]
        );
        assert_eq!(
            parse_env_list(&lookup, "MISSING", &["graphql"]).unwrap(),
            vec!["graphql".to_string()]
        );
    }

    #[test]
    fn test_parse_env_list_empty_is_rejected() {
        let lookup = lookup_from(&[("TOOLS", " , ")]);
        assert!(parse_env_list(&lookup, "TOOLS", &["graphql"]).is_err());
    }
}
