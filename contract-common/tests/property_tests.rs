//! Property-based tests for contract-common.
//!
//! Tests validate:
//! - Property 1: Lists Survive Formatting Noise
//! - Property 2: Unset Variables Yield Defaults
//! - Property 3: Unparseable Values Are Config Errors

use contract_common::{ToolkitError, parse_env, parse_env_list};
use proptest::prelude::*;

fn lookup_one(name: &'static str, value: String) -> impl Fn(&str) -> Option<String> {
    move |key| (key == name).then(|| value.clone())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Lists Survive Formatting Noise**
    /// *For any* list of entries, joining them with commas, padding and
    /// blank entries SHALL parse back to the same entries in order.
    #[test]
    fn prop_env_list_round_trip(
        items in prop::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6),
        pad in "[ \t]{0,3}",
    ) {
        let raw = items
            .iter()
            .map(|item| format!("{pad}{item}{pad}"))
            .collect::<Vec<_>>()
            .join(",,");
        let lookup = lookup_one("TOOLS", format!("{raw},"));

        prop_assert_eq!(parse_env_list(&lookup, "TOOLS", &[]).unwrap(), items);
    }

    /// **Property 2: Unset Variables Yield Defaults**
    #[test]
    fn prop_unset_variable_yields_default(default in any::<u32>(), name in "[A-Z_]{1,16}") {
        let lookup = |_: &str| None;
        prop_assert_eq!(parse_env(&lookup, &name, default).unwrap(), default);
        prop_assert_eq!(
            parse_env_list(&lookup, &name, &["a", "b"]).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    /// **Property 3: Unparseable Values Are Config Errors**
    /// *For any* non-numeric value, parsing a numeric variable SHALL fail
    /// with a config error naming the variable.
    #[test]
    fn prop_unparseable_value_is_config_error(value in "[a-z]{1,10}") {
        let lookup = lookup_one("LIMIT", value);
        let err = parse_env(&lookup, "LIMIT", 0usize).unwrap_err();

        prop_assert!(err.is_config_error());
        prop_assert!(matches!(err, ToolkitError::InvalidConfig { .. }), "expected InvalidConfig, got {:?}", err);
        prop_assert!(err.to_string().contains("LIMIT"));
    }

    /// **Property 4: Numbers Parse Regardless of Surrounding Whitespace**
    #[test]
    fn prop_padded_number_parses(n in any::<u64>(), pad in "[ \t]{0,3}") {
        let lookup = lookup_one("LIMIT", format!("{pad}{n}{pad}"));
        prop_assert_eq!(parse_env(&lookup, "LIMIT", 0u64).unwrap(), n);
    }
}

#[test]
fn test_blank_list_is_rejected() {
    let lookup = lookup_one("TOOLS", " , ,".to_string());
    let err = parse_env_list(&lookup, "TOOLS", &["x"]).unwrap_err();
    assert!(err.is_config_error());
}
