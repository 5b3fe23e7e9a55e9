//! Shared proptest generators.
//!
//! Patterns stay within the subset the example generator covers in full:
//! classes, literals, bounded repetition and alternation.

use proptest::prelude::*;
use serde_json::{Map, Value as JsonValue};

/// Generate regex patterns built from common contract building blocks.
pub fn pattern_strategy() -> impl Strategy<Value = String> {
    let atom = prop_oneof![
        Just("[a-z]".to_string()),
        Just("[A-Z]".to_string()),
        Just("[0-9]".to_string()),
        Just(r"\d".to_string()),
        Just(r"\w".to_string()),
        Just("[a-f0-9]".to_string()),
        "[a-z]{1,4}",
        Just(r"\.".to_string()),
        Just("-".to_string()),
    ];
    let quantifier = prop_oneof![
        Just(String::new()),
        Just("+".to_string()),
        Just("*".to_string()),
        Just("?".to_string()),
        (1u8..5).prop_map(|n| format!("{{{n}}}")),
        (0u8..3, 3u8..6).prop_map(|(lo, hi)| format!("{{{lo},{hi}}}")),
    ];
    let piece = (atom, quantifier).prop_map(|(atom, quantifier)| format!("{atom}{quantifier}"));
    prop::collection::vec(piece, 1..5).prop_flat_map(|pieces| {
        let joined = pieces.concat();
        prop_oneof![
            Just(joined.clone()),
            Just(format!("({joined})")),
            "[a-z]{1,5}".prop_map(move |alt| format!("({joined}|{alt})")),
        ]
    })
}

/// Generate object keys, including keys that need bracket notation.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z][a-zA-Z0-9_]{0,8}",
        1 => "[a-z]{1,4} [a-z]{1,4}",
    ]
}

/// Generate JSON scalars.
pub fn json_scalar_strategy() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        any::<bool>().prop_map(JsonValue::Bool),
        any::<i32>().prop_map(JsonValue::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(JsonValue::String),
    ]
}

/// Generate contract leaves: scalars and empty containers.
pub fn json_leaf_strategy() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        4 => json_scalar_strategy(),
        1 => Just(JsonValue::Array(Vec::new())),
        1 => Just(JsonValue::Object(Map::new())),
    ]
}

/// Generate JSON documents: non-null scalars nested in objects and arrays.
pub fn json_document_strategy() -> impl Strategy<Value = JsonValue> {
    json_scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(JsonValue::Array),
            prop::collection::btree_map(key_strategy(), inner, 1..4)
                .prop_map(|fields| JsonValue::Object(fields.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate JSON objects at the top level.
pub fn json_object_strategy() -> impl Strategy<Value = JsonValue> {
    prop::collection::btree_map(key_strategy(), json_document_strategy(), 1..5)
        .prop_map(|fields| JsonValue::Object(fields.into_iter().collect()))
}

/// Generate a GraphQL query and a reformatted copy of it.
pub fn graphql_query_strategy() -> impl Strategy<Value = (String, String)> {
    let field = "[a-z][a-zA-Z]{0,6}";
    let whitespace = prop_oneof![
        Just(" ".to_string()),
        Just("\n".to_string()),
        Just("\n  ".to_string()),
        Just("\t".to_string()),
        Just("  \r\n ".to_string()),
    ];
    (
        "[A-Z][a-zA-Z]{0,8}",
        prop::collection::vec(field, 1..5),
        prop::collection::vec(whitespace, 8),
    )
        .prop_map(|(name, fields, gaps)| {
            let compact = format!("query {name} {{ {} }}", fields.join(" "));
            let mut formatted = String::new();
            for (i, token) in compact.split(' ').enumerate() {
                if i > 0 {
                    formatted.push_str(&gaps[i % gaps.len()]);
                }
                formatted.push_str(token);
            }
            (compact, format!("{}{formatted}\n", gaps[0]))
        })
}
