//! Dotted path resolution over JSON trees
//!
//! Supports exactly one addressing form: an optional `$.` prefix followed by
//! `.`-separated segments. A segment names an object key, or, when the current
//! node is an array, a non-negative decimal index. There is no escaping, no
//! wildcard and no filter syntax; anything that does not resolve yields `None`.
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;

/// Prefix accepted (and ignored) in front of a path
pub const ROOT_PREFIX: &str = "$.";

/// Split a path expression into its segments
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix(ROOT_PREFIX).unwrap_or(path).split('.')
}

/// Resolve `path` against `tree`
///
/// Missing keys, out-of-range indices and descending into scalars all return
/// `None`; resolution never fails.
pub fn resolve<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(tree, step)
}

/// Resolve `path`, cloning the hit and mapping absence to `Value::Null`
pub fn resolve_or_null(tree: &Value, path: &str) -> Value {
    resolve(tree, path).cloned().unwrap_or(Value::Null)
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|index| items.get(index)),
        _ => None,
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// A leaf plus the path segments leading to it
    fn nested_leaf() -> impl Strategy<Value = (Vec<Result<String, usize>>, Value)> {
        let segment = prop_oneof![
            "[a-z_][a-z0-9_]{0,8}".prop_map(Ok),
            (0usize..4).prop_map(Err),
        ];
        (
            proptest::collection::vec(segment, 1..6),
            "[a-zA-Z0-9 ]{0,20}".prop_map(Value::String),
        )
    }

    /// Build a tree that places `leaf` at the given segments
    fn build(segments: &[Result<String, usize>], leaf: Value) -> Value {
        match segments.split_first() {
            None => leaf,
            Some((Ok(key), rest)) => {
                let mut map = Map::new();
                map.insert("sibling".to_string(), Value::Bool(true));
                map.insert(key.clone(), build(rest, leaf));
                Value::Object(map)
            }
            Some((Err(index), rest)) => {
                let mut items = vec![Value::Null; *index];
                items.push(build(rest, leaf));
                Value::Array(items)
            }
        }
    }

    fn render(segments: &[Result<String, usize>]) -> String {
        segments
            .iter()
            .map(|s| match s {
                Ok(key) => key.clone(),
                Err(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    proptest! {
        /// Property: a path built alongside a tree resolves to its leaf
        #[test]
        fn prop_existing_leaf_resolves((segments, leaf) in nested_leaf()) {
            let tree = build(&segments, leaf.clone());
            let path = render(&segments);
            prop_assert_eq!(resolve(&tree, &path), Some(&leaf));
            prop_assert_eq!(resolve(&tree, &format!("$.{}", path)), Some(&leaf));
        }

        /// Property: appending a missing key never panics and yields None
        #[test]
        fn prop_missing_suffix_is_absent((segments, leaf) in nested_leaf()) {
            let tree = build(&segments, leaf);
            let path = format!("{}.does_not_exist", render(&segments));
            prop_assert_eq!(resolve(&tree, &path), None);
        }

        /// Property: arbitrary paths never panic
        #[test]
        fn prop_arbitrary_paths_never_panic(path in ".{0,40}") {
            let tree = build(&[Ok("a".to_string()), Err(1)], Value::from(1));
            let _ = resolve(&tree, &path);
        }
    }
}
