//! Key extraction from arbitrarily nested page-state JSON.
//!
//! The embedded page data of a YouTube page is a deep mix of objects and arrays whose shape
//! changes without notice. Rather than following a fixed path, callers ask for every value
//! stored under a given key, wherever it sits.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// A borrowed view of one JSON node
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Scalar(&'a Value),
}

impl<'a> From<&'a Value> for Node<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Node::Object(map),
            Value::Array(items) => Node::Array(items),
            scalar => Node::Scalar(scalar),
        }
    }
}

/// Receives every object entry during a pre-order walk
pub trait Visitor<'a> {
    fn visit_entry(&mut self, key: &'a str, value: &'a Value);
}

/// Walk `tree` in pre-order: an object entry is visited before the subtree below it, and
/// object entries and array elements are visited in document order.
///
/// The page data is acyclic, so no cycle guard is needed.
// Document order for object keys relies on serde_json's `preserve_order` feature.
pub fn walk<'a, V: Visitor<'a>>(tree: &'a Value, visitor: &mut V) {
    match Node::from(tree) {
        Node::Object(map) => {
            for (key, value) in map {
                visitor.visit_entry(key, value);
                walk(value, visitor);
            }
        }
        Node::Array(items) => {
            for item in items {
                walk(item, visitor);
            }
        }
        Node::Scalar(_) => {}
    }
}

struct KeyCollector<'a, 'k> {
    key: &'k str,
    found: Vec<&'a Value>,
}

impl<'a> Visitor<'a> for KeyCollector<'a, '_> {
    fn visit_entry(&mut self, key: &'a str, value: &'a Value) {
        if key == self.key {
            self.found.push(value);
        }
    }
}

/// Every value stored under `key` anywhere in `tree`, in pre-order.
pub fn collect<'a>(tree: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut collector = KeyCollector {
        key,
        found: Vec::new(),
    };
    walk(tree, &mut collector);
    collector.found
}

/// String values stored under `key`, in pre-order. Non-string values are skipped.
pub fn collect_strings<'a>(tree: &'a Value, key: &str) -> Vec<&'a str> {
    collect(tree, key)
        .into_iter()
        .filter_map(Value::as_str)
        .collect()
}

/// String values under `key` with duplicates removed, keeping the first occurrence.
///
/// Deduplicating through a plain set would lose the traversal order; this keeps it.
pub fn collect_unique_strings<'a>(tree: &'a Value, key: &str) -> Vec<&'a str> {
    dedup_first_seen(collect_strings(tree, key))
}

/// Remove duplicates while keeping the first occurrence of each item.
pub fn dedup_first_seen<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sorted(mut values: Vec<&str>) -> Vec<&str> {
        values.sort_unstable();
        values
    }

    #[test]
    fn test_collect_finds_nested_keys_in_pre_order() {
        let tree = json!({
            "videoId": "top",
            "contents": [
                {"item": {"videoId": "a", "nested": {"videoId": "b"}}},
                [{"videoId": "c"}],
                "scalar",
                42
            ]
        });

        assert_eq!(collect_strings(&tree, "videoId"), vec!["top", "a", "b", "c"]);
    }

    #[test]
    fn test_collect_includes_match_before_its_subtree() {
        let tree = json!({"videoId": {"videoId": "inner"}});
        let found = collect(&tree, "videoId");

        assert_eq!(found.len(), 2);
        assert!(found[0].is_object());
        assert_eq!(found[1], "inner");
    }

    #[test]
    fn test_collect_multiset_ignores_sibling_order_and_depth() {
        let shallow = json!([{"videoId": "x"}, {"videoId": "y"}, {"videoId": "x"}]);
        let reordered = json!([
            {"videoId": "x"},
            {"deep": [[{"deeper": {"videoId": "x"}}]]},
            {"videoId": "y"}
        ]);

        assert_eq!(
            sorted(collect_strings(&shallow, "videoId")),
            sorted(collect_strings(&reordered, "videoId"))
        );
    }

    #[test]
    fn test_collect_unique_keeps_first_seen_order() {
        let tree = json!({"a": [{"videoId": "z"}, {"videoId": "m"}, {"videoId": "z"}, {"videoId": "a"}]});

        assert_eq!(collect_unique_strings(&tree, "videoId"), vec!["z", "m", "a"]);
    }

    #[test]
    fn test_collect_on_scalar_is_empty() {
        assert!(collect(&json!("videoId"), "videoId").is_empty());
        assert!(collect(&json!(null), "videoId").is_empty());
    }
}
