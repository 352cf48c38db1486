//! Response pruning: trim a get response to the node the XPath addressed.
//!
//! A NETCONF server always returns the full ancestor chain of the
//! requested node. [`resolve_xpath`] walks that chain so the caller gets
//! "the node I asked for": a single-key wrapper around the addressed
//! node, or the node's children for a trailing wildcard.

use crate::value::{Value, ATTRS};

use super::xpath::canonical_segments;

/// Select the subtree of `tree` addressed by `xpath`.
///
/// Union XPaths (`|`) and empty paths return the tree unchanged. A
/// literal segment descends into the named child; a miss stops the walk
/// and returns the last successfully resolved level in wrapper form
/// (`{last_key: last_resolved}`). A `*` enters deep mode: the next
/// literal is resolved by unique-descendant search, where a list on the
/// way binds the result to the list's enclosing key; zero or multiple
/// matches abandon the walk and return the input unchanged. A trailing
/// `*` returns the addressed mapping (or list) directly.
///
/// Pure: equal inputs give equal outputs, and `tree` is never mutated.
pub fn resolve_xpath(tree: &Value, xpath: &str) -> Value {
    if xpath.contains('|') {
        return tree.clone();
    }
    let segments = canonical_segments(xpath);
    if segments.is_empty() {
        return tree.clone();
    }

    let mut current: &Value = tree;
    let mut last: Option<(&str, &Value)> = None;
    let mut deep = false;

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();

        if segment == "*" {
            if is_last {
                return match current {
                    Value::Map(_) | Value::List(_) => current.clone(),
                    _ => wrap(last, tree),
                };
            }
            deep = true;
            continue;
        }

        if deep {
            let mut candidates = Vec::new();
            deep_candidates(current, segment, &mut candidates);
            if candidates.len() != 1 {
                // Zero or ambiguous matches: hand back the whole tree.
                return tree.clone();
            }
            let (key, value) = candidates.remove(0);
            last = Some((key, value));
            current = value;
            deep = false;
            continue;
        }

        match current.get(segment) {
            Some(child) => {
                last = Some((segment, child));
                current = child;
            }
            // A list, or a missing child: stop at the last resolved level.
            None => return wrap(last, tree),
        }
    }

    wrap(last, tree)
}

fn wrap(last: Option<(&str, &Value)>, tree: &Value) -> Value {
    match last {
        Some((key, value)) => Value::map([(key, value.clone())]),
        None => tree.clone(),
    }
}

/// Unique-descendant search. A direct key match is a candidate bound to
/// itself; a list whose elements contain the target somewhere below is a
/// candidate bound to the list's enclosing key and is not descended into.
fn deep_candidates<'a>(node: &'a Value, target: &str, out: &mut Vec<(&'a str, &'a Value)>) {
    let Some(map) = node.as_map() else {
        return;
    };
    for (key, value) in map {
        if key == ATTRS {
            continue;
        }
        if key == target {
            out.push((key, value));
            continue;
        }
        match value {
            Value::List(_) => {
                if contains_key_deep(value, target) {
                    out.push((key, value));
                }
            }
            Value::Map(_) => deep_candidates(value, target, out),
            _ => {}
        }
    }
}

fn contains_key_deep(node: &Value, target: &str) -> bool {
    match node {
        Value::Map(map) => map
            .iter()
            .any(|(key, value)| key != ATTRS && (key == target || contains_key_deep(value, target))),
        Value::List(items) => items.iter().any(|item| contains_key_deep(item, target)),
        _ => false,
    }
}
