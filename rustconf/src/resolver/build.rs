//! edit-config document synthesis from an XPath.
//!
//! Two resolution paths. The strict path handles wildcard-free XPaths by
//! building the nested document directly from the segments. The schema
//! path handles wildcards by walking a deep copy of a schema skeleton,
//! keeping only the branches that reach the addressed node.

use crate::transport::Namespaces;
use crate::value::{Value, ATTRS};

use super::xpath::{canonical_segments, parse_strict};

/// A built edit-config document plus the key-path of every addressed
/// mapping inside it.
///
/// Paths (rather than references) let the caller merge values and set
/// operation attributes on each match while owning the document outright.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    /// The document to submit under `<config>`.
    pub doc: Value,

    /// Key-paths of the addressed mappings, in match order.
    pub paths: Vec<Vec<String>>,
}

impl BuildResult {
    /// Borrow the addressed mappings, in match order.
    pub fn matches(&self) -> Vec<&Value> {
        self.paths
            .iter()
            .filter_map(|path| self.doc.get_path(&path.iter().map(String::as_str).collect::<Vec<_>>()))
            .collect()
    }
}

/// Strict-path build: one nested mapping per segment, predicate keys set
/// at their depth, namespaces injected into the first segment.
///
/// Returns `None` when any segment falls outside the strict grammar; the
/// caller falls back to schema resolution.
pub fn build_strict(
    xpath: &str,
    namespaces: &Namespaces,
    guessed_namespace: Option<&str>,
) -> Option<BuildResult> {
    let segments = parse_strict(xpath)?;

    let mut doc = Value::empty_map();
    let mut node = &mut doc;
    let mut path = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        node = node.insert(segment.name.clone(), Value::empty_map());
        path.push(segment.name.clone());
        if i == 0 {
            inject_namespaces(node, namespaces, guessed_namespace);
        }
        if let Some((key, literal)) = &segment.predicate {
            node.insert(key.clone(), Value::String(literal.clone()));
        }
    }

    Some(BuildResult {
        doc,
        paths: vec![path],
    })
}

/// Schema-path build: walk a deep copy of the schema skeleton by the
/// canonicalized segments.
///
/// `*` jumps through any run of mappings until the following name
/// matches; a trailing `*` addresses its parent mapping as a whole; an
/// addressed list is replaced by a fresh mapping before descending
/// (edit-config targets a single element); matched terminals are stripped
/// to primitives and attributes; branches that produce no match are
/// pruned from the copy.
pub fn build_with_schema(schema: &Value, xpath: &str, namespaces: &Namespaces) -> BuildResult {
    let steps: Vec<Step> = canonical_segments(xpath)
        .into_iter()
        .map(|segment| {
            if segment == "*" {
                Step::Wild
            } else {
                Step::Name(segment)
            }
        })
        .collect();

    let mut doc = schema.clone();
    let mut paths = Vec::new();
    let mut path = Vec::new();
    walk(&mut doc, &steps, &mut path, &mut paths);

    // Namespace configuration applies to the first traversal step of each
    // surviving branch.
    if !matches!(namespaces, Namespaces::None) {
        let mut seen = Vec::new();
        for result_path in &paths {
            let Some(first) = result_path.first() else {
                continue;
            };
            if seen.contains(first) {
                continue;
            }
            seen.push(first.clone());
            if let Some(node) = doc.get_mut(first) {
                inject_namespaces(node, namespaces, None);
            }
        }
    }

    BuildResult { doc, paths }
}

fn inject_namespaces(node: &mut Value, namespaces: &Namespaces, guessed: Option<&str>) {
    match namespaces {
        Namespaces::Default(uri) => node.set_attr("xmlns", uri.clone()),
        Namespaces::Aliases(pairs) => {
            for (alias, uri) in pairs {
                node.set_attr(format!("xmlns:{}", alias), uri.clone());
            }
        }
        Namespaces::None => {
            if let Some(uri) = guessed {
                node.set_attr("xmlns", uri);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    /// `*`: match the following name anywhere below.
    Wild,

    /// A literal segment.
    Name(String),
}

/// Process `steps` against `node`, recording matched paths. Returns
/// whether anything below produced a match.
fn walk(node: &mut Value, steps: &[Step], path: &mut Vec<String>, results: &mut Vec<Vec<String>>) -> bool {
    match steps.split_first() {
        None => false,
        Some((Step::Name(name), rest)) => descend(node, name, rest, path, results),
        Some((Step::Wild, rest)) => {
            if rest.is_empty() {
                // A bare `*` addresses the current mapping as a whole.
                results.push(path.clone());
                true
            } else {
                search(node, steps, path, results)
            }
        }
    }
}

/// Literal descent into `name`, then the remaining steps.
fn descend(
    node: &mut Value,
    name: &str,
    rest: &[Step],
    path: &mut Vec<String>,
    results: &mut Vec<Vec<String>>,
) -> bool {
    let Some(map) = node.as_map_mut() else {
        return false;
    };
    let Some(child) = map.get_mut(name) else {
        return false;
    };

    // edit-config targets a single element: an addressed list collapses to
    // a fresh mapping before the walk continues.
    if child.is_list() {
        *child = Value::empty_map();
    }

    path.push(name.to_string());
    let produced = if rest.is_empty() {
        strip_to_leaf(child);
        results.push(path.clone());
        true
    } else if matches!(rest, [Step::Wild]) {
        // Trailing `*` selects this mapping as a whole, children intact.
        results.push(path.clone());
        true
    } else {
        walk(child, rest, path, results)
    };
    path.pop();

    if produced {
        // Only the addressed branch (and attributes) survive at this level.
        map.retain(|key, _| key == ATTRS || key == name);
    }
    produced
}

/// Wild-mode search: `steps[0]` is the name to find at any depth below
/// `node`. Unproductive branches are pruned as the recursion unwinds.
fn search(node: &mut Value, steps: &[Step], path: &mut Vec<String>, results: &mut Vec<Vec<String>>) -> bool {
    let (Some(Step::Wild), Some(Step::Name(target))) = (steps.first(), steps.get(1)) else {
        return false;
    };
    let Some(map) = node.as_map_mut() else {
        return false;
    };

    if map.contains_key(target.as_str()) {
        // The wild run ends here; consume it and descend normally.
        return descend(node, target, &steps[2..], path, results);
    }

    let keys: Vec<String> = map
        .keys()
        .filter(|key| key.as_str() != ATTRS)
        .cloned()
        .collect();
    let mut produced = false;
    for key in keys {
        let child = map.get_mut(&key).unwrap();
        let child_produced = if child.is_map() {
            path.push(key.clone());
            let p = search(child, steps, path, results);
            path.pop();
            p
        } else {
            false
        };
        if child_produced {
            produced = true;
        } else {
            map.shift_remove(&key);
        }
    }
    produced
}

/// Strip a matched terminal to primitives and attributes.
fn strip_to_leaf(node: &mut Value) {
    if let Some(map) = node.as_map_mut() {
        map.retain(|key, value| key == ATTRS || value.is_primitive());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_build_with_predicate() {
        let result = build_strict(
            r#"/interfaces/interface[name="eth1"]"#,
            &Namespaces::None,
            None,
        )
        .unwrap();

        assert_eq!(
            result.doc,
            Value::map([(
                "interfaces",
                Value::map([("interface", Value::map([("name", Value::from("eth1"))]))]),
            )])
        );
        assert_eq!(result.paths, vec![vec!["interfaces".to_string(), "interface".to_string()]]);
        assert_eq!(
            result.matches(),
            vec![&Value::map([("name", Value::from("eth1"))])]
        );
    }

    #[test]
    fn test_strict_build_injects_namespace() {
        let result = build_strict(
            r#"/interfaces/interface[name="eth1"]"#,
            &Namespaces::Default("http://x".to_string()),
            None,
        )
        .unwrap();

        assert_eq!(
            result.doc.get_path(&["interfaces", ATTRS, "xmlns"]),
            Some(&Value::String("http://x".into()))
        );
        assert_eq!(
            result.doc.get_path(&["interfaces", "interface", "name"]),
            Some(&Value::String("eth1".into()))
        );
    }

    #[test]
    fn test_strict_build_uses_guessed_namespace() {
        let result = build_strict("/system/hostname", &Namespaces::None, Some("http://guess"))
            .unwrap();
        assert_eq!(
            result.doc.get_path(&["system", ATTRS, "xmlns"]),
            Some(&Value::String("http://guess".into()))
        );
    }

    #[test]
    fn test_strict_build_alias_namespaces() {
        let result = build_strict(
            "/system/hostname",
            &Namespaces::Aliases([("sys".to_string(), "http://sys".to_string())].into_iter().collect()),
            None,
        )
        .unwrap();
        assert_eq!(
            result.doc.get_path(&["system", ATTRS, "xmlns:sys"]),
            Some(&Value::String("http://sys".into()))
        );
    }

    #[test]
    fn test_strict_build_rejects_off_grammar() {
        assert!(build_strict("/a/b[position()=1]", &Namespaces::None, None).is_none());
    }

    fn two_terminal_schema() -> Value {
        let terminal = || {
            Value::map([(
                "port",
                Value::map([(
                    "config-item",
                    Value::map([("key", Value::Null), ("value", Value::Null)]),
                )]),
            )])
        };
        Value::map([(
            "protocols",
            Value::map([
                ("lan", Value::map([("terminal", terminal())])),
                ("wan", Value::map([("terminal", terminal())])),
            ]),
        )])
    }

    #[test]
    fn test_schema_build_matches_both_terminals() {
        let schema = two_terminal_schema();
        let result = build_with_schema(
            &schema,
            r#"//terminal/*/config-item[key="name"]"#,
            &Namespaces::None,
        );

        assert_eq!(result.paths.len(), 2);
        for matched in result.matches() {
            assert_eq!(matched.get("key"), Some(&Value::Null));
        }
        // Both productive branches survive in the document.
        assert!(result
            .doc
            .get_path(&["protocols", "lan", "terminal", "port", "config-item"])
            .is_some());
        assert!(result
            .doc
            .get_path(&["protocols", "wan", "terminal", "port", "config-item"])
            .is_some());
    }

    #[test]
    fn test_schema_build_two_branches_for_ambiguity_check() {
        let schema = Value::map([(
            "a",
            Value::map([
                ("first", Value::map([("wildcard", Value::map([("key", Value::Null)]))])),
                ("second", Value::map([("wildcard", Value::map([("key", Value::Null)]))])),
            ]),
        )]);
        let result = build_with_schema(&schema, "//wildcard/key", &Namespaces::None);
        assert_eq!(result.paths.len(), 2);
    }

    #[test]
    fn test_schema_build_prunes_unproductive_branches() {
        let schema = Value::map([(
            "root",
            Value::map([
                ("keep", Value::map([("target", Value::map([("leaf", Value::Null)]))])),
                ("drop", Value::map([("other", Value::Null)])),
            ]),
        )]);
        let result = build_with_schema(&schema, "//target", &Namespaces::None);
        assert_eq!(result.paths.len(), 1);
        assert!(result.doc.get_path(&["root", "keep", "target"]).is_some());
        assert_eq!(result.doc.get_path(&["root", "drop"]), None);
    }

    #[test]
    fn test_schema_build_replaces_list_with_mapping() {
        let schema = Value::map([(
            "a",
            Value::map([("b", Value::list([Value::map([("x", Value::Null)])]))]),
        )]);
        let result = build_with_schema(&schema, "/a/b", &Namespaces::None);
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.doc.get_path(&["a", "b"]), Some(&Value::empty_map()));
    }

    #[test]
    fn test_schema_build_strips_terminal_to_leaf() {
        let schema = Value::map([(
            "sys",
            Value::map([(
                "conf",
                Value::map([
                    ("name", Value::Null),
                    ("nested", Value::map([("deep", Value::Null)])),
                    ("items", Value::list([Value::Null])),
                ]),
            )]),
        )]);
        let result = build_with_schema(&schema, "//conf", &Namespaces::None);
        assert_eq!(result.paths.len(), 1);
        let matched = result.doc.get_path(&["sys", "conf"]).unwrap();
        assert_eq!(matched.get("name"), Some(&Value::Null));
        assert_eq!(matched.get("nested"), None);
        assert_eq!(matched.get("items"), None);
    }

    #[test]
    fn test_schema_build_trailing_star_keeps_children() {
        let schema = Value::map([(
            "sys",
            Value::map([(
                "conf",
                Value::map([("name", Value::Null), ("nested", Value::map([("deep", Value::Null)]))]),
            )]),
        )]);
        let result = build_with_schema(&schema, "//conf/*", &Namespaces::None);
        assert_eq!(result.paths.len(), 1);
        let matched = result.doc.get_path(&["sys", "conf"]).unwrap();
        assert!(matched.get("nested").is_some());
    }

    #[test]
    fn test_schema_build_no_match_is_empty() {
        let schema = Value::map([("a", Value::map([("b", Value::Null)]))]);
        let result = build_with_schema(&schema, "//missing", &Namespaces::None);
        assert!(result.paths.is_empty());
    }

    #[test]
    fn test_schema_build_injects_namespace_on_first_step() {
        let schema = Value::map([(
            "root",
            Value::map([("branch", Value::map([("target", Value::map([("x", Value::Null)]))]))]),
        )]);
        let result = build_with_schema(
            &schema,
            "//target",
            &Namespaces::Default("http://ns".to_string()),
        );
        assert_eq!(
            result.doc.get_path(&["root", ATTRS, "xmlns"]),
            Some(&Value::String("http://ns".into()))
        );
    }
}
