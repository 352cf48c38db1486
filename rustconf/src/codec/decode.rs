//! XML → tree decoding.

use indexmap::IndexMap;
use roxmltree::{Document, Node};

use crate::error::ProtocolError;
use crate::value::{Value, ATTRS, TEXT};

/// Decode an XML document into a tree.
///
/// Attributes (and namespace declarations) become a `$` sub-mapping,
/// suppressed entirely when `ignore_attributes` is set. An element with
/// multiple same-named children becomes a list under that name; a single
/// child becomes a direct sub-mapping. Numeric-looking element text is
/// coerced to a number; attribute values stay strings. Whitespace is
/// trimmed.
pub fn decode(xml: &str, ignore_attributes: bool) -> Result<Value, ProtocolError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let mut tree = IndexMap::new();
    tree.insert(
        qualified_name(&root),
        element_to_value(&root, ignore_attributes),
    );
    Ok(Value::Map(tree))
}

/// The element name as written in the source: `prefix:local` when the
/// element is bound to a prefixed namespace, plain local name otherwise.
fn qualified_name(node: &Node) -> String {
    let local = node.tag_name().name();
    match node.tag_name().namespace() {
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

fn element_to_value(node: &Node, ignore_attributes: bool) -> Value {
    let attrs = if ignore_attributes {
        IndexMap::new()
    } else {
        collect_attrs(node)
    };

    let children: Vec<Node> = node.children().filter(Node::is_element).collect();
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|t| t.text())
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim().to_string();

    if attrs.is_empty() && children.is_empty() {
        return if text.is_empty() {
            Value::Null
        } else {
            Value::from_text(&text)
        };
    }

    let mut entries = IndexMap::new();
    if !attrs.is_empty() {
        entries.insert(ATTRS.to_string(), Value::Map(attrs));
    }
    if !text.is_empty() {
        entries.insert(TEXT.to_string(), Value::from_text(&text));
    }

    // Group same-named siblings into lists, preserving first-occurrence
    // order of the names.
    let mut grouped: IndexMap<String, Vec<Value>> = IndexMap::new();
    for child in &children {
        grouped
            .entry(qualified_name(child))
            .or_default()
            .push(element_to_value(child, ignore_attributes));
    }
    for (name, mut values) in grouped {
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::List(values)
        };
        entries.insert(name, value);
    }

    Value::Map(entries)
}

/// Attributes plus namespace declarations made on this element (inherited
/// declarations are skipped so `$` reflects the source text).
fn collect_attrs(node: &Node) -> IndexMap<String, Value> {
    let mut attrs = IndexMap::new();

    for ns in node.namespaces() {
        // The xml: namespace is implicitly declared on every document.
        if ns.uri() == "http://www.w3.org/XML/1998/namespace" {
            continue;
        }
        let declared_by_parent = node
            .parent_element()
            .map(|p| {
                p.namespaces()
                    .any(|pn| pn.name() == ns.name() && pn.uri() == ns.uri())
            })
            .unwrap_or(false);
        if declared_by_parent {
            continue;
        }
        let key = match ns.name() {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        attrs.insert(key, Value::String(ns.uri().to_string()));
    }

    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(uri) => match node.lookup_prefix(uri) {
                Some(prefix) if !prefix.is_empty() => {
                    format!("{}:{}", prefix, attr.name())
                }
                _ => attr.name().to_string(),
            },
            None => attr.name().to_string(),
        };
        attrs.insert(name, Value::String(attr.value().to_string()));
    }

    attrs
}
