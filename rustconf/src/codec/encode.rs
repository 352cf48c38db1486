//! Tree → XML encoding.

use crate::value::{Value, ATTRS, TEXT};

/// XML declaration emitted ahead of every encoded document.
const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Encode a tree to an XML document.
///
/// Each top-level mapping entry becomes an element named by its key. A
/// mapping's `$` sub-mapping becomes attributes, its `_` sub-key becomes
/// text, other sub-keys become child elements. A list under name `k`
/// becomes repeated `<k>…</k>` siblings. Primitives become element text.
pub fn encode(root: &Value) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_HEADER);
    if let Value::Map(entries) = root {
        for (name, value) in entries {
            write_element(&mut out, name, value);
        }
    }
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::List(items) => {
            for item in items {
                write_element(out, name, item);
            }
        }
        Value::Map(entries) => {
            out.push('<');
            out.push_str(name);
            if let Some(Value::Map(attrs)) = entries.get(ATTRS) {
                for (attr, attr_value) in attrs {
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr_value.to_string()));
                    out.push('"');
                }
            }

            let text = entries.get(TEXT);
            let children: Vec<(&String, &Value)> = entries
                .iter()
                .filter(|(k, _)| k.as_str() != ATTRS && k.as_str() != TEXT)
                .collect();

            if text.is_none() && children.is_empty() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            if let Some(text) = text {
                out.push_str(&escape_text(&text.to_string()));
            }
            for (child_name, child) in children {
                write_element(out, child_name, child);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Value::Null => {
            out.push('<');
            out.push_str(name);
            out.push_str("/>");
        }
        primitive => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            out.push_str(&escape_text(&primitive.to_string()));
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_primitives_and_nesting() {
        let tree = Value::map([(
            "config",
            Value::map([("mtu", Value::Int(9000)), ("name", Value::from("eth1"))]),
        )]);
        assert_eq!(
            encode(&tree),
            format!(
                "{}<config><mtu>9000</mtu><name>eth1</name></config>",
                XML_HEADER
            )
        );
    }

    #[test]
    fn test_encode_attributes_and_text() {
        let tree = Value::map([(
            "filter",
            Value::map([
                (
                    ATTRS,
                    Value::map([("type", Value::from("xpath")), ("select", Value::from("/a"))]),
                ),
                (TEXT, Value::from("body")),
            ]),
        )]);
        assert_eq!(
            encode(&tree),
            format!(
                r#"{}<filter type="xpath" select="/a">body</filter>"#,
                XML_HEADER
            )
        );
    }

    #[test]
    fn test_encode_list_becomes_siblings() {
        let tree = Value::map([(
            "capabilities",
            Value::map([(
                "capability",
                Value::list([Value::from("cap-a"), Value::from("cap-b")]),
            )]),
        )]);
        assert_eq!(
            encode(&tree),
            format!(
                "{}<capabilities><capability>cap-a</capability><capability>cap-b</capability></capabilities>",
                XML_HEADER
            )
        );
    }

    #[test]
    fn test_encode_empty_elements() {
        let tree = Value::map([(
            "edit-config",
            Value::map([("target", Value::map([("running", Value::Null)]))]),
        )]);
        assert_eq!(
            encode(&tree),
            format!(
                "{}<edit-config><target><running/></target></edit-config>",
                XML_HEADER
            )
        );
    }

    #[test]
    fn test_encode_escapes_special_characters() {
        let tree = Value::map([("note", Value::from("a < b & c"))]);
        assert_eq!(
            encode(&tree),
            format!("{}<note>a &lt; b &amp; c</note>", XML_HEADER)
        );
    }
}
