//! Message classification and rpc-error extraction.

use crate::error::{RpcError, RpcErrorInfo};
use crate::value::{Value, TEXT};

/// What a framed message is, judged by its root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// `<hello>`: capability advertisement.
    Hello,

    /// `<rpc-reply>`: response to a request.
    RpcReply,

    /// `<notification>`: asynchronous server push.
    Notification,

    /// Anything else.
    Other,
}

/// Classify a raw message by its root element name, without a full parse.
pub fn classify(xml: &str) -> MessageClass {
    match root_element_name(xml).as_deref() {
        Some("hello") => MessageClass::Hello,
        Some("rpc-reply") => MessageClass::RpcReply,
        Some("notification") => MessageClass::Notification,
        _ => MessageClass::Other,
    }
}

/// The local name of the first element tag, skipping the XML declaration,
/// comments, and processing instructions.
fn root_element_name(xml: &str) -> Option<String> {
    let mut rest = xml;
    loop {
        let start = rest.find('<')?;
        rest = &rest[start + 1..];
        match rest.chars().next()? {
            '?' => {
                let end = rest.find("?>")?;
                rest = &rest[end + 2..];
            }
            '!' => {
                let end = rest.find('>')?;
                rest = &rest[end + 1..];
            }
            _ => {
                let name: String = rest
                    .chars()
                    .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
                    .collect();
                // Strip a namespace prefix if present.
                let local = name.rsplit(':').next().unwrap_or(&name);
                return Some(local.to_string());
            }
        }
    }
}

/// Text of a node that may be a bare primitive or a `{_: text, $: …}`
/// mapping.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Map(entries) => entries.get(TEXT).map(|t| t.to_string()),
        Value::Null | Value::List(_) => None,
        primitive => Some(primitive.to_string()),
    }
}

/// Extract a classified [`RpcError`] from a decoded reply tree, if the
/// tree contains `rpc-reply.rpc-error`.
pub fn extract_error(tree: &Value) -> Option<RpcError> {
    let reply = tree.get("rpc-reply")?;
    let rpc_error = match reply.get("rpc-error")? {
        // A reply may carry several errors; the first is surfaced.
        Value::List(errors) => errors.first()?,
        single => single,
    };

    let field = |name: &str| rpc_error.get(name).and_then(value_text);

    let info = match rpc_error.get("error-info") {
        Some(info_node) => RpcErrorInfo {
            bad_element: info_node.get("bad-element").and_then(value_text),
            bad_namespace: info_node.get("bad-namespace").and_then(value_text),
            bad_content: info_node.get("bad-content").and_then(value_text),
        },
        None => RpcErrorInfo::default(),
    };

    let tag = field("error-tag");
    let message = field("error-message")
        .or_else(|| inferred_message(tag.as_deref(), &info))
        .or_else(|| tag.clone())
        .unwrap_or_else(|| "rpc-error".to_string());

    Some(RpcError {
        error_type: field("error-type"),
        tag,
        severity: field("error-severity"),
        message,
        info,
    })
}

/// Fallback message inferred from the error-tag when the server sent no
/// error-message.
fn inferred_message(tag: Option<&str>, info: &RpcErrorInfo) -> Option<String> {
    match tag? {
        "unknown-element" => Some(match &info.bad_element {
            Some(element) => format!("Unknown element '{}'", element),
            None => "Unknown element".to_string(),
        }),
        "unknown-namespace" => Some(match &info.bad_namespace {
            Some(ns) => format!("Unknown namespace '{}'", ns),
            None => "Unknown namespace".to_string(),
        }),
        "data-exists" => Some(match &info.bad_element {
            Some(element) => format!("Data for element '{}' already exists", element),
            None => "Data already exists".to_string(),
        }),
        _ => None,
    }
}
