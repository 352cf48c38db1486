//! Request/reply envelope and server-hello types.

use crate::codec::value_text;
use crate::error::SessionError;
use crate::value::Value;

/// A received NETCONF message: the original wire text plus its decoded
/// tree.
///
/// For replies, `result` wraps the `rpc-reply` element, which contains
/// either `ok`, `data`, or `rpc-error`. For notifications it wraps the
/// `notification` element (`eventTime` plus the event payload). The tree
/// is caller-owned; the library keeps no reference to it after delivery.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The message exactly as received, delimiter excluded.
    pub xml: String,

    /// The decoded tree.
    pub result: Value,
}

impl Envelope {
    pub fn new(xml: impl Into<String>, result: Value) -> Self {
        Self {
            xml: xml.into(),
            result,
        }
    }
}

/// The server's hello: capabilities and the server-assigned session-id.
///
/// Captured once during the handshake and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ServerHello {
    /// Server-assigned session identifier.
    pub session_id: i64,

    /// Advertised capability URIs, in wire order.
    pub capabilities: Vec<String>,

    /// The full hello message.
    pub envelope: Envelope,
}

impl ServerHello {
    /// Validate a decoded hello tree. A hello without a `session-id` is
    /// malformed and fatal for the handshake.
    pub(crate) fn parse(xml: &str, tree: Value) -> Result<Self, SessionError> {
        let hello = tree
            .get("hello")
            .ok_or_else(|| SessionError::MalformedHello("missing hello element".to_string()))?;

        let session_id = hello
            .get("session-id")
            .and_then(Value::as_int)
            .ok_or_else(|| SessionError::MalformedHello("missing session-id".to_string()))?;

        let capabilities = match hello.get_path(&["capabilities", "capability"]) {
            Some(Value::List(items)) => items.iter().filter_map(value_text).collect(),
            Some(single) => value_text(single).into_iter().collect(),
            None => Vec::new(),
        };

        Ok(Self {
            session_id,
            capabilities,
            envelope: Envelope::new(xml, tree),
        })
    }
}
