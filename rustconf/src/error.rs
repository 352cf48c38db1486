//! Error types for rustconf.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for rustconf operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// NETCONF protocol errors (framing, XML, server-reported)
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// XPath resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Client-level errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Transport layer errors (SSH connection, authentication, subsystem).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Opening the netconf subsystem failed
    #[error("Failed to open netconf subsystem: {0}")]
    SubsystemFailed(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Protocol layer errors (framing, XML decoding, server rpc-error).
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Framer buffer exceeded its ceiling
    #[error("Message buffer exceeded {limit} bytes")]
    FramerOverflow { limit: usize },

    /// XML could not be parsed
    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The decoded message had an unexpected shape
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// The server reported an rpc-error
    #[error("{0}")]
    Rpc(RpcError),
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// close() on a session that never connected
    #[error("Session not opened")]
    NotOpened,

    /// The session is closed; pending and new requests fail with this
    #[error("{reason}")]
    Closed { reason: String },

    /// No server hello within the handshake window
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// The server hello was missing a session-id or otherwise malformed
    #[error("Malformed hello: {0}")]
    MalformedHello(String),

    /// No reply to a request within the first-reply window
    #[error("No reply within {0:?}")]
    RequestTimeout(Duration),
}

impl SessionError {
    /// The error every outstanding waiter receives when the session ends.
    pub fn closed() -> Self {
        SessionError::Closed {
            reason: "SSH session closed".to_string(),
        }
    }
}

/// XPath resolution errors.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// XPath empty, only slashes, or containing a union in build context
    #[error("Invalid XPath: {0}")]
    InvalidXPath(String),

    /// Neither the strict grammar nor the schema produced a target
    #[error("Failed to build the edit config message matching the XPath/Schema")]
    NoMatch,

    /// More than one schema branch matched and multiple edit is not allowed
    #[error("Editing multiple schema branches not allowed")]
    MultipleEdit,
}

/// Client-level errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Any write-ish call while the connection is read-only
    #[error("Operation not performed: in read-only mode")]
    ReadOnly,

    /// edit-config reply did not contain <ok/>
    #[error("server response did not include OK")]
    MissingOk,

    /// Schema fetch for wildcard resolution came back empty
    #[error("Schema fetch returned empty")]
    EmptySchema,
}

/// A classified `rpc-error` from an `rpc-reply`.
///
/// The `message` is selected by the codec: explicit `error-message` text
/// first, then a text inferred from the `error-tag` (incorporating
/// `error-info` details when present), then the raw tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// `error-type` (e.g. "application", "protocol").
    pub error_type: Option<String>,

    /// `error-tag` (e.g. "unknown-element", "data-exists").
    pub tag: Option<String>,

    /// `error-severity` (e.g. "error", "warning").
    pub severity: Option<String>,

    /// Selected human-readable message.
    pub message: String,

    /// `error-info` details, when present.
    pub info: RpcErrorInfo,
}

/// Optional `error-info` fields of an rpc-error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcErrorInfo {
    pub bad_element: Option<String>,
    pub bad_namespace: Option<String>,
    pub bad_content: Option<String>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result type alias using rustconf's Error.
pub type Result<T> = std::result::Result<T, Error>;
