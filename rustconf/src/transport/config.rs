//! NETCONF connection configuration.

use std::time::Duration;

use indexmap::IndexMap;

/// Timeout applied to SSH connect + subsystem open, the hello handshake,
/// the first reply of every request, and session close.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default NETCONF-over-SSH port (RFC 6242).
pub const DEFAULT_PORT: u16 = 830;

/// Namespaces declared by the caller for edit-config documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Namespaces {
    /// No namespaces declared; the resolver may fall back to a guessed one.
    #[default]
    None,

    /// A single default namespace URI (`xmlns="…"`).
    Default(String),

    /// Alias → URI pairs (`xmlns:alias="…"`).
    Aliases(IndexMap<String, String>),
}

/// NETCONF connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 830).
    pub port: u16,

    /// Username for password authentication.
    pub username: String,

    /// Password for password authentication.
    pub password: String,

    /// Reject all write operations (edit-config and rpc).
    pub read_only: bool,

    /// Allow edit-config to address more than one schema branch.
    pub allow_multiple_edit: bool,

    /// Drop attribute (`$`) sub-mappings while decoding server XML.
    pub ignore_attributes: bool,

    /// Namespaces injected into built edit-config documents.
    pub namespaces: Namespaces,

    /// Timeout for connect, handshake, first reply, and close.
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Create a configuration for the given host with defaults everywhere
    /// else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            read_only: false,
            allow_multiple_edit: false,
            ignore_attributes: false,
            namespaces: Namespaces::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_allow_multiple_edit(mut self, allow: bool) -> Self {
        self.allow_multiple_edit = allow;
        self
    }

    pub fn with_ignore_attributes(mut self, ignore: bool) -> Self {
        self.ignore_attributes = ignore;
        self
    }

    /// Declare a single default namespace.
    pub fn with_namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespaces = Namespaces::Default(uri.into());
        self
    }

    /// Declare alias → URI namespace pairs.
    pub fn with_namespace_aliases<K, V, I>(mut self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.namespaces = Namespaces::Aliases(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
