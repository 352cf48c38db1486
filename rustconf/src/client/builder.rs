//! Builder for creating NETCONF clients.

use std::time::Duration;

use super::netconf::Client;
use crate::transport::ConnectionConfig;

/// Builder for constructing a [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use rustconf::Client;
///
/// let client = Client::builder("192.0.2.1")
///     .port(830)
///     .credentials("admin", "secret")
///     .namespace("urn:example:config")
///     .timeout(Duration::from_secs(10))
///     .build();
/// ```
pub struct ClientBuilder {
    config: ConnectionConfig,
}

impl ClientBuilder {
    /// Create a builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: ConnectionConfig::new(host),
        }
    }

    /// Set the SSH port (default: 830).
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the username and password for authentication.
    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Reject all write operations on this connection.
    pub fn read_only(mut self) -> Self {
        self.config.read_only = true;
        self
    }

    /// Allow edit-config to address more than one schema branch.
    pub fn allow_multiple_edit(mut self) -> Self {
        self.config.allow_multiple_edit = true;
        self
    }

    /// Drop attribute sub-mappings while decoding server XML.
    pub fn ignore_attributes(mut self) -> Self {
        self.config.ignore_attributes = true;
        self
    }

    /// Declare a default namespace for edit-config documents.
    pub fn namespace(mut self, uri: impl Into<String>) -> Self {
        self.config = self.config.with_namespace(uri);
        self
    }

    /// Declare alias → URI namespace pairs for edit-config documents.
    pub fn namespace_aliases<K, V, I>(mut self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.config = self.config.with_namespace_aliases(pairs);
        self
    }

    /// Set the connect/handshake/first-reply/close timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the client. The session connects lazily on first use.
    pub fn build(self) -> Client {
        Client::new(self.config)
    }
}
