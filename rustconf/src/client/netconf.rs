//! The public NETCONF client.

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Error, ResolveError, Result};
use crate::resolver::{
    build_strict, build_with_schema, is_strict_candidate, resolve_xpath, validate_for_build,
    BuildResult,
};
use crate::session::{Envelope, ReplyStream, Session, SessionState, BASE_NS};
use crate::transport::{ConnectionConfig, Namespaces};
use crate::value::{Value, ATTRS, TEXT};

/// NETCONF notifications namespace (RFC 5277).
pub const NOTIFICATION_NS: &str = "urn:ietf:params:xml:ns:netconf:notification:1.0";

/// NMDA get-data namespace (RFC 8526).
pub const NMDA_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-nmda";

/// NMDA datastore identity namespace.
pub const DATASTORES_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-datastores";

/// YANG metadata namespace, used for ordered-list inserts.
pub const YANG_NS: &str = "urn:ietf:params:xml:ns:yang:1";

/// What flavor of data a [`Client::get_data`] call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Configuration datastore contents (NMDA `config-filter=true`).
    Config,

    /// Operational state (NMDA `config-filter=false`).
    State,

    /// A depth-1 schema skeleton, used to resolve wildcard XPaths.
    Schema,
}

/// A subscription source: an XPath filter or a named event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOption {
    /// Subscribe to events matching an XPath filter.
    XPath(String),

    /// Subscribe to a named stream (e.g. "NETCONF").
    Stream(String),
}

enum EditOperation {
    Merge,
    Create { before_key: Option<String> },
    Delete,
}

/// High-level NETCONF client addressing data with XPath expressions.
///
/// A `Client` has-a [`Session`] and drives it: it builds request documents
/// (via the resolver for edits), submits them, and post-processes replies
/// (unwrap `data`, prune to the addressed node). The underlying session
/// connects lazily on the first call that needs the wire.
///
/// # Example
///
/// ```rust,no_run
/// use rustconf::{Client, DataKind};
///
/// # async fn example() -> Result<(), rustconf::Error> {
/// let client = Client::builder("192.0.2.1")
///     .credentials("admin", "secret")
///     .build();
///
/// let envelope = client.get_data("/interfaces/interface", None).await?;
/// println!("{}", envelope.xml);
///
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    session: Session,
    config: ConnectionConfig,
}

impl Client {
    /// Create a client from a configuration. No I/O happens yet.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            session: Session::new(config.clone()),
            config,
        }
    }

    /// Start a [`ClientBuilder`](super::ClientBuilder) for `host`.
    pub fn builder(host: impl Into<String>) -> super::ClientBuilder {
        super::ClientBuilder::new(host)
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connect if necessary and return the server-hello envelope.
    pub async fn hello(&self) -> Result<Envelope> {
        self.session.hello().await
    }

    /// Retrieve data addressed by `xpath`.
    ///
    /// With `kind = None` a plain `get` with an XPath filter is used;
    /// `Config`/`State` use NMDA `get-data` against the operational
    /// datastore; `Schema` asks for a depth-1 skeleton. The reply's
    /// `data` subtree is unwrapped and pruned to the addressed node.
    pub async fn get_data(&self, xpath: &str, kind: Option<DataKind>) -> Result<Envelope> {
        let mut envelope = self.fetch_data(xpath, kind).await?;
        if kind == Some(DataKind::Schema) {
            strip_top_level_attrs(&mut envelope.result);
        }
        Ok(envelope)
    }

    /// Deep-merge `values` into the node addressed by `xpath` in the
    /// running datastore.
    pub async fn edit_config_merge(&self, xpath: &str, values: &Value) -> Result<Envelope> {
        self.edit_config(xpath, values, EditOperation::Merge).await
    }

    /// Create the node addressed by `xpath` with `values`. When
    /// `before_key` is given, the new entry is inserted before that list
    /// key (`yang:insert`).
    pub async fn edit_config_create(
        &self,
        xpath: &str,
        values: &Value,
        before_key: Option<&str>,
    ) -> Result<Envelope> {
        self.edit_config(
            xpath,
            values,
            EditOperation::Create {
                before_key: before_key.map(str::to_string),
            },
        )
        .await
    }

    /// Delete the node addressed by `xpath`; `values` identify it (list
    /// keys).
    pub async fn edit_config_delete(&self, xpath: &str, values: &Value) -> Result<Envelope> {
        self.edit_config(xpath, values, EditOperation::Delete).await
    }

    /// Create leaf-list entries under the node addressed by `xpath`.
    pub async fn edit_config_create_list_items(
        &self,
        xpath: &str,
        items: &[Value],
    ) -> Result<Envelope> {
        self.edit_config_list_items(xpath, items, "create").await
    }

    /// Delete leaf-list entries under the node addressed by `xpath`.
    pub async fn edit_config_delete_list_items(
        &self,
        xpath: &str,
        items: &[Value],
    ) -> Result<Envelope> {
        self.edit_config_list_items(xpath, items, "delete").await
    }

    /// Invoke an arbitrary RPC addressed by a strict XPath, with `values`
    /// deep-merged into the innermost element.
    ///
    /// Like the edit operations, this fails in read-only mode.
    pub async fn rpc(&self, xpath: &str, values: &Value) -> Result<Envelope> {
        if self.config.read_only {
            return Err(ClientError::ReadOnly.into());
        }
        validate_for_build(xpath).map_err(Error::Resolve)?;

        let build = build_strict(xpath, &self.config.namespaces, None).ok_or_else(|| {
            ResolveError::InvalidXPath(format!("'{}' is not a strict XPath", xpath))
        })?;
        let BuildResult { mut doc, paths } = build;
        if let Some(node) = doc.get_path_mut(&paths[0]) {
            node.deep_merge(values);
        }

        self.session.request(doc).await
    }

    /// Open a notification subscription.
    ///
    /// The returned stream yields the `ok` reply first, then each
    /// notification in wire order, and completes when `cancel` fires.
    pub async fn subscription(
        &self,
        option: SubscriptionOption,
        cancel: CancellationToken,
    ) -> Result<ReplyStream> {
        let mut create = Value::empty_map();
        create.set_attr("xmlns", NOTIFICATION_NS);
        match option {
            SubscriptionOption::XPath(xpath) => {
                let mut filter = Value::empty_map();
                filter.set_attr("type", "xpath");
                filter.set_attr("select", xpath);
                create.insert("filter", filter);
            }
            SubscriptionOption::Stream(stream) => {
                create.insert("stream", Value::String(stream));
            }
        }

        self.session
            .request_streaming(Value::map([("create-subscription", create)]), cancel)
            .await
    }

    /// Orderly session teardown. See [`Session::close`].
    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }

    /// Whether the session has reached `Ready` and not yet closed.
    pub fn is_open(&self) -> bool {
        self.session.state() == SessionState::Ready
    }

    async fn edit_config(
        &self,
        xpath: &str,
        values: &Value,
        operation: EditOperation,
    ) -> Result<Envelope> {
        if self.config.read_only {
            return Err(ClientError::ReadOnly.into());
        }
        validate_for_build(xpath).map_err(Error::Resolve)?;

        let BuildResult { mut doc, paths } = self.resolve_edit_target(xpath).await?;
        for path in &paths {
            // Paths point into the document the resolver just built.
            let node = doc.get_path_mut(path).unwrap();
            node.deep_merge(values);
            match &operation {
                EditOperation::Merge => {}
                EditOperation::Create { before_key } => {
                    node.set_attr("xmlns:nc", BASE_NS);
                    node.set_attr("nc:operation", "create");
                    if let Some(key) = before_key {
                        node.set_attr("xmlns:yang", YANG_NS);
                        node.set_attr("yang:insert", "before");
                        node.set_attr("yang:key", key.clone());
                    }
                }
                EditOperation::Delete => {
                    node.set_attr("xmlns:nc", BASE_NS);
                    node.set_attr("nc:operation", "delete");
                }
            }
        }

        self.submit_edit(doc).await
    }

    async fn edit_config_list_items(
        &self,
        xpath: &str,
        items: &[Value],
        operation: &str,
    ) -> Result<Envelope> {
        if self.config.read_only {
            return Err(ClientError::ReadOnly.into());
        }
        validate_for_build(xpath).map_err(Error::Resolve)?;

        let entries: Vec<Value> = items
            .iter()
            .map(|item| {
                let mut entry = Value::empty_map();
                entry.set_attr("xmlns:nc", BASE_NS);
                entry.set_attr("nc:operation", operation);
                entry.insert(TEXT, item.clone());
                entry
            })
            .collect();

        let BuildResult { mut doc, paths } = self.resolve_edit_target(xpath).await?;
        for path in &paths {
            // The addressed child becomes the list of marked entries.
            *doc.get_path_mut(path).unwrap() = Value::List(entries.clone());
        }

        self.submit_edit(doc).await
    }

    /// Build the edit-config target document: strict XPath when possible,
    /// schema-guided otherwise. Enforces the multiplicity policy.
    async fn resolve_edit_target(&self, xpath: &str) -> Result<BuildResult> {
        let result = if is_strict_candidate(xpath) {
            match build_strict(xpath, &self.config.namespaces, None) {
                Some(mut result) => {
                    // The guessed namespace is fetched lazily, only when
                    // nothing was configured.
                    if matches!(self.config.namespaces, Namespaces::None) {
                        if let Some(uri) = self.guess_namespace(xpath).await {
                            if let Some(first) = result.paths[0].first() {
                                if let Some(node) = result.doc.get_mut(first) {
                                    node.set_attr("xmlns", uri);
                                }
                            }
                        }
                    }
                    result
                }
                None => self.resolve_with_schema(xpath).await?,
            }
        } else {
            self.resolve_with_schema(xpath).await?
        };

        if result.paths.is_empty() {
            return Err(ResolveError::NoMatch.into());
        }
        if result.paths.len() > 1 && !self.config.allow_multiple_edit {
            return Err(ResolveError::MultipleEdit.into());
        }
        Ok(result)
    }

    async fn resolve_with_schema(&self, xpath: &str) -> Result<BuildResult> {
        let schema = self.fetch_data("/", Some(DataKind::Schema)).await?.result;
        if !schema.as_map().is_some_and(|m| !m.is_empty()) {
            return Err(ClientError::EmptySchema.into());
        }
        Ok(build_with_schema(&schema, xpath, &self.config.namespaces))
    }

    /// Probe the server for the namespace of the XPath's first segment by
    /// asking for its depth-1 skeleton. Best effort: any failure means no
    /// namespace is injected.
    async fn guess_namespace(&self, xpath: &str) -> Option<String> {
        let first = xpath
            .split('/')
            .find(|s| !s.is_empty())?
            .split('[')
            .next()?
            .to_string();

        let envelope = self
            .fetch_data(&format!("/{}", first), Some(DataKind::Schema))
            .await
            .ok()?;
        let uri = envelope
            .result
            .get(&first)?
            .get_path(&[ATTRS, "xmlns"])?
            .as_str()?
            .to_string();
        debug!("guessed namespace {} for /{}", uri, first);
        Some(uri)
    }

    /// The shared get/get-data path: request, unwrap `rpc-reply.data`,
    /// prune to the addressed node.
    async fn fetch_data(&self, xpath: &str, kind: Option<DataKind>) -> Result<Envelope> {
        let body = match kind {
            None => {
                let mut filter = Value::empty_map();
                filter.set_attr("type", "xpath");
                filter.set_attr("select", xpath);
                Value::map([("get", Value::map([("filter", filter)]))])
            }
            Some(kind) => {
                let mut get_data = Value::empty_map();
                get_data.set_attr("xmlns", NMDA_NS);
                get_data.set_attr("xmlns:ds", DATASTORES_NS);
                get_data.insert("datastore", Value::from("ds:operational"));
                get_data.insert("xpath-filter", Value::from(xpath));
                match kind {
                    DataKind::Schema => {
                        get_data.insert("max-depth", Value::Int(1));
                    }
                    DataKind::Config => {
                        get_data.insert("config-filter", Value::from(true));
                        get_data.insert("with-defaults", Value::from("report-all"));
                    }
                    DataKind::State => {
                        get_data.insert("config-filter", Value::from(false));
                        get_data.insert("with-defaults", Value::from("report-all"));
                    }
                }
                Value::map([("get-data", get_data)])
            }
        };

        let envelope = self.session.request(body).await?;
        let data = envelope
            .result
            .get_path(&["rpc-reply", "data"])
            .cloned()
            .unwrap_or(Value::Null);
        Ok(Envelope::new(envelope.xml, resolve_xpath(&data, xpath)))
    }

    async fn submit_edit(&self, config_doc: Value) -> Result<Envelope> {
        let body = Value::map([(
            "edit-config",
            Value::map([
                ("target", Value::map([("running", Value::Null)])),
                ("config", config_doc),
            ]),
        )]);

        let envelope = self.session.request(body).await?;
        if envelope.result.get_path(&["rpc-reply", "ok"]).is_none() {
            return Err(ClientError::MissingOk.into());
        }
        Ok(envelope)
    }
}

/// Drop attribute mappings from a schema response's first levels; the
/// caller gets the bare skeleton.
fn strip_top_level_attrs(data: &mut Value) {
    if let Some(map) = data.as_map_mut() {
        map.shift_remove(ATTRS);
        for (_, child) in map.iter_mut() {
            if let Some(child_map) = child.as_map_mut() {
                child_map.shift_remove(ATTRS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use crate::framer::DELIMITER;

    const SERVER_HELLO: &str = concat!(
        r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">"#,
        "<capabilities>",
        "<capability>urn:ietf:params:netconf:base:1.0</capability>",
        "</capabilities>",
        "<session-id>1</session-id>",
        "</hello>]]>]]>"
    );

    fn test_config() -> ConnectionConfig {
        ConnectionConfig::new("test").with_timeout(Duration::from_secs(5))
    }

    async fn read_message(io: &mut DuplexStream) -> String {
        let mut collected = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            if let Some(pos) = collected
                .windows(DELIMITER.len())
                .position(|w| w == DELIMITER)
            {
                let message = String::from_utf8(collected[..pos].to_vec()).unwrap();
                return message;
            }
            let n = io.read(&mut buf).await.unwrap();
            assert!(n > 0, "peer closed while a message was expected");
            collected.extend_from_slice(&buf[..n]);
        }
    }

    async fn client_over_duplex(config: ConnectionConfig) -> (Client, DuplexStream) {
        let (client_io, mut server_io) = tokio::io::duplex(64 * 1024);
        let handshake = tokio::spawn(async move {
            read_message(&mut server_io).await;
            server_io.write_all(SERVER_HELLO.as_bytes()).await.unwrap();
            server_io
        });
        let session = Session::over_stream(config.clone(), client_io).await.unwrap();
        let client = Client { session, config };
        (client, handshake.await.unwrap())
    }

    #[tokio::test]
    async fn test_read_only_rejects_edit_and_rpc() {
        let config = test_config().with_read_only(true);
        let client = Client::new(config);

        let values = Value::map([("mtu", Value::Int(9000))]);
        let err = client
            .edit_config_merge("/interfaces/interface", &values)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Client error: Operation not performed: in read-only mode"
        );

        // rpc() follows the same convention and throws.
        let err = client.rpc("/reboot", &Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn test_edit_rejects_invalid_xpath_before_io() {
        let client = Client::new(test_config());
        for xpath in ["", "/", "//", "/a|/b"] {
            let err = client
                .edit_config_merge(xpath, &Value::Null)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Resolve(ResolveError::InvalidXPath(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_edit_config_merge_builds_and_sends() {
        let config = test_config().with_namespace("http://x");
        let (client, mut server_io) = client_over_duplex(config).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains("<edit-config><target><running/></target><config>"));
            assert!(rpc.contains(r#"<interfaces xmlns="http://x">"#));
            assert!(rpc.contains("<name>eth1</name>"));
            assert!(rpc.contains("<mtu>9000</mtu>"));
            server_io
                .write_all(br#"<rpc-reply message-id="1"><ok/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        let values = Value::map([("mtu", Value::Int(9000))]);
        let envelope = client
            .edit_config_merge(r#"/interfaces/interface[name="eth1"]"#, &values)
            .await
            .unwrap();
        assert!(envelope.result.get_path(&["rpc-reply", "ok"]).is_some());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_config_create_sets_operation_markers() {
        let config = test_config().with_namespace("http://x");
        let (client, mut server_io) = client_over_duplex(config).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains(r#"xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0""#));
            assert!(rpc.contains(r#"nc:operation="create""#));
            assert!(rpc.contains(r#"xmlns:yang="urn:ietf:params:xml:ns:yang:1""#));
            assert!(rpc.contains(r#"yang:insert="before""#));
            assert!(rpc.contains(r#"yang:key="eth9""#));
            server_io
                .write_all(br#"<rpc-reply message-id="1"><ok/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        let values = Value::map([("name", Value::from("eth1"))]);
        client
            .edit_config_create("/interfaces/interface", &values, Some("eth9"))
            .await
            .unwrap();
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_config_without_ok_fails() {
        let config = test_config().with_namespace("http://x");
        let (client, mut server_io) = client_over_duplex(config).await;

        let server = tokio::spawn(async move {
            read_message(&mut server_io).await;
            server_io
                .write_all(br#"<rpc-reply message-id="1"><data/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        let err = client
            .edit_config_delete("/interfaces/interface", &Value::Null)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Client error: server response did not include OK"
        );
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_config_list_items() {
        let config = test_config().with_namespace("http://x");
        let (client, mut server_io) = client_over_duplex(config).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains(r#"nc:operation="create">dns1</member>"#));
            assert!(rpc.contains(r#"nc:operation="create">dns2</member>"#));
            server_io
                .write_all(br#"<rpc-reply message-id="1"><ok/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        client
            .edit_config_create_list_items(
                "/system/servers/member",
                &[Value::from("dns1"), Value::from("dns2")],
            )
            .await
            .unwrap();
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_get_data_prunes_to_addressed_node() {
        let (client, mut server_io) = client_over_duplex(test_config()).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains(r#"<filter type="xpath" select="/a/b"/>"#));
            server_io
                .write_all(
                    br#"<rpc-reply message-id="1"><data><a><b><c>3</c></b></a></data></rpc-reply>]]>]]>"#,
                )
                .await
                .unwrap();
            server_io
        });

        let envelope = client.get_data("/a/b", None).await.unwrap();
        assert_eq!(
            envelope.result,
            Value::map([("b", Value::map([("c", Value::Int(3))]))])
        );
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_get_data_state_uses_nmda() {
        let (client, mut server_io) = client_over_duplex(test_config()).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains(r#"xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-nmda""#));
            assert!(rpc.contains("<datastore>ds:operational</datastore>"));
            assert!(rpc.contains("<config-filter>false</config-filter>"));
            assert!(rpc.contains("<with-defaults>report-all</with-defaults>"));
            server_io
                .write_all(br#"<rpc-reply message-id="1"><data><s><up>true</up></s></data></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        let envelope = client.get_data("/s", Some(DataKind::State)).await.unwrap();
        assert!(envelope.result.get("s").is_some());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_get_data_schema_strips_attributes() {
        let (client, mut server_io) = client_over_duplex(test_config()).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains("<max-depth>1</max-depth>"));
            server_io
                .write_all(
                    br#"<rpc-reply message-id="1"><data><root xmlns="http://m"><leaf/></root></data></rpc-reply>]]>]]>"#,
                )
                .await
                .unwrap();
            server_io
        });

        let envelope = client.get_data("/", Some(DataKind::Schema)).await.unwrap();
        assert_eq!(envelope.result.get_path(&["root", ATTRS]), None);
        assert!(envelope.result.get_path(&["root", "leaf"]).is_some());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_wildcard_edit_multiple_branches_rejected() {
        // allow_multiple_edit is false: two schema branches for the same
        // wildcard must fail with the distinguished error.
        let config = test_config().with_namespace("http://x");
        let (client, mut server_io) = client_over_duplex(config).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains("get-data"));
            server_io
                .write_all(
                    concat!(
                        r#"<rpc-reply message-id="1"><data>"#,
                        "<top><one><wildcard><key/></wildcard></one>",
                        "<two><wildcard><key/></wildcard></two></top>",
                        "</data></rpc-reply>]]>]]>"
                    )
                    .as_bytes(),
                )
                .await
                .unwrap();
            server_io
        });

        let err = client
            .edit_config_merge("//wildcard/key", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolve(ResolveError::MultipleEdit)));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_wildcard_edit_multiple_branches_allowed() {
        let config = test_config()
            .with_namespace("http://x")
            .with_allow_multiple_edit(true);
        let (client, mut server_io) = client_over_duplex(config).await;

        let server = tokio::spawn(async move {
            read_message(&mut server_io).await;
            server_io
                .write_all(
                    concat!(
                        r#"<rpc-reply message-id="1"><data>"#,
                        "<top><one><wildcard><key/></wildcard></one>",
                        "<two><wildcard><key/></wildcard></two></top>",
                        "</data></rpc-reply>]]>]]>"
                    )
                    .as_bytes(),
                )
                .await
                .unwrap();
            let edit = read_message(&mut server_io).await;
            // Both branches are present in the submitted document.
            assert!(edit.contains("<one><wildcard><key>v</key></wildcard></one>"));
            assert!(edit.contains("<two><wildcard><key>v</key></wildcard></two>"));
            server_io
                .write_all(br#"<rpc-reply message-id="2"><ok/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        client
            .edit_config_merge("//wildcard/key", &Value::from("v"))
            .await
            .unwrap();
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_rpc_strict_build_and_merge() {
        let (client, mut server_io) = client_over_duplex(test_config()).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains("<ping><destination>192.0.2.9</destination></ping>"));
            server_io
                .write_all(br#"<rpc-reply message-id="1"><result>ok</result></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        let values = Value::map([("destination", Value::from("192.0.2.9"))]);
        let envelope = client.rpc("/ping", &values).await.unwrap();
        assert_eq!(
            envelope.result.get_path(&["rpc-reply", "result"]),
            Some(&Value::String("ok".into()))
        );
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_subscription_emits_reply_then_notifications() {
        let (client, mut server_io) = client_over_duplex(test_config()).await;

        let server = tokio::spawn(async move {
            let rpc = read_message(&mut server_io).await;
            assert!(rpc.contains(
                r#"<create-subscription xmlns="urn:ietf:params:xml:ns:netconf:notification:1.0">"#
            ));
            assert!(rpc.contains(r#"<filter type="xpath" select="/alarms"/>"#));
            server_io
                .write_all(br#"<rpc-reply message-id="1"><ok/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
                .write_all(
                    b"<notification><eventTime>t1</eventTime><alarm>minor</alarm></notification>]]>]]>",
                )
                .await
                .unwrap();
            server_io
        });

        let cancel = CancellationToken::new();
        let mut stream = client
            .subscription(
                SubscriptionOption::XPath("/alarms".to_string()),
                cancel.clone(),
            )
            .await
            .unwrap();

        let reply = stream.next().await.unwrap().unwrap();
        assert!(reply.result.get_path(&["rpc-reply", "ok"]).is_some());
        let notification = stream.next().await.unwrap().unwrap();
        assert_eq!(
            notification.result.get_path(&["notification", "alarm"]),
            Some(&Value::String("minor".into()))
        );

        cancel.cancel();
        assert!(stream.next().await.unwrap().is_none());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_guessed_namespace_applied_to_strict_edit() {
        let (client, mut server_io) = client_over_duplex(test_config()).await;

        let server = tokio::spawn(async move {
            // First request: the schema probe for /system.
            let probe = read_message(&mut server_io).await;
            assert!(probe.contains("<max-depth>1</max-depth>"));
            assert!(probe.contains("<xpath-filter>/system</xpath-filter>"));
            server_io
                .write_all(
                    br#"<rpc-reply message-id="1"><data><system xmlns="http://guessed"><hostname/></system></data></rpc-reply>]]>]]>"#,
                )
                .await
                .unwrap();

            // Second request: the edit itself, carrying the guess.
            let edit = read_message(&mut server_io).await;
            assert!(edit
                .contains(r#"<system xmlns="http://guessed"><hostname>edge1</hostname></system>"#));
            server_io
                .write_all(br#"<rpc-reply message-id="2"><ok/></rpc-reply>]]>]]>"#)
                .await
                .unwrap();
            server_io
        });

        let values = Value::map([("hostname", Value::from("edge1"))]);
        client
            .edit_config_merge("/system", &values)
            .await
            .unwrap();
        drop(server.await.unwrap());
    }
}
