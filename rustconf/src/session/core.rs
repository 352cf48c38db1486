//! The NETCONF session: handshake, request/reply correlation, lifecycle.

use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::demux::{self, Incoming, SessionState, Shared};
use super::response::{Envelope, ServerHello};
use super::stream::ReplyStream;
use crate::codec::{classify, decode, encode, extract_error, MessageClass};
use crate::error::{Error, ProtocolError, Result, SessionError, TransportError};
use crate::framer::{Framer, DELIMITER};
use crate::transport::{ConnectionConfig, SshTransport};
use crate::value::Value;

/// The NETCONF base namespace; every `<rpc>` and the client hello carry it.
pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// The URN form of the base capability, advertised alongside [`BASE_NS`].
pub const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.0";

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// A NETCONF session over an SSH `netconf` subsystem channel.
///
/// The session owns the transport, the framer, and the codec use: the
/// composition behind [`Client`](crate::Client). It is created without
/// performing I/O; the first call that needs the wire drives
/// `Uninitialized → Connecting → Ready` (SSH connect, subsystem open,
/// hello exchange). All request correlation is by `message-id`: a single
/// demultiplexer task reads and frames the channel and routes each reply
/// to its waiter, so any number of requests may be in flight at once.
pub struct Session {
    config: ConnectionConfig,
    shared: Arc<Shared>,
    connect_lock: tokio::sync::Mutex<()>,
    writer: tokio::sync::Mutex<Option<Writer>>,
    transport: Mutex<Option<SshTransport>>,
    server_hello: OnceLock<ServerHello>,
    demux_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session. No I/O happens until the first request.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new()),
            connect_lock: tokio::sync::Mutex::new(()),
            writer: tokio::sync::Mutex::new(None),
            transport: Mutex::new(None),
            server_hello: OnceLock::new(),
            demux_task: Mutex::new(None),
        }
    }

    /// Create a session over an already-established duplex byte stream and
    /// run the hello handshake on it immediately.
    ///
    /// This is how tests drive a session without a server; it also admits
    /// alternative transports that speak NETCONF framing.
    pub async fn over_stream<S>(config: ConnectionConfig, stream: S) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let session = Self::new(config);
        {
            let _guard = session.connect_lock.lock().await;
            session.handshake(stream).await?;
        }
        Ok(session)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The server hello, once the handshake has completed.
    pub fn server_hello(&self) -> Option<&ServerHello> {
        self.server_hello.get()
    }

    /// The server-assigned session-id, once ready.
    pub fn session_id(&self) -> Option<i64> {
        self.server_hello.get().map(|h| h.session_id)
    }

    /// The server's advertised capabilities, once ready.
    pub fn capabilities(&self) -> Option<&[String]> {
        self.server_hello.get().map(|h| h.capabilities.as_slice())
    }

    /// Connect if necessary and return the server-hello envelope.
    pub async fn hello(&self) -> Result<Envelope> {
        self.ensure_ready().await?;
        // ensure_ready only returns Ok once the hello is captured.
        Ok(self.server_hello.get().unwrap().envelope.clone())
    }

    /// Send one RPC and await its single reply.
    ///
    /// `body` is the operation subtree (e.g. `{get: …}`); the session
    /// wraps it in `<rpc>` with the base namespace and the next
    /// `message-id`. An `rpc-error` reply surfaces as
    /// [`ProtocolError::Rpc`]. The reply timeout is `config.timeout`; on
    /// expiry only this request fails; the session stays open as long as
    /// the channel is healthy.
    pub async fn request(&self, body: Value) -> Result<Envelope> {
        self.ensure_ready().await?;
        let (id, mut rx) = self.send_rpc(body, false).await?;

        let received = tokio::time::timeout(self.config.timeout, rx.recv()).await;
        self.shared.detach(id);
        match received {
            Err(_) => Err(SessionError::RequestTimeout(self.config.timeout).into()),
            Ok(None) => Err(Error::Session(SessionError::closed())),
            Ok(Some(Incoming::Fatal(reason))) => Err(SessionError::Closed { reason }.into()),
            Ok(Some(Incoming::Notification(_))) => {
                // Notifications are routed to streaming waiters only.
                Err(ProtocolError::UnexpectedMessage(
                    "notification delivered to a plain request".to_string(),
                )
                .into())
            }
            Ok(Some(Incoming::Reply(envelope))) => match extract_error(&envelope.result) {
                Some(rpc_error) => Err(ProtocolError::Rpc(rpc_error).into()),
                None => Ok(envelope),
            },
        }
    }

    /// Send one RPC and keep listening: the returned stream yields the
    /// reply, then every subsequent `notification` until `cancel` fires.
    pub async fn request_streaming(
        &self,
        body: Value,
        cancel: CancellationToken,
    ) -> Result<ReplyStream> {
        self.ensure_ready().await?;
        let (id, rx) = self.send_rpc(body, true).await?;
        Ok(ReplyStream::new(
            rx,
            self.shared.clone(),
            id,
            cancel,
            self.config.timeout,
        ))
    }

    /// Orderly teardown: best-effort `close-session` RPC (errors ignored,
    /// capped by the session timeout), then detach the demultiplexer, end
    /// SSH, and resolve every pending waiter with an "SSH session closed"
    /// error.
    ///
    /// Returns [`SessionError::NotOpened`] only for a session that never
    /// connected; closing an already-closed session is a no-op.
    pub async fn close(&self) -> Result<()> {
        match self.shared.state() {
            SessionState::Uninitialized => return Err(SessionError::NotOpened.into()),
            SessionState::Closed => return Ok(()),
            SessionState::Connecting | SessionState::Ready => {}
        }

        let body = Value::map([("close-session", Value::Null)]);
        if let Err(e) = self.request(body).await {
            debug!("close-session: {}", e);
        }

        self.shared.fail_all("SSH session closed");
        if let Some(task) = self.demux_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        let transport = self.transport.lock().unwrap().take();
        if let Some(transport) = transport {
            let _ = transport.close().await;
        }
        Ok(())
    }

    async fn ensure_ready(&self) -> Result<()> {
        match self.shared.state() {
            SessionState::Ready => return Ok(()),
            SessionState::Closed => return Err(Error::Session(SessionError::closed())),
            _ => {}
        }

        let _guard = self.connect_lock.lock().await;
        // Re-check: another caller may have connected while we waited.
        match self.shared.state() {
            SessionState::Ready => return Ok(()),
            SessionState::Closed => return Err(Error::Session(SessionError::closed())),
            _ => {}
        }

        let (transport, stream) = SshTransport::open(&self.config).await.inspect_err(|e| {
            self.shared.fail_all(&e.to_string());
        })?;
        *self.transport.lock().unwrap() = Some(transport);
        self.handshake(stream).await
    }

    /// Write the client hello, wait for a well-formed server hello, then
    /// start the demultiplexer. Caller holds `connect_lock`.
    async fn handshake<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        self.shared.transition(SessionState::Connecting);
        let (reader, writer) = tokio::io::split(stream);
        let mut reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let mut writer: Writer = Box::new(writer);

        let hello_xml = client_hello_xml();
        trace!("send hello: {}", hello_xml);

        let handshake = async {
            writer
                .write_all(hello_xml.as_bytes())
                .await
                .map_err(TransportError::Io)?;
            writer
                .write_all(DELIMITER)
                .await
                .map_err(TransportError::Io)?;
            writer.flush().await.map_err(TransportError::Io)?;

            // Accumulate frames until one parses as a hello carrying a
            // session-id.
            let mut framer = Framer::new();
            let mut buf = vec![0u8; 8192];
            loop {
                while let Some(raw) = framer.extract() {
                    let xml = String::from_utf8_lossy(&raw).into_owned();
                    match classify(&xml) {
                        MessageClass::Hello => {
                            let tree = decode(&xml, self.config.ignore_attributes)
                                .map_err(|e| SessionError::MalformedHello(e.to_string()))?;
                            let hello = ServerHello::parse(&xml, tree).map_err(Error::Session)?;
                            return Ok((framer, hello));
                        }
                        other => {
                            debug!("handshake: skipping {:?} frame", other);
                        }
                    }
                }

                let n = reader.read(&mut buf).await.map_err(TransportError::Io)?;
                if n == 0 {
                    return Err(Error::Session(SessionError::Closed {
                        reason: "SSH session closed during handshake".to_string(),
                    }));
                }
                framer.append(&buf[..n]).map_err(Error::Protocol)?;
            }
        };

        let (framer, hello) = match tokio::time::timeout(self.config.timeout, handshake).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                self.shared.fail_all(&e.to_string());
                return Err(e);
            }
            Err(_) => {
                let e = Error::Session(SessionError::HandshakeTimeout(self.config.timeout));
                self.shared.fail_all(&e.to_string());
                return Err(e);
            }
        };

        debug!(
            "hello exchanged: session-id {} with {} capabilities",
            hello.session_id,
            hello.capabilities.len()
        );
        let _ = self.server_hello.set(hello);
        *self.writer.lock().await = Some(writer);

        // Leftover bytes buffered during the handshake carry over into the
        // demultiplexer's framer.
        let shared = self.shared.clone();
        let ignore_attributes = self.config.ignore_attributes;
        let task = tokio::spawn(demux::run(reader, framer, shared, ignore_attributes));
        *self.demux_task.lock().unwrap() = Some(task);

        self.shared.transition(SessionState::Ready);
        Ok(())
    }

    /// Encode and write one `<rpc>`, registering its waiter first so the
    /// reply cannot race the registration.
    async fn send_rpc(
        &self,
        body: Value,
        streaming: bool,
    ) -> Result<(u64, mpsc::UnboundedReceiver<Incoming>)> {
        let id = self.shared.next_message_id();

        let mut rpc = Value::empty_map();
        rpc.set_attr("xmlns", BASE_NS);
        rpc.set_attr("message-id", id.to_string());
        if let Value::Map(entries) = body {
            for (name, value) in entries {
                rpc.insert(name, value);
            }
        }
        let xml = encode(&Value::map([("rpc", rpc)]));
        trace!("send rpc {}: {}", id, xml);

        let rx = self.shared.register(id, streaming);

        let mut writer_guard = self.writer.lock().await;
        let Some(writer) = writer_guard.as_mut() else {
            self.shared.detach(id);
            return Err(Error::Session(SessionError::closed()));
        };
        let written = async {
            writer.write_all(xml.as_bytes()).await?;
            writer.write_all(DELIMITER).await?;
            writer.flush().await
        }
        .await;
        drop(writer_guard);

        if let Err(e) = written {
            self.shared.detach(id);
            let reason = format!("SSH write error: {}", e);
            self.shared.fail_all(&reason);
            return Err(SessionError::Closed { reason }.into());
        }
        Ok((id, rx))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.demux_task.lock().unwrap().take() {
            task.abort();
        }
        if self.shared.state() == SessionState::Ready {
            warn!("Session dropped while ready - close() was not called");
        }
    }
}

/// The client hello advertising the base capability in both of its forms.
fn client_hello_xml() -> String {
    let mut hello = Value::empty_map();
    hello.set_attr("xmlns", BASE_NS);
    hello.insert(
        "capabilities",
        Value::map([(
            "capability",
            Value::list([Value::from(BASE_NS), Value::from(BASE_CAPABILITY)]),
        )]),
    );
    encode(&Value::map([("hello", hello)]))
}
