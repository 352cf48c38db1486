//! SSH transport implementation using russh.

use std::sync::Arc;

use log::debug;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::ChannelStream;

use super::config::ConnectionConfig;
use crate::error::{Result, TransportError};

/// SSH transport wrapping a russh client with the `netconf` subsystem.
///
/// The transport is a pure byte pipe: it neither frames nor parses the
/// payload. [`open`](Self::open) yields the duplex byte stream of the
/// subsystem channel; the handle is kept only for the final disconnect.
pub struct SshTransport {
    session: Handle<SshHandler>,
}

impl SshTransport {
    /// Connect, authenticate, and open the `netconf` subsystem.
    ///
    /// A single ready-timeout (`config.timeout`) spans TCP connect, SSH
    /// authentication, and subsystem open.
    pub async fn open(config: &ConnectionConfig) -> Result<(Self, ChannelStream<Msg>)> {
        let ssh_config = Arc::new(client::Config::default());
        let addr = (config.host.as_str(), config.port);

        let opened = tokio::time::timeout(config.timeout, async {
            let mut session = client::connect(ssh_config, addr, SshHandler)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    message: e.to_string(),
                })?;

            let auth = session
                .authenticate_password(&config.username, &config.password)
                .await
                .map_err(TransportError::Ssh)?;
            if !auth.success() {
                return Err(TransportError::AuthenticationFailed {
                    user: config.username.clone(),
                });
            }

            let channel = session
                .channel_open_session()
                .await
                .map_err(TransportError::Ssh)?;
            channel
                .request_subsystem(true, "netconf")
                .await
                .map_err(|e| TransportError::SubsystemFailed(e.to_string()))?;

            debug!("netconf subsystem open on {}", config.socket_addr());
            Ok((Self { session }, channel.into_stream()))
        })
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))??;

        Ok(opened)
    }

    /// Disconnect the SSH session.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
///
/// NETCONF endpoints are typically addressed by IP inside managed
/// networks; the server key is accepted as-is.
struct SshHandler;

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}
