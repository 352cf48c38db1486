//! Streaming reply handle: one `rpc-reply`, then notifications.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::demux::{Incoming, Shared};
use super::response::Envelope;
use crate::codec::extract_error;
use crate::error::{Error, ProtocolError, Result, SessionError};

/// Pull-based handle for a streaming request (a subscription).
///
/// Created by [`Session::request_streaming`](super::Session::request_streaming).
/// Call [`next`](Self::next) in a loop: the first value is the request's
/// `rpc-reply`, every following value is a `notification`, in wire order.
/// `Ok(None)` means the stream is finished (the cancellation token fired).
///
/// The reply timeout applies to the first value only; notifications can be
/// arbitrarily far apart. Dropping the handle detaches the waiter from the
/// session, so no buffering happens for abandoned streams.
pub struct ReplyStream {
    rx: mpsc::UnboundedReceiver<Incoming>,
    shared: Arc<Shared>,
    id: u64,
    cancel: CancellationToken,
    first_reply_timeout: Duration,
    awaiting_first: bool,
    finished: bool,
}

impl ReplyStream {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Incoming>,
        shared: Arc<Shared>,
        id: u64,
        cancel: CancellationToken,
        first_reply_timeout: Duration,
    ) -> Self {
        Self {
            rx,
            shared,
            id,
            cancel,
            first_reply_timeout,
            awaiting_first: true,
            finished: false,
        }
    }

    /// The next envelope, or `Ok(None)` once the stream has completed.
    ///
    /// A cancellation signal is observed before the next emission: once the
    /// token fires, the waiter is detached and no further values are
    /// produced.
    pub async fn next(&mut self) -> Result<Option<Envelope>> {
        if self.finished {
            return Ok(None);
        }

        let cancel = self.cancel.clone();
        let incoming = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("stream {}: cancelled", self.id);
                self.finish();
                return Ok(None);
            }
            incoming = self.recv_one() => incoming?,
        };

        match incoming {
            Incoming::Reply(envelope) => {
                if self.awaiting_first {
                    self.awaiting_first = false;
                    if let Some(rpc_error) = extract_error(&envelope.result) {
                        self.finish();
                        return Err(ProtocolError::Rpc(rpc_error).into());
                    }
                }
                Ok(Some(envelope))
            }
            Incoming::Notification(envelope) => Ok(Some(envelope)),
            Incoming::Fatal(reason) => {
                self.finish();
                Err(SessionError::Closed { reason }.into())
            }
        }
    }

    async fn recv_one(&mut self) -> Result<Incoming> {
        let received = if self.awaiting_first {
            match tokio::time::timeout(self.first_reply_timeout, self.rx.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    let timeout = self.first_reply_timeout;
                    self.finish();
                    return Err(SessionError::RequestTimeout(timeout).into());
                }
            }
        } else {
            self.rx.recv().await
        };

        match received {
            Some(incoming) => Ok(incoming),
            None => {
                self.finish();
                Err(Error::Session(SessionError::closed()))
            }
        }
    }

    /// Signal the stream to stop; observed before the next emission.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// The cancellation token driving this stream.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.shared.detach(self.id);
    }
}

impl Drop for ReplyStream {
    fn drop(&mut self) {
        self.shared.detach(self.id);
    }
}
