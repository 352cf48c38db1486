//! Shared demultiplexer: one read task routes framed messages to
//! per-request waiters by `message-id`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use log::{debug, trace, warn};
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use super::response::Envelope;
use crate::codec::{classify, decode, MessageClass};
use crate::framer::Framer;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no I/O performed yet.
    Uninitialized,

    /// SSH connect / subsystem open / hello exchange in progress.
    Connecting,

    /// Hello exchanged; requests may be written.
    Ready,

    /// Terminal. Entered exactly once, by `close()` or a fatal error.
    Closed,
}

/// A routed message, delivered to a request's waiter channel.
#[derive(Debug)]
pub enum Incoming {
    /// The `rpc-reply` correlated to the waiter's message-id.
    Reply(Envelope),

    /// A `notification`, delivered to the streaming waiter only.
    Notification(Envelope),

    /// The session died; `String` is the fatal error's message.
    Fatal(String),
}

/// State shared between the session handle and the demux task.
pub struct Shared {
    state: Mutex<SessionState>,
    /// Next message-id; monotonic, never reused within a session.
    message_id: AtomicU64,
    waiters: Mutex<HashMap<u64, mpsc::UnboundedSender<Incoming>>>,
    /// Waiter currently entitled to notifications, if any.
    streaming: Mutex<Option<u64>>,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Uninitialized),
            message_id: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
            streaming: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Transition to a new state. The `Closed` transition happens at most
    /// once; later attempts are ignored and reported as `false`.
    pub fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Closed {
            return false;
        }
        trace!("session state {:?} -> {:?}", *state, next);
        *state = next;
        true
    }

    /// Allocate the next message-id.
    pub fn next_message_id(&self) -> u64 {
        self.message_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a waiter for `id`. A streaming waiter also receives
    /// notifications after its reply.
    pub fn register(&self, id: u64, streaming: bool) -> mpsc::UnboundedReceiver<Incoming> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.waiters.lock().unwrap().insert(id, tx);
        if streaming {
            *self.streaming.lock().unwrap() = Some(id);
        }
        rx
    }

    /// Detach a waiter (request complete, timed out, or cancelled).
    pub fn detach(&self, id: u64) {
        self.waiters.lock().unwrap().remove(&id);
        let mut streaming = self.streaming.lock().unwrap();
        if *streaming == Some(id) {
            *streaming = None;
        }
    }

    fn dispatch_reply(&self, id: u64, envelope: Envelope) {
        match self.waiters.lock().unwrap().get(&id) {
            Some(tx) => {
                let _ = tx.send(Incoming::Reply(envelope));
            }
            None => debug!("discarding rpc-reply for unknown message-id {}", id),
        }
    }

    fn dispatch_notification(&self, envelope: Envelope) {
        let streaming = *self.streaming.lock().unwrap();
        let waiter = streaming.and_then(|id| self.waiters.lock().unwrap().get(&id).cloned());
        match waiter {
            Some(tx) => {
                let _ = tx.send(Incoming::Notification(envelope));
            }
            None => debug!("discarding notification: no subscription active"),
        }
    }

    /// Enter `Closed` and resolve every outstanding waiter with `reason`.
    /// Idempotent: only the first call does anything.
    pub fn fail_all(&self, reason: &str) {
        if !self.transition(SessionState::Closed) {
            return;
        }
        let mut waiters = self.waiters.lock().unwrap();
        debug!(
            "session closed ({}); resolving {} pending waiter(s)",
            reason,
            waiters.len()
        );
        for (_, tx) in waiters.drain() {
            let _ = tx.send(Incoming::Fatal(reason.to_string()));
        }
        *self.streaming.lock().unwrap() = None;
    }
}

fn message_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<(?:[\w.-]+:)?rpc-reply[^>]*\bmessage-id\s*=\s*"(\d+)""#).unwrap())
}

/// Route one framed message.
///
/// Replies are matched by a `message-id` regex on the raw text before the
/// full parse, so unmatchable messages are rejected cheaply.
pub fn route_message(shared: &Shared, raw: &[u8], ignore_attributes: bool) {
    let xml = String::from_utf8_lossy(raw).into_owned();
    match classify(&xml) {
        MessageClass::RpcReply => {
            let id = message_id_regex()
                .captures(&xml)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok());
            let Some(id) = id else {
                debug!("discarding rpc-reply without message-id");
                return;
            };
            match decode(&xml, ignore_attributes) {
                Ok(tree) => shared.dispatch_reply(id, Envelope::new(xml, tree)),
                Err(e) => warn!("discarding undecodable rpc-reply {}: {}", id, e),
            }
        }
        MessageClass::Notification => match decode(&xml, ignore_attributes) {
            Ok(tree) => shared.dispatch_notification(Envelope::new(xml, tree)),
            Err(e) => warn!("discarding undecodable notification: {}", e),
        },
        MessageClass::Hello => debug!("discarding unexpected hello after handshake"),
        MessageClass::Other => debug!("discarding unclassified message"),
    }
}

/// The demux loop: read bytes, frame them, route each complete message.
///
/// Runs until the channel reaches EOF, a read fails, or the framer
/// overflows; all three are fatal and resolve every pending waiter.
pub async fn run<R>(mut reader: R, mut framer: Framer, shared: std::sync::Arc<Shared>, ignore_attributes: bool)
where
    R: AsyncRead + Send + Unpin,
{
    let mut buf = vec![0u8; 8192];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                shared.fail_all("SSH session closed");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                shared.fail_all(&format!("SSH read error: {}", e));
                return;
            }
        };
        trace!("demux: {} bytes from channel", n);

        if let Err(e) = framer.append(&buf[..n]) {
            shared.fail_all(&e.to_string());
            return;
        }
        while let Some(raw) = framer.extract() {
            route_message(&shared, &raw, ignore_attributes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_fast_path() {
        let re = message_id_regex();
        let caps = re
            .captures(r#"<rpc-reply xmlns="x" message-id="17"><ok/></rpc-reply>"#)
            .unwrap();
        assert_eq!(&caps[1], "17");

        let caps = re
            .captures(r#"<nc:rpc-reply message-id="3" xmlns:nc="x"/>"#)
            .unwrap();
        assert_eq!(&caps[1], "3");

        assert!(re.captures("<notification/>").is_none());
    }

    #[test]
    fn test_route_reply_to_waiter() {
        let shared = Shared::new();
        let id = shared.next_message_id();
        assert_eq!(id, 1);
        let mut rx = shared.register(id, false);

        route_message(
            &shared,
            br#"<rpc-reply message-id="1"><ok/></rpc-reply>"#,
            false,
        );
        match rx.try_recv().unwrap() {
            Incoming::Reply(envelope) => {
                assert!(envelope.result.get_path(&["rpc-reply", "ok"]).is_some());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_reply_discarded() {
        let shared = Shared::new();
        let mut rx = shared.register(1, false);
        route_message(
            &shared,
            br#"<rpc-reply message-id="99"><ok/></rpc-reply>"#,
            false,
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notification_routed_to_streaming_waiter_only() {
        let shared = Shared::new();
        let mut plain = shared.register(1, false);
        let mut streaming = shared.register(2, true);

        route_message(
            &shared,
            b"<notification><eventTime>now</eventTime><event>up</event></notification>",
            false,
        );
        assert!(plain.try_recv().is_err());
        assert!(matches!(
            streaming.try_recv().unwrap(),
            Incoming::Notification(_)
        ));
    }

    #[test]
    fn test_fail_all_resolves_waiters_once() {
        let shared = Shared::new();
        let mut rx = shared.register(1, false);
        shared.fail_all("SSH session closed");
        match rx.try_recv().unwrap() {
            Incoming::Fatal(reason) => assert_eq!(reason, "SSH session closed"),
            other => panic!("unexpected message: {:?}", other),
        }
        assert_eq!(shared.state(), SessionState::Closed);
        // Second transition attempt is a no-op.
        assert!(!shared.transition(SessionState::Ready));
    }

    #[test]
    fn test_message_ids_monotonic() {
        let shared = Shared::new();
        assert_eq!(shared.next_message_id(), 1);
        assert_eq!(shared.next_message_id(), 2);
        assert_eq!(shared.next_message_id(), 3);
    }
}
