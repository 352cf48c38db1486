//! NETCONF end-of-message framing.
//!
//! NETCONF 1.0 terminates every message (hello, rpc, rpc-reply,
//! notification) with the literal delimiter `]]>]]>`. The [`Framer`]
//! accumulates raw bytes from the transport and yields complete messages,
//! regardless of how the SSH channel chunked them.

use bytes::{Buf, BytesMut};

use crate::error::ProtocolError;

/// The NETCONF 1.0 end-of-message delimiter.
pub const DELIMITER: &[u8] = b"]]>]]>";

/// Ceiling on buffered bytes. Input beyond this is a fatal session error.
pub const MAX_BUFFER_SIZE: usize = 50 * 1024 * 1024;

/// Buffer that splits an incoming byte stream on the message delimiter.
///
/// Append-only between extractions; [`extract`](Self::extract) removes the
/// prefix up to and including the first delimiter. Purely synchronous and
/// holds no reference to the transport.
#[derive(Debug)]
pub struct Framer {
    buffer: BytesMut,
    limit: usize,
}

impl Framer {
    /// Create a framer with the default 50 MiB ceiling.
    pub fn new() -> Self {
        Self::with_limit(MAX_BUFFER_SIZE)
    }

    /// Create a framer with a custom ceiling.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            limit,
        }
    }

    /// Append a chunk of bytes.
    ///
    /// Fails with [`ProtocolError::FramerOverflow`] if the chunk would push
    /// the buffered total past the ceiling; the buffer is left unchanged,
    /// so messages already buffered remain extractable. Delimiter bytes
    /// count toward the ceiling like any other bytes.
    pub fn append(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        if self.buffer.len() + data.len() > self.limit {
            return Err(ProtocolError::FramerOverflow { limit: self.limit });
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Extract the next complete message, or `None` if no delimiter has
    /// been buffered yet. The returned bytes exclude the delimiter.
    pub fn extract(&mut self) -> Option<Vec<u8>> {
        let pos = self
            .buffer
            .windows(DELIMITER.len())
            .position(|w| w == DELIMITER)?;

        let message = self.buffer[..pos].to_vec();
        self.buffer.advance(pos + DELIMITER.len());
        Some(message)
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
