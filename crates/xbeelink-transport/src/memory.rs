use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::ByteStream;

/// An in-memory stream: bytes fed in are read back out, writes are captured.
///
/// Reads never wait. Asking for more bytes than are queued fails with
/// [`TransportError::Exhausted`] and leaves the queue untouched, which models a
/// frame whose tail never arrived.
#[derive(Debug, Default)]
pub struct MemoryStream {
    inbound: BytesMut,
    outbound: Vec<u8>,
    closed: bool,
    writes: usize,
}

impl MemoryStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream with `bytes` already queued for reading.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let mut stream = Self::new();
        stream.feed(bytes);
        stream
    }

    /// Queue more bytes for reading.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend_from_slice(bytes);
    }

    /// Mark the stream as closed once the queued bytes run out.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Bytes still waiting to be read.
    pub fn pending(&self) -> &[u8] {
        &self.inbound
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.outbound
    }

    /// Take everything written so far, leaving the capture empty.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Number of `write` calls seen.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl ByteStream for MemoryStream {
    fn available(&mut self) -> Result<usize> {
        if self.inbound.is_empty() && self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.inbound.len())
    }

    fn read_byte(&mut self) -> Result<u8> {
        if self.inbound.is_empty() {
            return Err(TransportError::Exhausted { needed: 1 });
        }
        Ok(self.inbound.get_u8())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.inbound.len() < buf.len() {
            return Err(TransportError::Exhausted {
                needed: buf.len() - self.inbound.len(),
            });
        }
        self.inbound.copy_to_slice(buf);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound.extend_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}
