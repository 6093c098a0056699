use bytes::BytesMut;
use tracing::{debug, trace, warn};
use xbeelink_transport::ByteStream;

use crate::codec::{
    is_supported, parse_body, validate_length, verify_checksum, ChecksumAccumulator,
    ChecksumPolicy, Frame, FrameConfig, START_DELIMITER,
};
use crate::error::{FrameError, Result};

const DRAIN_CHUNK_SIZE: usize = 64;

/// Reads API frames from a [`ByteStream`], one poll at a time.
///
/// Each [`poll_frame`](Self::poll_frame) call either finds no delimiter and
/// returns immediately, or consumes exactly one frame (or fails partway
/// through it). Nothing carries over between polls, so after any error the
/// next poll starts again by scanning for a start delimiter.
pub struct FrameDecoder<S> {
    inner: S,
    config: FrameConfig,
}

impl<S: ByteStream> FrameDecoder<S> {
    /// Create a decoder with default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(inner: S, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Try to read one frame.
    ///
    /// Returns `Ok(None)` when no start delimiter is waiting; stray bytes
    /// ahead of the delimiter are discarded one by one. Once a delimiter is
    /// consumed the whole frame is read before returning:
    /// - a zero length, or a `0x10`/`0x91` length outside its allowed range,
    ///   fails with `MalformedLength` before any body byte is read
    /// - other frame types are drained in full, whatever their length, and
    ///   reported as `UnknownFrameType`
    /// - the checksum is verified before the frame is handed back, so callers
    ///   never act on a frame that fails it under [`ChecksumPolicy::Enforce`]
    ///
    /// The configured frame timeout applies only while a frame is being read;
    /// the stream is put back to blocking reads before this returns.
    pub fn poll_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if self.inner.available()? == 0 {
                return Ok(None);
            }
            let byte = self.inner.read_byte()?;
            if byte == START_DELIMITER {
                break;
            }
            trace!(byte, "discarding byte while waiting for start delimiter");
        }

        self.inner.set_read_timeout(self.config.frame_timeout)?;
        let result = self.read_frame_body();
        if self.config.frame_timeout.is_some() {
            if let Err(err) = self.inner.set_read_timeout(None) {
                debug!(error = %err, "failed to clear read timeout");
            }
        }
        result.map(Some)
    }

    fn read_frame_body(&mut self) -> Result<Frame> {
        let mut length_bytes = [0u8; 2];
        self.inner.read_bytes(&mut length_bytes)?;
        let length = u16::from_be_bytes(length_bytes);
        validate_length(None, length, self.config.max_frame_length)?;

        let frame_type = self.inner.read_byte()?;
        debug!(length, frame_type, "frame header received");

        if !is_supported(frame_type) {
            // body (length - 1) + checksum (1)
            self.drain(length as usize)?;
            warn!(
                frame_type = %format!("0x{frame_type:02X}"),
                length, "unknown frame type; frame discarded"
            );
            return Err(FrameError::UnknownFrameType { frame_type, length });
        }
        validate_length(Some(frame_type), length, self.config.max_frame_length)?;

        let mut body = BytesMut::zeroed(length as usize - 1);
        self.inner.read_bytes(&mut body)?;
        let received = self.inner.read_byte()?;

        let mut acc = ChecksumAccumulator::default();
        acc.update(&[frame_type]);
        acc.update(&body);
        verify_checksum(acc.finish(), received, self.config.checksum_policy)?;

        parse_body(frame_type, body.freeze())
    }

    fn drain(&mut self, mut remaining: usize) -> Result<()> {
        let mut scratch = [0u8; DRAIN_CHUNK_SIZE];
        while remaining > 0 {
            let n = remaining.min(DRAIN_CHUNK_SIZE);
            self.inner.read_bytes(&mut scratch[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the decoder and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Change checksum handling for subsequent frames.
    pub fn set_checksum_policy(&mut self, policy: ChecksumPolicy) {
        self.config.checksum_policy = policy;
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
