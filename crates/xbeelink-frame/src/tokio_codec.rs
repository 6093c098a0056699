use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::FrameError;

/// `tokio_util` codec for API frames over async byte streams.
///
/// Per-frame errors (bad checksum, unknown type, malformed length) are
/// returned from `decode`; the offending bytes have already been consumed, so
/// a `FramedRead` caller can log them and keep polling.
#[derive(Debug, Clone, Default)]
pub struct ApiFrameCodec {
    config: FrameConfig,
}

impl ApiFrameCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for ApiFrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, &self.config)
    }
}

impl Encoder<Frame> for ApiFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)
    }
}

impl Encoder<&Frame> for ApiFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)
    }
}
