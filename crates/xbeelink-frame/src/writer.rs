use bytes::{Bytes, BytesMut};
use tracing::{debug, info};
use xbeelink_transport::ByteStream;

use crate::address::Address64;
use crate::codec::{encode_explicit_rx, encode_transmit_request, ExplicitRxIndicator, Frame};
use crate::error::Result;
use crate::reading::SensorReading;

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Encodes outbound frames and writes each one to a stream in a single call.
///
/// The encoder keeps no state between frames apart from a reusable scratch
/// buffer. It does not own the stream, so a node can pair it with a
/// [`FrameDecoder`](crate::FrameDecoder) on the same link.
#[derive(Debug)]
pub struct FrameEncoder {
    buf: BytesMut,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Build the exact bytes of a Transmit Request without sending them.
    pub fn build_transmit_request(&mut self, destination: &Address64, payload: &[u8]) -> Result<Bytes> {
        self.buf.clear();
        encode_transmit_request(destination, payload, &mut self.buf)?;
        Ok(self.buf.split().freeze())
    }

    /// Encode a Transmit Request and write it with one `write` call.
    pub fn send_transmit_request<S: ByteStream + ?Sized>(
        &mut self,
        stream: &mut S,
        destination: &Address64,
        payload: &[u8],
    ) -> Result<()> {
        self.buf.clear();
        encode_transmit_request(destination, payload, &mut self.buf)?;
        stream.write(&self.buf)?;
        info!(
            %destination,
            payload_len = payload.len(),
            "transmit request sent"
        );
        Ok(())
    }

    /// Send one `f32` as a 4-byte native-order payload.
    pub fn send_float<S: ByteStream + ?Sized>(
        &mut self,
        stream: &mut S,
        destination: &Address64,
        value: f32,
    ) -> Result<()> {
        self.send_transmit_request(stream, destination, &value.to_ne_bytes())
    }

    /// Send a temperature/humidity pair as an 8-byte payload.
    pub fn send_reading<S: ByteStream + ?Sized>(
        &mut self,
        stream: &mut S,
        destination: &Address64,
        reading: &SensorReading,
    ) -> Result<()> {
        self.send_transmit_request(stream, destination, &reading.to_payload())
    }

    /// Write an Explicit RX Indicator, as the radio would hand it to its host.
    pub fn send_explicit_rx<S: ByteStream + ?Sized>(
        &mut self,
        stream: &mut S,
        indicator: &ExplicitRxIndicator,
    ) -> Result<()> {
        self.buf.clear();
        encode_explicit_rx(indicator, &mut self.buf)?;
        stream.write(&self.buf)?;
        debug!(
            source = %indicator.source,
            rf_data_len = indicator.rf_data.len(),
            "explicit rx indicator sent"
        );
        Ok(())
    }

    /// Write any supported frame.
    pub fn send_frame<S: ByteStream + ?Sized>(&mut self, stream: &mut S, frame: &Frame) -> Result<()> {
        self.buf.clear();
        frame.encode(&mut self.buf)?;
        stream.write(&self.buf)?;
        debug!(frame_type = frame.frame_type(), len = self.buf.len(), "frame sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;
    use xbeelink_transport::{MemoryStream, TransportError};

    use super::*;
    use crate::codec::{
        decode_frame, FrameConfig, TransmitRequest, DEFAULT_FRAME_ID, TRANSMIT_REQUEST,
    };
    use crate::error::FrameError;

    const DEST: Address64 = Address64::new([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);

    fn decode_all(wire: &[u8]) -> Vec<Frame> {
        let mut buf = BytesMut::from(wire);
        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut buf, &FrameConfig::default()).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn reading_reply_end_to_end() {
        let mut stream = MemoryStream::new();
        let mut encoder = FrameEncoder::new();

        encoder
            .send_reading(&mut stream, &DEST, &SensorReading::new(23.5, 60.0))
            .unwrap();

        let wire = stream.written();
        assert_eq!(stream.write_count(), 1);
        assert_eq!(wire[3], TRANSMIT_REQUEST);
        assert_eq!(wire[4], DEFAULT_FRAME_ID);
        assert_eq!(&wire[5..13], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&wire[13..17], &[0xFF, 0xFE, 0x00, 0x00]);
        assert_eq!(&wire[17..21], &23.5f32.to_ne_bytes());
        assert_eq!(&wire[21..25], &60.0f32.to_ne_bytes());

        let sum = wire[3..wire.len() - 1]
            .iter()
            .fold(0u8, |s, b| s.wrapping_add(*b));
        assert_eq!(sum.wrapping_add(wire[wire.len() - 1]), 0xFF);
    }

    #[test]
    fn float_payload_is_four_bytes() {
        let mut stream = MemoryStream::new();
        FrameEncoder::new()
            .send_float(&mut stream, &DEST, -4.25)
            .unwrap();

        let frames = decode_all(stream.written());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload().as_ref(), &(-4.25f32).to_ne_bytes());
    }

    #[test]
    fn build_matches_sent_bytes() {
        let mut encoder = FrameEncoder::new();
        let built = encoder.build_transmit_request(&DEST, b"GET_DATA").unwrap();

        let mut stream = MemoryStream::new();
        encoder
            .send_transmit_request(&mut stream, &DEST, b"GET_DATA")
            .unwrap();
        assert_eq!(built.as_ref(), stream.written());
    }

    #[test]
    fn consecutive_frames_are_independent() {
        let mut stream = MemoryStream::new();
        let mut encoder = FrameEncoder::new();

        encoder.send_transmit_request(&mut stream, &DEST, b"one").unwrap();
        encoder.send_transmit_request(&mut stream, &DEST, b"two").unwrap();
        encoder
            .send_explicit_rx(&mut stream, &ExplicitRxIndicator::new(DEST, "three"))
            .unwrap();

        let frames = decode_all(stream.written());
        let payloads: Vec<&[u8]> = frames.iter().map(|f| f.payload().as_ref()).collect();
        assert_eq!(payloads, vec![&b"one"[..], &b"two"[..], &b"three"[..]]);
        assert_eq!(stream.write_count(), 3);
    }

    #[test]
    fn send_frame_accepts_both_types() {
        let mut stream = MemoryStream::new();
        let mut encoder = FrameEncoder::new();
        let sent = [
            Frame::TransmitRequest(TransmitRequest::new(DEST, "abc")),
            Frame::ExplicitRx(ExplicitRxIndicator::new(DEST, "xyz")),
        ];
        for frame in &sent {
            encoder.send_frame(&mut stream, frame).unwrap();
        }

        assert_eq!(decode_all(stream.written()), sent.to_vec());
    }

    #[test]
    fn oversized_payload_writes_nothing() {
        let mut stream = MemoryStream::new();
        let payload = vec![0u8; 70_000];

        let err = FrameEncoder::new()
            .send_transmit_request(&mut stream, &DEST, &payload)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert_eq!(stream.write_count(), 0);
    }

    #[test]
    fn write_failure_propagates() {
        let mut stream = MemoryStream::new();
        stream.close();

        let err = FrameEncoder::new()
            .send_float(&mut stream, &DEST, 1.0)
            .unwrap_err();
        assert!(matches!(err, FrameError::Closed));
    }

    #[test]
    fn works_through_trait_object() {
        struct Counting {
            writes: Arc<AtomicUsize>,
        }

        impl ByteStream for Counting {
            fn available(&mut self) -> xbeelink_transport::Result<usize> {
                Ok(0)
            }
            fn read_byte(&mut self) -> xbeelink_transport::Result<u8> {
                Err(TransportError::Exhausted { needed: 1 })
            }
            fn read_bytes(&mut self, buf: &mut [u8]) -> xbeelink_transport::Result<()> {
                Err(TransportError::Exhausted { needed: buf.len() })
            }
            fn write(&mut self, _bytes: &[u8]) -> xbeelink_transport::Result<()> {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let writes = Arc::new(AtomicUsize::new(0));
        let mut stream: Box<dyn ByteStream> = Box::new(Counting {
            writes: Arc::clone(&writes),
        });
        FrameEncoder::new()
            .send_reading(stream.as_mut(), &DEST, &SensorReading::default())
            .unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }
}
