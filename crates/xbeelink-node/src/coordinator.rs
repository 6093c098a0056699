use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use xbeelink_frame::{
    Address64, ExplicitRxIndicator, Frame, FrameDecoder, FrameEncoder, FrameError, SensorReading,
};
use xbeelink_transport::ByteStream;

use crate::config::CoordinatorConfig;
use crate::error::{NodeError, Result};

/// Counters reported when [`Coordinator::poll_readings`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub requests: u64,
    pub readings: u64,
    pub failures: u64,
}

/// The requesting side of the exchange.
///
/// Writes data requests the way a radio delivers them to its host (as
/// Explicit RX Indicator frames) and reads back the Transmit Request the
/// node answers with.
pub struct Coordinator<S> {
    decoder: FrameDecoder<S>,
    encoder: FrameEncoder,
    config: CoordinatorConfig,
}

impl<S: ByteStream> Coordinator<S> {
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, CoordinatorConfig::default())
    }

    pub fn with_config(stream: S, config: CoordinatorConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_config(stream, config.frame.clone()),
            encoder: FrameEncoder::new(),
            config,
        }
    }

    /// Send the command token with `from` as the source address.
    pub fn send_request(&mut self, from: Address64) -> Result<()> {
        let indicator = ExplicitRxIndicator::new(from, self.config.command_token.clone());
        self.encoder
            .send_explicit_rx(self.decoder.get_mut(), &indicator)?;
        Ok(())
    }

    /// Request a reading and wait for the reply addressed to `from`.
    ///
    /// Frames addressed elsewhere and per-frame decode errors are skipped
    /// while waiting. Fails with [`NodeError::Timeout`] once
    /// `reply_timeout` passes without a reply, even if the link never goes
    /// quiet.
    pub fn request_reading(&mut self, from: Address64) -> Result<SensorReading> {
        self.send_request(from)?;
        let deadline = Instant::now() + self.config.reply_timeout;

        loop {
            let idle = match self.decoder.poll_frame() {
                Ok(Some(Frame::TransmitRequest(reply))) if reply.destination == from => {
                    let reading = SensorReading::from_payload(&reply.payload)?;
                    info!(
                        %from,
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        "reading received"
                    );
                    return Ok(reading);
                }
                Ok(Some(other)) => {
                    debug!(
                        frame_type = other.frame_type(),
                        address = %other.address(),
                        "frame is not the awaited reply; skipped"
                    );
                    false
                }
                Ok(None) => true,
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "frame dropped while waiting for reply");
                    false
                }
                Err(err) => return Err(err.into()),
            };

            if Instant::now() >= deadline {
                return Err(NodeError::Timeout(self.config.reply_timeout));
            }
            if idle {
                std::thread::sleep(self.config.poll_interval);
            }
        }
    }

    /// Request a reading from `from` every `interval` and hand each one to
    /// `on_reading`.
    ///
    /// Stops after `count` requests, when `running` is cleared, or when the
    /// link closes. A request that times out or gets a bad reply is logged
    /// and counted as a failure; only a broken link ends the loop with an
    /// error.
    pub fn poll_readings<F>(
        &mut self,
        from: Address64,
        interval: Duration,
        count: Option<u64>,
        running: &AtomicBool,
        mut on_reading: F,
    ) -> Result<PollStats>
    where
        F: FnMut(SensorReading),
    {
        let mut stats = PollStats::default();
        info!(%from, ?interval, ?count, "polling for readings");

        while running.load(Ordering::SeqCst) {
            stats.requests += 1;
            match self.request_reading(from) {
                Ok(reading) => {
                    stats.readings += 1;
                    on_reading(reading);
                }
                Err(NodeError::Frame(FrameError::Closed)) => {
                    info!("link closed");
                    break;
                }
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "request failed; will retry next interval");
                    stats.failures += 1;
                }
                Err(err) => return Err(err),
            }

            if count.is_some_and(|max| stats.requests >= max) {
                break;
            }
            self.pause(interval, running);
        }
        Ok(stats)
    }

    /// Sleep for `interval`, waking early once `running` is cleared.
    fn pause(&self, interval: Duration, running: &AtomicBool) {
        let resume = Instant::now() + interval;
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= resume {
                break;
            }
            std::thread::sleep((resume - now).min(self.config.poll_interval));
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &S {
        self.decoder.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.decoder.get_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::BytesMut;
    use xbeelink_frame::{checksum, encode_transmit_request};
    use xbeelink_transport::MemoryStream;

    use super::*;
    use crate::config::DEFAULT_COMMAND_TOKEN;

    const ME: Address64 = Address64::new([0, 0, 0, 0, 0, 0, 0, 0x01]);
    const OTHER: Address64 = Address64::new([0, 0, 0, 0, 0, 0, 0, 0x02]);

    fn reply(to: &Address64, payload: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_transmit_request(to, payload, &mut wire).unwrap();
        wire.to_vec()
    }

    fn quick() -> CoordinatorConfig {
        CoordinatorConfig {
            reply_timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(1),
            ..CoordinatorConfig::default()
        }
    }

    #[test]
    fn request_carries_token_from_given_source() {
        let reading = SensorReading::new(23.5, 60.0);
        let mut coordinator = Coordinator::with_config(
            MemoryStream::with_inbound(&reply(&ME, &reading.to_payload())),
            quick(),
        );

        assert_eq!(coordinator.request_reading(ME).unwrap(), reading);

        let mut sent = BytesMut::from(coordinator.get_ref().written());
        let frame = xbeelink_frame::decode_frame(&mut sent, &Default::default())
            .unwrap()
            .unwrap();
        match frame {
            Frame::ExplicitRx(rx) => {
                assert_eq!(rx.source, ME);
                assert_eq!(&rx.rf_data[..], DEFAULT_COMMAND_TOKEN);
                assert_eq!(&rx.rf_data[..], b"GET_DATA\0");
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn replies_for_other_addresses_are_skipped() {
        let reading = SensorReading::new(-4.25, 12.0);
        let mut wire = reply(&OTHER, &SensorReading::default().to_payload());
        wire.extend([0x01, 0x02]);
        wire.extend(reply(&ME, &reading.to_payload()));
        let mut coordinator = Coordinator::with_config(MemoryStream::with_inbound(&wire), quick());

        assert_eq!(coordinator.request_reading(ME).unwrap(), reading);
    }

    #[test]
    fn no_reply_times_out() {
        let mut coordinator = Coordinator::with_config(MemoryStream::new(), quick());

        let err = coordinator.request_reading(ME).unwrap_err();
        assert!(matches!(err, NodeError::Timeout(d) if d == Duration::from_millis(30)));
    }

    #[test]
    fn short_reply_payload_is_invalid_reading() {
        let mut coordinator = Coordinator::with_config(
            MemoryStream::with_inbound(&reply(&ME, &1.5f32.to_ne_bytes())),
            quick(),
        );

        let err = coordinator.request_reading(ME).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Frame(FrameError::InvalidReading(4))
        ));
    }

    /// Replays one frame forever, so the link is never idle.
    struct Chatter {
        frame: Vec<u8>,
        pos: usize,
        written: Vec<u8>,
    }

    impl Chatter {
        fn unknown_frames() -> Self {
            let body = [0x55, 0x01, 0x02, 0x03];
            let mut frame = vec![0x7E, 0x00, body.len() as u8];
            frame.extend_from_slice(&body);
            frame.push(checksum(&body));
            Self {
                frame,
                pos: 0,
                written: Vec::new(),
            }
        }
    }

    impl ByteStream for Chatter {
        fn available(&mut self) -> xbeelink_transport::Result<usize> {
            Ok(self.frame.len())
        }

        fn read_byte(&mut self) -> xbeelink_transport::Result<u8> {
            let byte = self.frame[self.pos];
            self.pos = (self.pos + 1) % self.frame.len();
            Ok(byte)
        }

        fn read_bytes(&mut self, buf: &mut [u8]) -> xbeelink_transport::Result<()> {
            for slot in buf.iter_mut() {
                *slot = self.read_byte()?;
            }
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> xbeelink_transport::Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn constant_unknown_frames_still_time_out() {
        let mut coordinator = Coordinator::with_config(Chatter::unknown_frames(), quick());

        let started = Instant::now();
        let err = coordinator.request_reading(ME).unwrap_err();
        assert!(matches!(err, NodeError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!coordinator.get_ref().written.is_empty());
    }

    #[test]
    fn poll_readings_keeps_going_past_bad_replies() {
        let first = SensorReading::new(21.0, 40.0);
        let second = SensorReading::new(22.5, 41.5);
        let mut wire = reply(&ME, &first.to_payload());
        wire.extend(reply(&ME, &1.5f32.to_ne_bytes()));
        wire.extend(reply(&ME, &second.to_payload()));
        let mut coordinator = Coordinator::with_config(MemoryStream::with_inbound(&wire), quick());

        let running = AtomicBool::new(true);
        let mut seen = Vec::new();
        let stats = coordinator
            .poll_readings(ME, Duration::ZERO, Some(3), &running, |r| seen.push(r))
            .unwrap();

        assert_eq!(
            stats,
            PollStats {
                requests: 3,
                readings: 2,
                failures: 1
            }
        );
        assert_eq!(seen, vec![first, second]);

        let mut sent = BytesMut::from(coordinator.get_ref().written());
        let mut requests = 0;
        let config = Default::default();
        while let Some(frame) = xbeelink_frame::decode_frame(&mut sent, &config).unwrap() {
            assert_eq!(frame.address(), ME);
            requests += 1;
        }
        assert_eq!(requests, 3);
    }

    #[test]
    fn poll_readings_counts_timeouts_as_failures() {
        let mut coordinator = Coordinator::with_config(MemoryStream::new(), quick());
        let running = AtomicBool::new(true);

        let stats = coordinator
            .poll_readings(ME, Duration::from_millis(1), Some(2), &running, |_| {
                panic!("no reading expected")
            })
            .unwrap();
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.readings, 0);
    }

    #[test]
    fn poll_readings_stops_when_link_closes() {
        let mut stream = MemoryStream::new();
        stream.close();
        let mut coordinator = Coordinator::with_config(stream, quick());
        let running = AtomicBool::new(true);

        let stats = coordinator
            .poll_readings(ME, Duration::ZERO, None, &running, |_| {})
            .unwrap();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.readings, 0);
    }

    #[test]
    fn poll_readings_does_nothing_once_stopped() {
        let mut coordinator = Coordinator::with_config(MemoryStream::new(), quick());
        let running = AtomicBool::new(false);

        let stats = coordinator
            .poll_readings(ME, Duration::from_secs(60), None, &running, |_| {})
            .unwrap();
        assert_eq!(stats, PollStats::default());
        assert!(coordinator.get_ref().written().is_empty());
    }
}
