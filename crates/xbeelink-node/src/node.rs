use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tracing::{debug, info, warn};
use xbeelink_frame::{Address64, Frame, FrameDecoder, FrameEncoder, SensorReading};
use xbeelink_transport::ByteStream;

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::source::ReadingSource;

/// What one poll of the link did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing waiting on the link.
    Idle,
    /// A data request was answered.
    Replied {
        to: Address64,
        reading: SensorReading,
    },
    /// An Explicit RX arrived whose `rf_data` is not the command token.
    Ignored { from: Address64, rf_data: Bytes },
    /// A well-formed frame of a type the node does not act on.
    Unexpected { frame_type: u8 },
}

/// Counters reported when [`SensorNode::run`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub replies: u64,
    pub ignored: u64,
    pub errors: u64,
}

/// Answers data requests arriving on a byte stream.
///
/// The decoder owns the stream; replies go out through the same stream via
/// [`FrameDecoder::get_mut`].
pub struct SensorNode<S> {
    decoder: FrameDecoder<S>,
    encoder: FrameEncoder,
    config: NodeConfig,
}

impl<S: ByteStream> SensorNode<S> {
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, NodeConfig::default())
    }

    pub fn with_config(stream: S, config: NodeConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_config(stream, config.frame.clone()),
            encoder: FrameEncoder::new(),
            config,
        }
    }

    /// Poll the link once and answer a data request if one is waiting.
    ///
    /// A frame whose checksum fails is rejected before its contents are looked
    /// at, so no reply goes out for it. Unknown frame types are drained and
    /// surface as a recoverable error; the next call starts clean.
    pub fn handle_received_command<R: ReadingSource + ?Sized>(
        &mut self,
        source: &R,
    ) -> Result<PollOutcome> {
        let frame = match self.decoder.poll_frame()? {
            Some(frame) => frame,
            None => return Ok(PollOutcome::Idle),
        };

        let indicator = match frame {
            Frame::ExplicitRx(indicator) => indicator,
            other => {
                debug!(
                    frame_type = other.frame_type(),
                    "frame is not a data request; skipped"
                );
                return Ok(PollOutcome::Unexpected {
                    frame_type: other.frame_type(),
                });
            }
        };

        if indicator.rf_data != self.config.command_token {
            debug!(
                source = %indicator.source,
                rf_data_len = indicator.rf_data.len(),
                "rf_data does not match command token"
            );
            return Ok(PollOutcome::Ignored {
                from: indicator.source,
                rf_data: indicator.rf_data,
            });
        }

        let reading = source.current();
        self.encoder
            .send_reading(self.decoder.get_mut(), &indicator.source, &reading)?;
        info!(
            to = %indicator.source,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "answered data request"
        );
        Ok(PollOutcome::Replied {
            to: indicator.source,
            reading,
        })
    }

    /// Push the current reading to the configured destination unprompted.
    pub fn report<R: ReadingSource + ?Sized>(&mut self, source: &R) -> Result<SensorReading> {
        let reading = source.current();
        self.encoder
            .send_reading(self.decoder.get_mut(), &self.config.destination, &reading)?;
        Ok(reading)
    }

    /// Send a single float to the configured destination.
    pub fn send_float(&mut self, value: f32) -> Result<()> {
        self.encoder
            .send_float(self.decoder.get_mut(), &self.config.destination, value)?;
        Ok(())
    }

    /// Poll until `running` is cleared, the link closes, or `max_replies`
    /// requests have been answered.
    ///
    /// Per-frame errors are logged and polling continues. Only a closed or
    /// failed link ends the loop early; a clean close returns the stats.
    pub fn run<R: ReadingSource + ?Sized>(
        &mut self,
        source: &R,
        running: &AtomicBool,
        max_replies: Option<u64>,
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();
        while running.load(Ordering::SeqCst) {
            if max_replies.is_some_and(|max| stats.replies >= max) {
                break;
            }
            match self.handle_received_command(source) {
                Ok(PollOutcome::Idle) => std::thread::sleep(self.config.idle_interval),
                Ok(PollOutcome::Replied { .. }) => stats.replies += 1,
                Ok(PollOutcome::Ignored { .. }) | Ok(PollOutcome::Unexpected { .. }) => {
                    stats.ignored += 1
                }
                Err(NodeError::Frame(xbeelink_frame::FrameError::Closed)) => {
                    info!("link closed");
                    break;
                }
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "frame dropped");
                    stats.errors += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(stats)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &S {
        self.decoder.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.decoder.get_mut()
    }

    pub fn into_inner(self) -> S {
        self.decoder.into_inner()
    }
}
