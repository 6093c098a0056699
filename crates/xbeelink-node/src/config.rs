use std::time::Duration;

use bytes::Bytes;
use xbeelink_frame::{Address64, FrameConfig};

/// Request token: ASCII `GET_DATA` followed by its NUL terminator (9 bytes).
pub const DEFAULT_COMMAND_TOKEN: &[u8] = b"GET_DATA\0";

/// Pause between polls when the link is idle.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);

/// How long a coordinator waits for a reading.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sensor node behavior.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Where unsolicited reports go.
    pub destination: Address64,
    /// `rf_data` that must match byte for byte to trigger a reply.
    pub command_token: Bytes,
    /// Decoder settings.
    pub frame: FrameConfig,
    /// Sleep between polls in [`SensorNode::run`](crate::SensorNode::run)
    /// when nothing is waiting.
    pub idle_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            destination: Address64::COORDINATOR,
            command_token: Bytes::from_static(DEFAULT_COMMAND_TOKEN),
            frame: FrameConfig::default(),
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}

/// Coordinator behavior.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Token sent as the request `rf_data`.
    pub command_token: Bytes,
    /// Decoder settings.
    pub frame: FrameConfig,
    /// Give up on a reply after this long.
    pub reply_timeout: Duration,
    /// Sleep between polls while waiting.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            command_token: Bytes::from_static(DEFAULT_COMMAND_TOKEN),
            frame: FrameConfig::default(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            poll_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}
