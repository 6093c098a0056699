//! Sensor node and coordinator roles.
//!
//! A [`SensorNode`] sits behind a radio and answers data requests: when an
//! Explicit RX Indicator carrying the command token arrives, it replies with
//! the current temperature and humidity addressed back to the sender. A
//! [`Coordinator`] is the other side of the exchange, sending the request
//! and decoding the reply, once or on a fixed interval.
//!
//! Readings come from a [`ReadingSource`] passed into each call, so there is
//! no process-wide sensor state.

pub mod config;
#[cfg(unix)]
pub mod connector;
pub mod coordinator;
pub mod error;
#[cfg(unix)]
pub mod listener;
pub mod node;
pub mod source;

pub use config::{
    CoordinatorConfig, NodeConfig, DEFAULT_COMMAND_TOKEN, DEFAULT_IDLE_INTERVAL,
    DEFAULT_REPLY_TIMEOUT,
};
#[cfg(unix)]
pub use connector::{connect, connect_with_config};
pub use coordinator::{Coordinator, PollStats};
pub use error::{NodeError, Result};
#[cfg(unix)]
pub use listener::NodeListener;
pub use node::{PollOutcome, RunStats, SensorNode};
pub use source::{ReadingSource, SharedReading};
