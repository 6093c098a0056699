//! XBee API frame codec.
//!
//! Every frame on the wire is laid out as:
//! - a start delimiter (`0x7E`)
//! - a 2-byte big-endian length covering frame type and body
//! - a 1-byte frame type and the type-specific body
//! - a 1-byte checksum, `0xFF` minus the low byte of the body sum
//!
//! Two frame types are understood: Transmit Request (`0x10`) going out to
//! the radio and Explicit RX Indicator (`0x91`) coming in from it.

pub mod address;
pub mod codec;
pub mod error;
pub mod reader;
pub mod reading;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use address::{Address64, ParseAddressError};
pub use codec::{
    checksum, decode_frame, encode_explicit_rx, encode_transmit_request, ChecksumPolicy,
    ExplicitRxIndicator, Frame, FrameConfig, TransmitRequest, DEFAULT_FRAME_TIMEOUT,
    DEFAULT_MAX_FRAME_LENGTH, EXPLICIT_RX_INDICATOR, EXPLICIT_RX_MIN_LENGTH, START_DELIMITER,
    TRANSMIT_REQUEST, TRANSMIT_REQUEST_MIN_LENGTH,
};
pub use error::{FrameError, Result};
pub use reader::FrameDecoder;
pub use reading::{SensorReading, READING_SIZE};
pub use writer::FrameEncoder;

#[cfg(feature = "async")]
pub use tokio_codec::ApiFrameCodec;
