//! XBee API framing for sensor request/response links.
//!
//! A node answers `GET_DATA` requests arriving as Explicit RX Indicator
//! frames with a Transmit Request carrying its current temperature and
//! humidity.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte stream abstraction (in-memory, Unix domain sockets)
//! - [`frame`]: frame encoder/decoder, checksum, addresses, readings
//! - [`node`]: sensor node and coordinator roles (behind `node` feature)

/// Re-export transport types.
pub mod transport {
    pub use xbeelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xbeelink_frame::*;
}

/// Re-export node types (requires `node` feature).
#[cfg(feature = "node")]
pub mod node {
    pub use xbeelink_node::*;
}
