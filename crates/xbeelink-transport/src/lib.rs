//! Byte stream abstraction for XBee API links.
//!
//! The frame layer never touches sockets or serial ports directly. It talks
//! to a [`ByteStream`], which offers a non-blocking availability check,
//! blocking reads bounded by a timeout, and whole-buffer writes.
//!
//! Provided streams:
//! - [`MemoryStream`]: inbound queue plus captured output, for tests and
//!   offline tooling
//! - [`LinkStream`]: a Unix domain socket carrying the raw API byte stream
//!   (e.g. a serial port bridged with `socat`)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryStream;
pub use traits::ByteStream;

#[cfg(unix)]
pub use traits::LinkStream;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
