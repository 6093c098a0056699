use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

#[cfg(unix)]
use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};

/// A bidirectional byte stream as seen by the frame layer.
///
/// `available` never blocks. Reads block until the requested bytes arrive,
/// the read timeout elapses, or the stream closes; the last two surface as
/// [`TransportError::Exhausted`].
pub trait ByteStream {
    /// Number of bytes that can be read without blocking (0 = none yet).
    fn available(&mut self) -> Result<usize>;

    /// Read exactly one byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Fill `buf` completely.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Write every byte of `bytes`, in order.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Bound how long a single blocking read may wait. `None` waits forever.
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }
}

impl<T: ByteStream + ?Sized> ByteStream for &mut T {
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }
}

#[cfg(unix)]
const READ_CHUNK_SIZE: usize = 512;

/// A connected link socket carrying raw API frames.
///
/// Wraps a Unix domain socket stream. Incoming bytes are staged in a small
/// buffer so that byte-at-a-time decoding does not cost one syscall per byte.
#[cfg(unix)]
pub struct LinkStream {
    stream: std::os::unix::net::UnixStream,
    buf: BytesMut,
}

#[cfg(unix)]
impl LinkStream {
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream
            .set_write_timeout(timeout.map(non_zero))
            .map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor, empty read buffer).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.stream.try_clone()?;
        Ok(Self::from_unix(cloned))
    }

    /// Pull at least `needed` bytes into the staging buffer.
    fn fill(&mut self, needed: usize) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while self.buf.len() < needed {
            let read = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(TransportError::Exhausted {
                        needed: needed - self.buf.len(),
                    });
                }
                Err(err) => return Err(TransportError::Io(err)),
            };

            if read == 0 {
                return Err(TransportError::Exhausted {
                    needed: needed - self.buf.len(),
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    /// Peek at the socket without blocking.
    ///
    /// Returns the number of queued bytes (capped at the peek size),
    /// `Ok(0)` when nothing is queued and `Err(Closed)` once the peer hung up.
    fn peek_pending(&self) -> Result<usize> {
        use std::os::fd::AsRawFd;

        let mut peeked = [0u8; READ_CHUNK_SIZE];
        // SAFETY: `peeked` is a valid writable buffer of the given length and the
        // descriptor belongs to `self.stream`, which stays open for the call.
        // MSG_PEEK leaves the queued bytes in place for the next read.
        let rc = unsafe {
            libc::recv(
                self.stream.as_raw_fd(),
                peeked.as_mut_ptr().cast::<libc::c_void>(),
                peeked.len(),
                libc::MSG_PEEK | libc::MSG_DONTWAIT,
            )
        };

        match rc {
            0 => Err(TransportError::Closed),
            n if n > 0 => Ok(n as usize),
            _ => {
                let err = std::io::Error::last_os_error();
                match err.kind() {
                    ErrorKind::WouldBlock | ErrorKind::Interrupted => Ok(0),
                    _ => Err(TransportError::Io(err)),
                }
            }
        }
    }
}

#[cfg(unix)]
impl ByteStream for LinkStream {
    fn available(&mut self) -> Result<usize> {
        if !self.buf.is_empty() {
            return Ok(self.buf.len());
        }
        self.peek_pending()
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.fill(1)?;
        Ok(self.buf.get_u8())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.fill(buf.len())?;
        self.buf.copy_to_slice(buf);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.stream.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream
            .set_read_timeout(timeout.map(non_zero))
            .map_err(Into::into)
    }
}

/// The socket API rejects a zero timeout; treat it as the shortest wait.
#[cfg(unix)]
fn non_zero(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_millis(1)
    } else {
        timeout
    }
}

#[cfg(unix)]
impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &"unix")
            .field("buffered", &self.buf.len())
            .finish()
    }
}
