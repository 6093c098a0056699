use xbeelink_transport::TransportError;

/// Errors that can occur while encoding or decoding API frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ran dry (or timed out) partway through a frame.
    #[error("stream exhausted mid-frame ({needed} more bytes needed)")]
    StreamExhausted { needed: usize },

    /// The frame type is not one this codec handles. The frame was drained.
    #[error("unknown frame type 0x{frame_type:02X} (length {length})")]
    UnknownFrameType { frame_type: u8, length: u16 },

    /// The declared length cannot hold a frame of this type, or exceeds the
    /// configured maximum. `frame_type` is `None` when the length was rejected
    /// before the type byte was read.
    #[error("malformed frame length {length} (allowed {min}..={max})")]
    MalformedLength {
        frame_type: Option<u8>,
        length: u16,
        min: u16,
        max: u16,
    },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch (computed 0x{expected:02X}, received 0x{actual:02X})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The payload does not fit in the length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A sensor payload had the wrong size.
    #[error("sensor payload must be 8 bytes, got {0}")]
    InvalidReading(usize),

    /// The stream closed between frames.
    #[error("stream closed")]
    Closed,

    /// Any other stream failure.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether the next poll can carry on scanning for a fresh frame.
    ///
    /// Everything scoped to a single frame is recoverable; a closed or failed
    /// stream is not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FrameError::Closed | FrameError::Io(_))
    }
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Exhausted { needed } => FrameError::StreamExhausted { needed },
            TransportError::Closed => FrameError::Closed,
            TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                FrameError::Io(source)
            }
            other => FrameError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_transport_maps_to_stream_exhausted() {
        let err = FrameError::from(TransportError::Exhausted { needed: 3 });
        assert!(matches!(err, FrameError::StreamExhausted { needed: 3 }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn closed_transport_is_not_recoverable() {
        let err = FrameError::from(TransportError::Closed);
        assert!(matches!(err, FrameError::Closed));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn per_frame_errors_are_recoverable() {
        let errors = [
            FrameError::UnknownFrameType {
                frame_type: 0x55,
                length: 4,
            },
            FrameError::MalformedLength {
                frame_type: Some(0x91),
                length: 10,
                min: 18,
                max: 1024,
            },
            FrameError::ChecksumMismatch {
                expected: 0x12,
                actual: 0x34,
            },
        ];
        assert!(errors.iter().all(FrameError::is_recoverable));
    }

    #[test]
    fn messages_show_hex_values() {
        let err = FrameError::UnknownFrameType {
            frame_type: 0x8b,
            length: 7,
        };
        assert_eq!(err.to_string(), "unknown frame type 0x8B (length 7)");
    }
}
