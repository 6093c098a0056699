use xbeelink_frame::FrameError;

/// Errors that can occur in node and coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] xbeelink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No reply arrived in time.
    #[error("no reply after {0:?}")]
    Timeout(std::time::Duration),
}

impl NodeError {
    /// Whether polling can continue on the same link.
    pub fn is_recoverable(&self) -> bool {
        match self {
            NodeError::Frame(err) => err.is_recoverable(),
            NodeError::Timeout(_) => true,
            NodeError::Transport(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
