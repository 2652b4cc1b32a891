//! Error taxonomy for a sync session.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::transport::TransportError;
use sync_core::{BufferError, PhaseError};
use sync_types::{Frame, WireError};

/// Errors raised by session and transfer operations.
///
/// Connection loss and router overflow are fatal to the session; the
/// rest fail the operation that raised them and leave the session
/// usable.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport failed or the server hung up.
    #[error("connection lost: {0}")]
    ConnectionLost(#[from] TransportError),

    /// The server rejected the login handshake.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A frame arrived that the current exchange cannot accept.
    #[error("protocol violation: unexpected frame {frame}")]
    ProtocolViolation {
        /// The offending frame.
        frame: Frame,
    },

    /// Received content did not match its declared size or hash.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// A push exchange deviated from the expected sequence.
    #[error("push rejected: {0}")]
    PushRejected(String),

    /// The router's frame buffer overflowed.
    #[error(transparent)]
    QueueOverflow(#[from] BufferError),

    /// An exchange exceeded its time budget.
    #[error("{what} timed out after {secs}s")]
    TimeoutExceeded {
        /// The exchange that timed out.
        what: &'static str,
        /// The budget that was exceeded.
        secs: u64,
    },

    /// Encryption or decryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A control frame failed to encode or decode.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// An outgoing message failed to serialize.
    #[error("message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// An operation was attempted in the wrong session phase.
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl SessionError {
    /// Whether the session is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::ConnectionLost(_) | SessionError::QueueOverflow(_)
        )
    }
}
