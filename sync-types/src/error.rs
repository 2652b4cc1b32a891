//! Error types for vaultsync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A hex-encoded field did not decode
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A control-frame decode was attempted on a binary frame
    #[error("expected a control frame, got a binary frame")]
    NotControl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WireError::NotControl;
        assert_eq!(
            err.to_string(),
            "expected a control frame, got a binary frame"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WireError>();
    }
}
