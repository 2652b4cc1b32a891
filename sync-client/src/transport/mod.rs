//! Transport abstraction for the sync session.
//!
//! The session, router, and engine are written against the [`Transport`]
//! trait so the whole protocol stack can run over a scripted in-memory
//! transport in tests. The production implementation is
//! [`ws::WsTransport`], a websocket client.
//!
//! The wire carries two kinds of frames: text frames holding JSON
//! control messages and binary frames holding encrypted content.
//! Receiving is type-blind on purpose: [`Transport::recv`] hands back
//! raw bytes and the layer above classifies them, because the server is
//! not strict about which websocket frame type it uses for JSON.

pub mod mock;
pub mod ws;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish the connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation attempted before connecting.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// A frame could not be sent.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// A frame could not be received.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// A bidirectional frame transport to the sync server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection to the given host.
    async fn connect(&self, host: &str) -> Result<(), TransportError>;

    /// Send a JSON control frame.
    async fn send_text(&self, text: String) -> Result<(), TransportError>;

    /// Send a binary content frame.
    async fn send_binary(&self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Receive the next frame as raw bytes, whatever its wire type.
    ///
    /// Blocks until a frame arrives; returns
    /// [`TransportError::ConnectionClosed`] when the peer hangs up.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Whether the connection is currently open.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn close(&self) -> Result<(), TransportError>;
}
