//! Websocket transport backed by tokio-tungstenite.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket transport to a sync server.
///
/// Writer and reader halves are guarded separately so a blocked `recv`
/// never delays a send.
pub struct WsTransport {
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<SplitStream<WsStream>>>,
    connected: AtomicBool,
}

impl WsTransport {
    /// Create a disconnected transport.
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    fn endpoint(host: &str) -> String {
        // Hosts in vault records carry no scheme.
        if host.contains("://") {
            host.to_string()
        } else {
            format!("wss://{host}/")
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, host: &str) -> Result<(), TransportError> {
        let url = Self::endpoint(host);
        tracing::debug!(%url, "connecting websocket");

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (sink, source) = stream.split();

        *self.writer.lock().await = Some(sink);
        *self.reader.lock().await = Some(source);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        writer
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        writer
            .send(Message::Binary(data))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            let message = reader
                .next()
                .await
                .ok_or(TransportError::ConnectionClosed)?
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

            match message {
                Message::Text(text) => return Ok(text.into_bytes()),
                Message::Binary(data) => return Ok(data),
                // Websocket-level keepalive, below the protocol.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                Message::Close(_) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        let mut guard = self.writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            // Best effort; the peer may already be gone.
            let _ = writer.send(Message::Close(None)).await;
        }
        *guard = None;
        *self.reader.lock().await = None;
        Ok(())
    }
}
