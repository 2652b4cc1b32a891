//! Framed message channel over a transport.
//!
//! One [`MessageChannel`] wraps one transport connection. Outbound
//! control messages are serialized to JSON here; inbound frames are
//! classified into control or binary by [`Frame::classify`]. Every
//! frame that crosses the channel is also mirrored to an observable
//! log stream, so a CLI can show live traffic without the protocol
//! code knowing about it.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::SessionError;
use crate::transport::Transport;
use sync_types::{ClientMessage, Frame};

/// Direction of a logged frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by this client.
    Sent,
    /// Received from the server.
    Received,
}

/// One entry in the channel's frame log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Which way the frame went.
    pub direction: Direction,
    /// Compact rendering of the frame, secrets redacted.
    pub summary: String,
}

const LOG_CAPACITY: usize = 256;

/// The framed channel for one session.
pub struct MessageChannel<T: Transport> {
    transport: T,
    log: broadcast::Sender<LogEntry>,
}

impl<T: Transport> MessageChannel<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        let (log, _) = broadcast::channel(LOG_CAPACITY);
        Self { transport, log }
    }

    /// Open the underlying transport.
    pub async fn connect(&self, host: &str) -> Result<(), SessionError> {
        self.transport.connect(host).await?;
        Ok(())
    }

    /// Send a JSON control message.
    pub async fn send_control(&self, message: &ClientMessage) -> Result<(), SessionError> {
        let text = serde_json::to_string(message)?;
        self.record(Direction::Sent, summarize(message));
        self.transport.send_text(text).await?;
        Ok(())
    }

    /// Send a binary content frame.
    pub async fn send_binary(&self, data: Vec<u8>) -> Result<(), SessionError> {
        self.record(Direction::Sent, format!("binary [{}]", data.len()));
        self.transport.send_binary(data).await?;
        Ok(())
    }

    /// Receive and classify the next frame.
    pub async fn next_frame(&self) -> Result<Frame, SessionError> {
        let bytes = self.transport.recv().await?;
        let frame = Frame::classify(bytes);
        self.record(Direction::Received, frame.to_string());
        Ok(frame)
    }

    /// Subscribe to the frame log.
    ///
    /// Slow subscribers lag rather than block the channel.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.log.subscribe()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the transport.
    pub async fn close(&self) {
        let _ = self.transport.close().await;
    }

    fn record(&self, direction: Direction, summary: String) {
        tracing::trace!(?direction, %summary, "frame");
        // No subscribers is fine.
        let _ = self.log.send(LogEntry { direction, summary });
    }
}

/// Render an outbound message for the log with the auth token redacted.
fn summarize(message: &ClientMessage) -> String {
    match serde_json::to_value(message) {
        Ok(Value::Object(mut map)) => {
            if map.contains_key("token") {
                map.insert("token".into(), Value::String("[REDACTED]".into()));
            }
            Value::Object(map).to_string()
        }
        _ => "control".into(),
    }
}
