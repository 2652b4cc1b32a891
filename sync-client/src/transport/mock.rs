//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Transport, TransportError};

/// A frame as the mock records or replays it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentFrame {
    /// A JSON control frame.
    Text(String),
    /// A binary content frame.
    Binary(Vec<u8>),
}

/// Transport that replays a scripted server conversation.
///
/// Queue the server's frames in order with [`queue_text`] and
/// [`queue_binary`] before driving the code under test; everything the
/// client sends is recorded for assertion. When the script runs out,
/// `recv` reports the connection closed.
///
/// [`queue_text`]: MockTransport::queue_text
/// [`queue_binary`]: MockTransport::queue_binary
#[derive(Default)]
pub struct MockTransport {
    incoming: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<SentFrame>>,
    connected: AtomicBool,
    fail_next_send: AtomicBool,
    hold_open: AtomicBool,
}

impl MockTransport {
    /// Create a mock that starts connected, since most tests exercise
    /// an established session.
    pub fn new() -> Self {
        let mock = Self::default();
        mock.connected.store(true, Ordering::SeqCst);
        mock
    }

    /// Queue a server JSON frame.
    pub fn queue_text(&self, text: impl Into<String>) {
        self.incoming
            .lock()
            .unwrap()
            .push_back(text.into().into_bytes());
    }

    /// Queue a server binary frame.
    pub fn queue_binary(&self, data: Vec<u8>) {
        self.incoming.lock().unwrap().push_back(data);
    }

    /// Everything the client has sent, in order.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().unwrap().clone()
    }

    /// The JSON frames the client has sent, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|f| match f {
                SentFrame::Text(t) => Some(t.clone()),
                SentFrame::Binary(_) => None,
            })
            .collect()
    }

    /// Make the next send fail.
    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Keep `recv` pending once the script runs out instead of
    /// reporting the connection closed. For exercising timeouts.
    pub fn hold_open(&self) {
        self.hold_open.store(true, Ordering::SeqCst);
    }

    fn check_send(&self) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(TransportError::SendFailed("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _host: &str) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.check_send()?;
        self.sent.lock().unwrap().push(SentFrame::Text(text));
        Ok(())
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<(), TransportError> {
        self.check_send()?;
        self.sent.lock().unwrap().push(SentFrame::Binary(data));
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let next = self.incoming.lock().unwrap().pop_front();
        match next {
            Some(bytes) => Ok(bytes),
            None if self.hold_open.load(Ordering::SeqCst) => std::future::pending().await,
            None => Err(TransportError::ConnectionClosed),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order() {
        let mock = MockTransport::new();
        mock.queue_text(r#"{"res":"ok"}"#);
        mock.queue_binary(vec![1, 2, 3]);

        assert_eq!(mock.recv().await.unwrap(), br#"{"res":"ok"}"#.to_vec());
        assert_eq!(mock.recv().await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            mock.recv().await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn records_sent_frames() {
        let mock = MockTransport::new();
        mock.send_text(r#"{"op":"ping"}"#.into()).await.unwrap();
        mock.send_binary(vec![9]).await.unwrap();

        assert_eq!(
            mock.sent(),
            vec![
                SentFrame::Text(r#"{"op":"ping"}"#.into()),
                SentFrame::Binary(vec![9]),
            ]
        );
        assert_eq!(mock.sent_texts(), vec![r#"{"op":"ping"}"#.to_string()]);
    }

    #[tokio::test]
    async fn injected_send_failure_fires_once() {
        let mock = MockTransport::new();
        mock.fail_next_send();

        assert!(mock.send_text("{}".into()).await.is_err());
        assert!(mock.send_text("{}".into()).await.is_ok());
    }
}
