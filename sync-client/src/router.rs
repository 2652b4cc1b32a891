//! Frame routing for concurrent waiters.
//!
//! Protocol exchanges wait for specific frames while unrelated traffic
//! (live push notifications, keepalive pongs) keeps arriving on the
//! same connection. The router reads frames one at a time, hands each
//! to the active waiter's predicate, and parks non-matching frames in
//! a bounded buffer in arrival order. A later waiter checks the buffer
//! before touching the wire, so nothing is dropped and nothing is
//! reordered.
//!
//! One waiter at a time: the buffer lock is held across the wait, so
//! exchanges are naturally serialized. Pongs never reach waiters; the
//! router consumes them and decrements the outstanding-ping count.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Mutex;

use crate::channel::MessageChannel;
use crate::error::SessionError;
use crate::transport::Transport;
use sync_core::FrameBuffer;
use sync_types::{Frame, Op};

/// Routes incoming frames to the protocol code waiting for them.
pub struct FrameRouter<T: Transport> {
    channel: MessageChannel<T>,
    buffer: Mutex<FrameBuffer>,
    outstanding_pings: AtomicU32,
}

impl<T: Transport> FrameRouter<T> {
    /// Create a router over a channel with the given buffer capacity.
    pub fn new(channel: MessageChannel<T>, capacity: usize) -> Self {
        Self {
            channel,
            buffer: Mutex::new(FrameBuffer::new(capacity)),
            outstanding_pings: AtomicU32::new(0),
        }
    }

    /// The channel this router reads from.
    pub fn channel(&self) -> &MessageChannel<T> {
        &self.channel
    }

    /// Wait for the first frame matching `matcher`.
    ///
    /// Buffered frames are offered first, in arrival order. Frames the
    /// matcher declines are parked for later waiters; a full buffer
    /// fails the session with a queue overflow.
    pub async fn await_matching<F>(&self, mut matcher: F) -> Result<Frame, SessionError>
    where
        F: FnMut(&Frame) -> bool,
    {
        let mut buffer = self.buffer.lock().await;
        if let Some(frame) = buffer.claim(&mut matcher) {
            return Ok(frame);
        }
        loop {
            let frame = self.channel.next_frame().await?;
            if frame.op() == Some(Op::Pong) {
                self.note_pong();
                continue;
            }
            if matcher(&frame) {
                return Ok(frame);
            }
            buffer.park(frame)?;
        }
    }

    /// Wait for the next frame of any kind.
    pub async fn next(&self) -> Result<Frame, SessionError> {
        self.await_matching(|_| true).await
    }

    /// Wait for a control frame with the given `op` tag.
    pub async fn await_op(&self, op: Op) -> Result<Frame, SessionError> {
        self.await_matching(|f| f.op() == Some(op)).await
    }

    /// Wait for an untagged control frame carrying all of `keys`.
    pub async fn await_keys(&self, keys: &[&str]) -> Result<Frame, SessionError> {
        self.await_matching(|f| f.has_keys(keys)).await
    }

    /// Wait for a binary frame.
    pub async fn await_binary(&self) -> Result<Frame, SessionError> {
        self.await_matching(Frame::is_binary).await
    }

    /// Record that a keepalive ping went out.
    pub fn note_ping_sent(&self) {
        self.outstanding_pings.fetch_add(1, Ordering::SeqCst);
    }

    /// Pings sent but not yet answered.
    pub fn outstanding_pings(&self) -> u32 {
        self.outstanding_pings.load(Ordering::SeqCst)
    }

    fn note_pong(&self) {
        // Unsolicited pongs must not wrap the counter.
        let _ = self
            .outstanding_pings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            });
    }
}
