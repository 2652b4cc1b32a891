//! Buffered, not-yet-claimed frames for the match-and-buffer router.
//!
//! When a caller waits for a specific frame (say, a pull header), any
//! unrelated frame that arrives in the meantime (a live push
//! notification, a pong) is parked here and handed to a later,
//! differently-predicated wait. FIFO order of unclaimed frames is
//! preserved across claims.
//!
//! The buffer is bounded: a server that floods unsolicited frames while
//! the client waits on something specific would otherwise grow the
//! backlog without limit.

use std::collections::VecDeque;
use sync_types::Frame;
use thiserror::Error;

/// Default maximum number of parked frames.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The backlog of unclaimed frames exceeded the bound.
    #[error("frame buffer full (capacity: {capacity})")]
    Overflow {
        /// The configured capacity.
        capacity: usize,
    },
}

/// Bounded FIFO of received frames not yet claimed by any waiter.
#[derive(Debug)]
pub struct FrameBuffer {
    capacity: usize,
    queue: VecDeque<Frame>,
}

impl FrameBuffer {
    /// Create a buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::new(),
        }
    }

    /// Park a frame that no current waiter claimed.
    pub fn park(&mut self, frame: Frame) -> Result<(), BufferError> {
        if self.queue.len() >= self.capacity {
            return Err(BufferError::Overflow {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(frame);
        Ok(())
    }

    /// Remove and return the first parked frame satisfying `matcher`,
    /// preserving the arrival order of the remaining frames.
    pub fn claim<F>(&mut self, mut matcher: F) -> Option<Frame>
    where
        F: FnMut(&Frame) -> bool,
    {
        let idx = self.queue.iter().position(|f| matcher(f))?;
        self.queue.remove(idx)
    }

    /// Number of parked frames.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
