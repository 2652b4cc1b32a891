//! Session lifecycle phases.
//!
//! A pure phase machine for one protocol session. The I/O layer
//! (`sync-client`) asks for a transition before acting and gets an
//! error back instead of silently entering an impossible state.

use thiserror::Error;

/// The lifecycle phase of a protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No transport connection.
    Disconnected,
    /// `init` sent, waiting for the server's acknowledgment.
    Handshaking,
    /// Acknowledged; receiving the snapshot burst until `ready`.
    AwaitingSnapshot,
    /// Snapshot complete; exchanges may run.
    Ready,
    /// A pull exchange is in flight.
    Pulling,
    /// A push exchange is in flight.
    Pushing,
    /// Session is over; no further transitions.
    Closed,
}

/// Rejected phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid session transition: {from:?} -> {to:?}")]
pub struct PhaseError {
    /// Phase the session was in.
    pub from: SessionPhase,
    /// Phase that was requested.
    pub to: SessionPhase,
}

impl SessionPhase {
    /// Starting phase.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Attempt to move to `to`, consuming the current phase.
    pub fn advance(self, to: SessionPhase) -> Result<SessionPhase, PhaseError> {
        use SessionPhase::*;
        let ok = matches!(
            (self, to),
            (Disconnected, Handshaking)
                | (Handshaking, AwaitingSnapshot)
                | (AwaitingSnapshot, Ready)
                | (Ready, Pulling)
                | (Ready, Pushing)
                | (Pulling, Ready)
                | (Pushing, Ready)
        ) || (to == Closed && self != Closed);
        if ok {
            Ok(to)
        } else {
            Err(PhaseError { from: self, to })
        }
    }

    /// Whether exchanges may be started.
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionPhase::Ready)
    }

    /// Whether the session is over.
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionPhase::Closed)
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::new()
    }
}
