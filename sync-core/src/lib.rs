//! # sync-core
//!
//! Pure logic for vaultsync (no I/O, instant tests).
//!
//! This crate implements the state machines and algorithms for sync
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, disk) is performed by `sync-client`, which
//! drives these types from its session and engine layers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod phase;
pub mod plan;
pub mod state;

pub use buffer::{BufferError, FrameBuffer};
pub use phase::{PhaseError, SessionPhase};
pub use plan::{ReconcilePlan, plan};
pub use state::SyncState;
