//! # sync-types
//!
//! Wire format types for the vaultsync encrypted file-sync protocol.
//!
//! This crate provides the foundational types used across all vaultsync
//! crates:
//! - [`Frame`], [`Op`] - Raw frame classification and operation tags
//! - [`ClientMessage`], [`PushFrame`], [`PullHeader`] - Protocol messages
//! - [`VaultIdentity`], [`RemoteEntry`], [`LocalEntry`] - Vault and entry metadata
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entry;
mod error;
mod frame;
mod messages;

pub use entry::{LocalEntry, RemoteEntry, VaultIdentity};
pub use error::WireError;
pub use frame::{Frame, Op};
pub use messages::{ClientMessage, PullHeader, PushFrame, Ready, SizeInfo};
