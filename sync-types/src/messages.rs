//! Protocol messages for vaultsync.
//!
//! Outgoing messages are modeled as one internally-tagged enum so the
//! `op` discriminator is written in exactly one place. Incoming frames
//! are decoded into the typed structs below via [`Frame::decode`].
//!
//! Every `path` and `hash` field on the wire is the hex encoding of an
//! authenticated-encryption ciphertext; see `sync-client`'s crypto
//! module for the envelope.
//!
//! [`Frame::decode`]: crate::Frame::decode

use serde::{Deserialize, Serialize};

/// Messages sent by the client, tagged by their `op` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Session handshake.
    Init {
        /// Vault id.
        id: String,
        /// Account auth token.
        token: String,
        /// hex(SHA-256(derived key)), proves knowledge of the vault password.
        keyhash: String,
        /// Last remote version counter this client has seen (0 on first sync).
        version: u64,
        /// Whether this is the client's first sync of the vault.
        initial: bool,
        /// Device label shown in the vault's device list.
        device: String,
    },
    /// Upload descriptor announcing a file, folder, or deletion.
    Push {
        /// Encrypted path, hex.
        path: String,
        /// Plaintext file extension.
        extension: String,
        /// Encrypted SHA-256 of the plaintext content, hex.
        hash: String,
        /// Creation time, milliseconds.
        ctime: i64,
        /// Modification time, milliseconds.
        mtime: i64,
        /// Whether the entry is a folder.
        folder: bool,
        /// Whether the entry is being deleted.
        deleted: bool,
        /// Ciphertext length in bytes.
        size: u64,
        /// Number of binary frames that will follow.
        pieces: u32,
    },
    /// Request the content of a specific file version.
    Pull {
        /// Server-assigned version id.
        uid: u64,
    },
    /// Usage/quota query.
    Size,
    /// Keepalive.
    Ping,
}

/// A `push` notification received from the server, either from the
/// initial snapshot burst or live while the session is open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushFrame {
    /// Encrypted path, hex.
    pub path: String,
    /// Encrypted content hash, hex. Empty for folders.
    #[serde(default)]
    pub hash: String,
    /// Ciphertext length in bytes.
    #[serde(default)]
    pub size: u64,
    /// Creation time, milliseconds.
    #[serde(default)]
    pub ctime: i64,
    /// Modification time, milliseconds.
    #[serde(default)]
    pub mtime: i64,
    /// Whether the entry is a folder.
    #[serde(default)]
    pub folder: bool,
    /// Whether the entry was deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Label of the device that produced this revision.
    #[serde(default)]
    pub device: String,
    /// Server-assigned version id.
    #[serde(default)]
    pub uid: u64,
}

/// Terminates the snapshot burst after `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Ready {
    /// The server's current version counter.
    pub version: u64,
}

/// Header sent before the binary pieces of a pull.
///
/// Distinguished by its key set; it carries no `op` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullHeader {
    /// Encrypted content hash, hex.
    pub hash: String,
    /// Total ciphertext length across all pieces.
    pub size: u64,
    /// Number of binary frames to expect.
    pub pieces: u32,
}

/// Response to a `size` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SizeInfo {
    /// Current vault usage in bytes.
    pub size: u64,
    /// Storage quota in bytes.
    pub limit: u64,
}
