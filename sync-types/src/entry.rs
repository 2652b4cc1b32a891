//! Vault identity and file-tree entry metadata.

use serde::Deserialize;
use std::fmt;

/// A vault as returned by the account API.
///
/// Immutable once obtained; passed by reference into session
/// construction. The password may arrive empty from the listing
/// endpoint, in which case the caller prompts for it.
#[derive(Clone, Deserialize)]
pub struct VaultIdentity {
    /// Vault id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Sync server endpoint for this vault.
    pub host: String,
    /// Vault password (not the account password).
    #[serde(default)]
    pub password: String,
    /// Key-derivation salt issued when the vault was created.
    pub salt: String,
}

// Keep the vault password out of Debug output.
impl fmt::Debug for VaultIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultIdentity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("password", &"[REDACTED]")
            .field("salt", &self.salt)
            .finish()
    }
}

/// One entry of the remote file tree, as last announced by the server.
///
/// Keyed by decrypted path in the sync state; the encrypted form is
/// kept so deletions can be pushed without re-encrypting (encryption is
/// randomized, so re-encrypting would change the wire key the server
/// knows the entry by).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Decrypted path.
    pub path: String,
    /// Encrypted path as received, hex.
    pub encrypted_path: String,
    /// Decrypted SHA-256 of the plaintext content. Empty for folders.
    pub hash: Vec<u8>,
    /// Server-assigned version id.
    pub uid: u64,
    /// Creation time, milliseconds.
    pub ctime: i64,
    /// Modification time, milliseconds.
    pub mtime: i64,
    /// Whether the entry is a folder.
    pub folder: bool,
}

/// One entry of the local file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// Plaintext path, relative to the vault root.
    pub path: String,
    /// Creation time, milliseconds.
    pub ctime: i64,
    /// Modification time, milliseconds.
    pub mtime: i64,
    /// Whether the entry is a folder.
    pub folder: bool,
    /// Version id of the last remote revision synced to this entry,
    /// 0 if the entry has never been synced.
    pub uid: u64,
}

impl LocalEntry {
    /// A file entry that has never been synced.
    pub fn new_file(path: impl Into<String>, ctime: i64, mtime: i64) -> Self {
        Self {
            path: path.into(),
            ctime,
            mtime,
            folder: false,
            uid: 0,
        }
    }

    /// A folder entry that has never been synced.
    pub fn new_folder(path: impl Into<String>, ctime: i64) -> Self {
        Self {
            path: path.into(),
            ctime,
            mtime: ctime,
            folder: true,
            uid: 0,
        }
    }
}
