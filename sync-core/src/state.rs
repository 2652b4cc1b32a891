//! Reconciled view of the local and remote file trees.
//!
//! Exactly one [`SyncState`] exists per active session. It is owned by
//! the engine and mutated only through the entry points here; protocol
//! code never touches the maps directly. Both maps are keyed by the
//! decrypted path, the only key space in which local and remote
//! entries are comparable.

use std::collections::BTreeMap;
use sync_types::{LocalEntry, RemoteEntry};

/// The aggregate sync state for one session.
#[derive(Debug, Default)]
pub struct SyncState {
    remote: BTreeMap<String, RemoteEntry>,
    local: BTreeMap<String, LocalEntry>,
    /// Timestamp (ms) of the last pass that ran to completion.
    last_sync_ms: i64,
    /// The server's version counter from the latest `ready` frame.
    remote_version: u64,
    /// Last reported (usage, quota) in bytes.
    usage: Option<(u64, u64)>,
}

impl SyncState {
    /// Empty state for a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decrypted push notification into the remote view.
    ///
    /// A deletion removes the key outright; the maps hold no
    /// tombstones. Returns the decrypted path the notification was
    /// about.
    pub fn apply_remote(&mut self, entry: RemoteEntry, deleted: bool) -> String {
        let path = entry.path.clone();
        if deleted {
            self.remote.remove(&path);
        } else {
            self.remote.insert(path.clone(), entry);
        }
        path
    }

    /// Replace the local view with the result of a filesystem scan.
    pub fn seed_local(&mut self, entries: impl IntoIterator<Item = LocalEntry>) {
        self.local = entries
            .into_iter()
            .map(|e| (e.path.clone(), e))
            .collect();
    }

    /// Record a completed pull: the local entry now mirrors the remote.
    pub fn record_pulled(&mut self, path: &str) {
        if let Some(remote) = self.remote.get(path) {
            self.local.insert(
                path.to_string(),
                LocalEntry {
                    path: remote.path.clone(),
                    ctime: remote.ctime,
                    mtime: remote.mtime,
                    folder: remote.folder,
                    uid: remote.uid,
                },
            );
        }
    }

    /// Record a completed push, marking the local entry as synced at
    /// the given remote version.
    pub fn record_pushed(&mut self, path: &str, uid: u64) {
        if let Some(local) = self.local.get_mut(path) {
            local.uid = uid;
        }
    }

    /// Record a completed local deletion.
    pub fn record_deleted(&mut self, path: &str) {
        self.local.remove(path);
    }

    /// Stamp the completion of a reconciliation pass.
    pub fn mark_synced(&mut self, now_ms: i64) {
        self.last_sync_ms = now_ms;
    }

    /// Record the server's version counter.
    pub fn set_remote_version(&mut self, version: u64) {
        self.remote_version = version;
    }

    /// Record the reported usage and quota.
    pub fn record_usage(&mut self, size: u64, limit: u64) {
        self.usage = Some((size, limit));
    }

    /// The remote file tree, keyed by decrypted path.
    pub fn remote(&self) -> &BTreeMap<String, RemoteEntry> {
        &self.remote
    }

    /// The local file tree, keyed by plaintext path.
    pub fn local(&self) -> &BTreeMap<String, LocalEntry> {
        &self.local
    }

    /// Timestamp of the last completed pass, 0 if none.
    pub fn last_sync_ms(&self) -> i64 {
        self.last_sync_ms
    }

    /// The server's version counter, 0 before the handshake.
    pub fn remote_version(&self) -> u64 {
        self.remote_version
    }

    /// Last reported (usage, quota), if a size query has run.
    pub fn usage(&self) -> Option<(u64, u64)> {
        self.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_file(path: &str, uid: u64, mtime: i64) -> RemoteEntry {
        RemoteEntry {
            path: path.into(),
            encrypted_path: format!("enc:{path}"),
            hash: vec![0xAB],
            uid,
            ctime: mtime,
            mtime,
            folder: false,
        }
    }

    #[test]
    fn apply_remote_inserts_and_updates() {
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 1, 100), false);
        state.apply_remote(remote_file("a.md", 2, 200), false);

        let entry = &state.remote()["a.md"];
        assert_eq!(entry.uid, 2);
        assert_eq!(entry.mtime, 200);
    }

    #[test]
    fn deletion_removes_key_without_tombstone() {
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 1, 100), false);
        state.apply_remote(remote_file("a.md", 2, 200), true);

        assert!(state.remote().is_empty());
    }

    #[test]
    fn record_pulled_mirrors_remote_entry() {
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 7, 300), false);
        state.record_pulled("a.md");

        let local = &state.local()["a.md"];
        assert_eq!(local.uid, 7);
        assert_eq!(local.mtime, 300);
        assert!(!local.folder);
    }

    #[test]
    fn record_pushed_updates_synced_version() {
        let mut state = SyncState::new();
        state.seed_local([LocalEntry::new_file("a.md", 10, 20)]);
        state.record_pushed("a.md", 9);

        assert_eq!(state.local()["a.md"].uid, 9);
    }

    #[test]
    fn record_deleted_removes_local_entry() {
        let mut state = SyncState::new();
        state.seed_local([LocalEntry::new_file("a.md", 10, 20)]);
        state.record_deleted("a.md");

        assert!(state.local().is_empty());
    }

    #[test]
    fn bookkeeping_fields_round_trip() {
        let mut state = SyncState::new();
        state.mark_synced(12345);
        state.set_remote_version(42);
        state.record_usage(100, 1000);

        assert_eq!(state.last_sync_ms(), 12345);
        assert_eq!(state.remote_version(), 42);
        assert_eq!(state.usage(), Some((100, 1000)));
    }
}
