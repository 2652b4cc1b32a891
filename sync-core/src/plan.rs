//! The reconciliation planner.
//!
//! One pass over the two entry maps produces four disjoint decision
//! sets (pull, push, delete, conflict) plus the folders to create.
//! Planning is pure and deterministic: the maps iterate in path order,
//! so a fixed (local, remote, last-sync) input always yields the same
//! plan.
//!
//! Conflicts are never resolved here or anywhere else in the engine;
//! they are surfaced for external decision.

use crate::state::SyncState;
use sync_types::{LocalEntry, RemoteEntry};

/// The actions decided by one reconciliation pass.
///
/// Execution order is fixed: local deletions first, then folder
/// creations, then pulls, then pushes. Deleting first keeps a pull
/// from writing into a location a pending deletion would remove, and
/// creating folders first guarantees a parent exists before a file is
/// placed in it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Paths to delete locally.
    pub deletes: Vec<String>,
    /// Folders to create locally.
    pub create_folders: Vec<String>,
    /// Paths to pull from the server.
    pub pulls: Vec<String>,
    /// Paths to push to the server.
    pub pushes: Vec<String>,
    /// Paths modified on both sides with no unambiguous winner.
    pub conflicts: Vec<String>,
}

impl ReconcilePlan {
    /// Whether the pass has nothing to do (conflicts included: they
    /// require no engine action, only reporting).
    pub fn is_noop(&self) -> bool {
        self.deletes.is_empty()
            && self.create_folders.is_empty()
            && self.pulls.is_empty()
            && self.pushes.is_empty()
    }
}

/// Compute the decision sets for the current state.
pub fn plan(state: &SyncState) -> ReconcilePlan {
    let mut out = ReconcilePlan::default();

    for (path, remote) in state.remote() {
        match state.local().get(path) {
            None => schedule_materialize(&mut out, path, remote),
            Some(local) if local.folder != remote.folder => {
                // Kind mismatch: the local entry goes first, then the
                // remote kind is materialized in its place.
                out.deletes.push(path.clone());
                schedule_materialize(&mut out, path, remote);
            }
            Some(local) if !remote.folder => classify_file(&mut out, path, local, remote),
            // Both folders: nothing to do.
            Some(_) => {}
        }
    }

    for (path, local) in state.local() {
        if state.remote().contains_key(path) {
            continue;
        }
        // Absent remotely. An entry created before the last completed
        // pass existed while the server's view was authoritative, so
        // its absence means a remote deletion; anything newer is a
        // local creation that has never been pushed.
        if local.ctime < state.last_sync_ms() {
            out.deletes.push(path.clone());
        } else {
            out.pushes.push(path.clone());
        }
    }

    out
}

fn schedule_materialize(out: &mut ReconcilePlan, path: &str, remote: &RemoteEntry) {
    if remote.folder {
        out.create_folders.push(path.to_string());
    } else {
        out.pulls.push(path.to_string());
    }
}

fn classify_file(out: &mut ReconcilePlan, path: &str, local: &LocalEntry, remote: &RemoteEntry) {
    if remote.mtime > local.mtime {
        out.pulls.push(path.to_string());
    } else if local.mtime > remote.mtime {
        if local.uid < remote.uid {
            // The server holds a revision this client never synced
            // while the local copy was also edited: neither side is
            // unambiguously newer.
            out.conflicts.push(path.to_string());
        } else {
            out.pushes.push(path.to_string());
        }
    }
    // Equal modification times: in sync, nothing to do.
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{LocalEntry, RemoteEntry};

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

    fn remote_folder(path: &str, uid: u64) -> RemoteEntry {
        RemoteEntry {
            path: path.into(),
            encrypted_path: format!("enc:{path}"),
            hash: Vec::new(),
            uid,
            ctime: 0,
            mtime: 0,
            folder: true,
        }
    }

    fn local_file(path: &str, uid: u64, ctime: i64, mtime: i64) -> LocalEntry {
        LocalEntry {
            path: path.into(),
            ctime,
            mtime,
            folder: false,
            uid,
        }
    }

    #[test]
    fn remote_only_file_is_pulled() {
        // Scenario: empty local tree, one remote file.
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 1, 100), false);

        let plan = plan(&state);
        assert_eq!(plan.pulls, vec!["a.md"]);
        assert!(plan.pushes.is_empty());
        assert!(plan.deletes.is_empty());
        assert!(plan.conflicts.is_empty());
    }

    #[test]
    fn remote_only_folder_is_created_not_pulled() {
        let mut state = SyncState::new();
        state.apply_remote(remote_folder("notes", 1), false);

        let plan = plan(&state);
        assert_eq!(plan.create_folders, vec!["notes"]);
        assert!(plan.pulls.is_empty());
    }

    #[test]
    fn local_file_created_after_last_sync_is_pushed() {
        // Scenario: local file with no remote counterpart, created
        // after the last completed pass. Staleness is judged by
        // creation time, not modification time.
        let mut state = SyncState::new();
        state.mark_synced(50);
        state.seed_local([local_file("x.md", 0, 200, 200)]);

        let plan = plan(&state);
        assert_eq!(plan.pushes, vec!["x.md"]);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn local_file_created_before_last_sync_is_stale() {
        // The entry predates the last pass but the server no longer
        // has it: it was deleted remotely.
        let mut state = SyncState::new();
        state.mark_synced(50);
        state.seed_local([local_file("x.md", 3, 10, 200)]);

        let plan = plan(&state);
        assert_eq!(plan.deletes, vec!["x.md"]);
        assert!(plan.pushes.is_empty());
    }

    #[test]
    fn newer_remote_mtime_is_pulled() {
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 5, 300), false);
        state.seed_local([local_file("a.md", 4, 100, 100)]);

        let plan = plan(&state);
        assert_eq!(plan.pulls, vec!["a.md"]);
    }

    #[test]
    fn local_ahead_in_time_and_version_is_pushed_not_conflicting() {
        // Scenario: local mtime 300 vs remote 100, and the local entry
        // already holds the remote's revision.
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 5, 100), false);
        state.seed_local([local_file("a.md", 5, 100, 300)]);

        let plan = plan(&state);
        assert_eq!(plan.pushes, vec!["a.md"]);
        assert!(plan.conflicts.is_empty());
    }

    #[test]
    fn local_newer_but_version_behind_is_conflict_only() {
        // Edited locally while the server advanced past us: conflict,
        // and a conflict appears in no other set.
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 9, 100), false);
        state.seed_local([local_file("a.md", 5, 100, 300)]);

        let plan = plan(&state);
        assert_eq!(plan.conflicts, vec!["a.md"]);
        assert!(plan.pulls.is_empty());
        assert!(plan.pushes.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn equal_mtimes_do_nothing() {
        let mut state = SyncState::new();
        state.apply_remote(remote_file("a.md", 5, 100), false);
        state.seed_local([local_file("a.md", 5, 100, 100)]);

        assert!(plan(&state).is_noop());
    }

    #[test]
    fn kind_mismatch_deletes_before_creating() {
        // Local file where the server has a folder: the delete must be
        // scheduled, and deletes execute before creations.
        let mut state = SyncState::new();
        state.apply_remote(remote_folder("thing", 2), false);
        state.seed_local([local_file("thing", 1, 10, 10)]);

        let plan = plan(&state);
        assert_eq!(plan.deletes, vec!["thing"]);
        assert_eq!(plan.create_folders, vec!["thing"]);
    }

    #[test]
    fn kind_mismatch_folder_to_file() {
        let mut state = SyncState::new();
        state.apply_remote(remote_file("thing", 2, 100), false);
        state.seed_local([LocalEntry::new_folder("thing", 10)]);

        let plan = plan(&state);
        assert_eq!(plan.deletes, vec!["thing"]);
        assert_eq!(plan.pulls, vec!["thing"]);
    }

    #[test]
    fn planning_is_deterministic() {
        let mut state = SyncState::new();
        state.mark_synced(50);
        state.apply_remote(remote_file("a.md", 5, 300), false);
        state.apply_remote(remote_file("b.md", 6, 100), false);
        state.apply_remote(remote_folder("dir", 7), false);
        state.seed_local([
            local_file("a.md", 4, 10, 100),
            local_file("b.md", 4, 10, 300),
            local_file("c.md", 0, 200, 200),
            local_file("d.md", 2, 10, 10),
        ]);

        let first = plan(&state);
        let second = plan(&state);
        assert_eq!(first, second);
    }

    #[test]
    fn decision_sets_are_disjoint() {
        let mut state = SyncState::new();
        state.mark_synced(50);
        state.apply_remote(remote_file("pull.md", 5, 300), false);
        state.apply_remote(remote_file("conflict.md", 9, 100), false);
        state.apply_remote(remote_folder("dir", 7), false);
        state.seed_local([
            local_file("pull.md", 4, 10, 100),
            local_file("conflict.md", 5, 10, 300),
            local_file("push.md", 0, 200, 200),
            local_file("stale.md", 2, 10, 10),
        ]);

        let plan = plan(&state);
        let mut all: Vec<&String> = plan
            .deletes
            .iter()
            .chain(&plan.create_folders)
            .chain(&plan.pulls)
            .chain(&plan.pushes)
            .chain(&plan.conflicts)
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total, "a path appeared in more than one set");
    }
}
