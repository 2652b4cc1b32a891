//! The reconciliation engine.
//!
//! Owns the [`SyncState`] for a session and turns reconciliation plans
//! into pull, push, and delete traffic. One pass executes its decision
//! sets in a fixed order (deletes, folder creations, pulls, pushes) and
//! keeps going past per-file failures; only connection loss aborts a
//! pass. Conflicts are reported, never resolved.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::error::SessionError;
use crate::session::{PushRequest, VaultSession};
use crate::store::{StoreError, VaultStore};
use crate::transport::Transport;
use sync_core::{plan, ReconcilePlan, SyncState};

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A protocol operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A local storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Session(e) if e.is_fatal())
    }
}

/// One per-file failure inside an otherwise-continuing pass.
#[derive(Debug)]
pub struct PassFailure {
    /// The path the operation was about.
    pub path: String,
    /// What went wrong.
    pub error: EngineError,
}

/// What one reconciliation pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Paths pulled from the server.
    pub pulled: Vec<String>,
    /// Paths pushed to the server.
    pub pushed: Vec<String>,
    /// Paths deleted locally.
    pub deleted: Vec<String>,
    /// Folders created locally.
    pub folders_created: Vec<String>,
    /// Paths in conflict, left untouched.
    pub conflicts: Vec<String>,
    /// Per-file failures the pass continued past.
    pub failures: Vec<PassFailure>,
}

impl PassReport {
    /// Whether everything the plan asked for succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the pass had any effect at all.
    pub fn is_noop(&self) -> bool {
        self.pulled.is_empty()
            && self.pushed.is_empty()
            && self.deleted.is_empty()
            && self.folders_created.is_empty()
            && self.conflicts.is_empty()
            && self.failures.is_empty()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pulled {}, pushed {}, deleted {}, folders {}, conflicts {}, failures {}",
            self.pulled.len(),
            self.pushed.len(),
            self.deleted.len(),
            self.folders_created.len(),
            self.conflicts.len(),
            self.failures.len()
        )
    }
}

/// The sync engine for one vault session.
pub struct SyncEngine<T: Transport, S: VaultStore> {
    session: Arc<VaultSession<T>>,
    store: S,
    state: SyncState,
}

impl<T: Transport, S: VaultStore> SyncEngine<T, S> {
    /// Build an engine over a session and a local store.
    pub fn new(session: Arc<VaultSession<T>>, store: S) -> Self {
        Self {
            session,
            store,
            state: SyncState::new(),
        }
    }

    /// The current sync state.
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// The session this engine drives.
    pub fn session(&self) -> &Arc<VaultSession<T>> {
        &self.session
    }

    /// Scan the local tree, connect, handshake, and query usage.
    pub async fn bootstrap(&mut self) -> Result<(), EngineError> {
        let entries = self.store.scan().await?;
        self.state.seed_local(entries);

        self.session.connect().await?;
        self.session.handshake(&mut self.state).await?;

        let info = self.session.query_size().await?;
        self.state.record_usage(info.size, info.limit);
        tracing::info!(usage = info.size, quota = info.limit, "vault usage");
        Ok(())
    }

    /// Run one reconciliation pass.
    ///
    /// Per-file failures are collected in the report and the pass
    /// continues; a fatal error (connection loss) aborts it. The
    /// last-sync stamp advances only after a clean pass, so nothing
    /// that failed gets misjudged as stale next time.
    pub async fn run_pass(&mut self) -> Result<PassReport, EngineError> {
        let ReconcilePlan {
            deletes,
            create_folders,
            pulls,
            pushes,
            conflicts,
        } = plan(&self.state);
        let mut report = PassReport::default();

        for path in conflicts {
            tracing::warn!(%path, "modified on both sides, leaving untouched");
            report.conflicts.push(path);
        }

        for path in deletes {
            match self.store.remove(&path).await {
                Ok(()) => {
                    self.state.record_deleted(&path);
                    report.deleted.push(path);
                }
                Err(error) => report.failures.push(PassFailure {
                    path,
                    error: error.into(),
                }),
            }
        }

        for path in create_folders {
            match self.store.create_folder(&path).await {
                Ok(()) => {
                    self.state.record_pulled(&path);
                    report.folders_created.push(path);
                }
                Err(error) => report.failures.push(PassFailure {
                    path,
                    error: error.into(),
                }),
            }
        }

        for path in pulls {
            match self.pull_one(&path).await {
                Ok(()) => report.pulled.push(path),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::warn!(%path, %error, "pull failed");
                    report.failures.push(PassFailure { path, error });
                }
            }
        }

        for path in pushes {
            match self.push_one(&path).await {
                Ok(()) => report.pushed.push(path),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::warn!(%path, %error, "push failed");
                    report.failures.push(PassFailure { path, error });
                }
            }
        }

        if report.is_clean() {
            self.state.mark_synced(now_ms());
        }
        tracing::info!(%report, "pass complete");
        Ok(report)
    }

    /// Watch for live pushes and reconcile after each, indefinitely.
    pub async fn watch(&mut self) -> Result<(), EngineError> {
        loop {
            let push = self.session.next_push().await?;
            let deleted = push.deleted;
            let entry = self.session.decrypt_push(&push)?;
            let path = self.state.apply_remote(entry, deleted);
            tracing::info!(%path, deleted, "remote change");
            self.run_pass().await?;
        }
    }

    async fn pull_one(&mut self, path: &str) -> Result<(), EngineError> {
        let Some(uid) = self.state.remote().get(path).map(|e| e.uid) else {
            return Ok(());
        };
        let content = self.session.pull_file(uid).await?;
        self.store.write(path, &content).await?;
        self.state.record_pulled(path);
        Ok(())
    }

    async fn push_one(&mut self, path: &str) -> Result<(), EngineError> {
        let Some(local) = self.state.local().get(path).cloned() else {
            return Ok(());
        };
        let content = if local.folder {
            Vec::new()
        } else {
            self.store.read(path).await?
        };
        let echo = self
            .session
            .push_entry(PushRequest {
                path,
                ctime: local.ctime,
                mtime: local.mtime,
                folder: local.folder,
                deleted: false,
                content: &content,
            })
            .await?;
        let deleted = echo.deleted;
        let entry = self.session.decrypt_push(&echo)?;
        let uid = entry.uid;
        self.state.apply_remote(entry, deleted);
        self.state.record_pushed(path, uid);
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{content_hash, SessionKey};
    use crate::session::SessionConfig;
    use crate::store::MemStore;
    use crate::transport::mock::{MockTransport, SentFrame};
    use std::time::Duration;
    use sync_types::VaultIdentity;

    const PASSWORD: &str = "vault-password";
    const SALT: &str = "vault-salt";

    fn fixture_key() -> SessionKey {
        SessionKey::derive(PASSWORD, SALT).unwrap()
    }

    fn engine() -> SyncEngine<MockTransport, MemStore> {
        let vault = VaultIdentity {
            id: "vault-1".into(),
            name: "My Vault".into(),
            host: "sync.example.com".into(),
            password: PASSWORD.into(),
            salt: SALT.into(),
        };
        let config = SessionConfig {
            exchange_timeout: Duration::from_millis(500),
            ..SessionConfig::new("auth-token")
        };
        let session = VaultSession::new(&vault, PASSWORD, config, MockTransport::new()).unwrap();
        SyncEngine::new(Arc::new(session), MemStore::new())
    }

    fn transport(engine: &SyncEngine<MockTransport, MemStore>) -> &MockTransport {
        engine.session.channel().transport()
    }

    fn seal_hex(key: &SessionKey, plaintext: &[u8]) -> String {
        hex::encode(key.encrypt(plaintext).unwrap())
    }

    fn push_json(key: &SessionKey, path: &str, content: &[u8], uid: u64, mtime: i64) -> String {
        serde_json::json!({
            "op": "push",
            "path": seal_hex(key, path.as_bytes()),
            "hash": seal_hex(key, &content_hash(content)),
            "ctime": mtime,
            "mtime": mtime,
            "folder": false,
            "deleted": false,
            "uid": uid,
        })
        .to_string()
    }

    fn queue_bootstrap(
        engine: &SyncEngine<MockTransport, MemStore>,
        snapshot: &[String],
        version: u64,
    ) {
        let t = transport(engine);
        t.queue_text(r#"{"res":"ok"}"#);
        for frame in snapshot {
            t.queue_text(frame.clone());
        }
        t.queue_text(format!(r#"{{"op":"ready","version":{version}}}"#));
        t.queue_text(r#"{"size":1000,"limit":10000}"#);
    }

    fn queue_pull(engine: &SyncEngine<MockTransport, MemStore>, key: &SessionKey, content: &[u8]) {
        let sealed = key.encrypt(content).unwrap();
        let header = serde_json::json!({
            "hash": seal_hex(key, &content_hash(content)),
            "size": sealed.len(),
            "pieces": 1,
        });
        let t = transport(engine);
        t.queue_text(header.to_string());
        t.queue_binary(sealed);
    }

    #[tokio::test]
    async fn first_sync_pulls_the_snapshot() {
        let key = fixture_key();
        let mut engine = engine();
        queue_bootstrap(
            &engine,
            &[push_json(&key, "notes/a.md", b"alpha", 3, 100)],
            5,
        );
        queue_pull(&engine, &key, b"alpha");

        engine.bootstrap().await.unwrap();
        assert_eq!(engine.state().usage(), Some((1000, 10000)));

        let report = engine.run_pass().await.unwrap();
        assert_eq!(report.pulled, vec!["notes/a.md"]);
        assert!(report.is_clean());
        assert_eq!(engine.store.content("notes/a.md").unwrap(), b"alpha");
        assert_eq!(engine.state().local()["notes/a.md"].uid, 3);
        assert!(engine.state().last_sync_ms() > 0);
    }

    #[tokio::test]
    async fn remote_folder_is_materialized() {
        let key = fixture_key();
        let mut engine = engine();
        let folder = serde_json::json!({
            "op": "push",
            "path": seal_hex(&key, b"attachments"),
            "folder": true,
            "uid": 2,
        })
        .to_string();
        queue_bootstrap(&engine, &[folder], 3);

        engine.bootstrap().await.unwrap();
        let report = engine.run_pass().await.unwrap();

        assert_eq!(report.folders_created, vec!["attachments"]);
        assert!(engine.store.has_folder("attachments"));
    }

    #[tokio::test]
    async fn fresh_local_file_is_pushed() {
        let key = fixture_key();
        let mut engine = engine();
        engine.store.stage_file("new.md", b"fresh", 100, 100);
        queue_bootstrap(&engine, &[], 1);
        // Push sequence: go-ahead, echo, terminal ack.
        let t = transport(&engine);
        t.queue_text(r#"{"res":"next"}"#);
        t.queue_text(push_json(&key, "new.md", b"fresh", 8, 100));
        t.queue_text(r#"{"op":"ok"}"#);

        engine.bootstrap().await.unwrap();
        let report = engine.run_pass().await.unwrap();

        assert_eq!(report.pushed, vec!["new.md"]);
        // The echoed notification updated both views.
        assert_eq!(engine.state().remote()["new.md"].uid, 8);
        assert_eq!(engine.state().local()["new.md"].uid, 8);

        let binary_sent = transport(&engine)
            .sent()
            .iter()
            .any(|f| matches!(f, SentFrame::Binary(_)));
        assert!(binary_sent, "file push must carry a payload");
    }

    #[tokio::test]
    async fn conflicts_are_reported_and_left_alone() {
        let key = fixture_key();
        let mut engine = engine();
        // Remote at uid 9 / mtime 100; local edited later but never saw
        // uid 9.
        engine.store.stage_file("both.md", b"mine", 10, 300);
        queue_bootstrap(&engine, &[push_json(&key, "both.md", b"theirs", 9, 100)], 9);

        engine.bootstrap().await.unwrap();
        let report = engine.run_pass().await.unwrap();

        assert_eq!(report.conflicts, vec!["both.md"]);
        assert!(report.pulled.is_empty() && report.pushed.is_empty());
        assert_eq!(engine.store.content("both.md").unwrap(), b"mine");
    }

    #[tokio::test]
    async fn pass_continues_past_a_bad_pull() {
        let key = fixture_key();
        let mut engine = engine();
        queue_bootstrap(
            &engine,
            &[
                push_json(&key, "bad.md", b"expected", 1, 100),
                push_json(&key, "good.md", b"fine", 2, 100),
            ],
            2,
        );
        // First pull delivers content that fails the hash check, second
        // is healthy.
        let sealed = key.encrypt(b"tampered").unwrap();
        let t = transport(&engine);
        t.queue_text(
            serde_json::json!({
                "hash": seal_hex(&key, &content_hash(b"expected")),
                "size": sealed.len(),
                "pieces": 1,
            })
            .to_string(),
        );
        t.queue_binary(sealed);
        queue_pull(&engine, &key, b"fine");

        engine.bootstrap().await.unwrap();
        let report = engine.run_pass().await.unwrap();

        assert_eq!(report.pulled, vec!["good.md"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "bad.md");
        assert!(engine.store.content("bad.md").is_none());
        // Dirty pass: the stamp must not advance.
        assert_eq!(engine.state().last_sync_ms(), 0);
    }

    #[tokio::test]
    async fn stale_local_entry_is_deleted_after_remote_removal() {
        let key = fixture_key();
        let mut engine = engine();
        engine.store.stage_file("kept.md", b"kept", 10, 10);
        engine.store.stage_file("gone.md", b"gone", 10, 10);
        queue_bootstrap(&engine, &[push_json(&key, "kept.md", b"kept", 1, 10)], 1);

        engine.bootstrap().await.unwrap();
        // A prior pass completed; both files predate it.
        engine.state.mark_synced(500);

        let report = engine.run_pass().await.unwrap();
        assert_eq!(report.deleted, vec!["gone.md"]);
        assert!(engine.store.content("gone.md").is_none());
        assert_eq!(engine.store.content("kept.md").unwrap(), b"kept");
    }

    #[tokio::test]
    async fn watch_applies_a_live_deletion() {
        let key = fixture_key();
        let mut engine = engine();
        queue_bootstrap(&engine, &[push_json(&key, "doomed.md", b"bye", 4, 100)], 4);
        queue_pull(&engine, &key, b"bye");

        engine.bootstrap().await.unwrap();
        engine.run_pass().await.unwrap();
        assert!(engine.store.content("doomed.md").is_some());

        // A live deletion arrives, then the script ends.
        let deletion = serde_json::json!({
            "op": "push",
            "path": seal_hex(&key, b"doomed.md"),
            "deleted": true,
            "uid": 5,
        })
        .to_string();
        transport(&engine).queue_text(deletion);

        let err = engine.watch().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Session(SessionError::ConnectionLost(_))
        ));
        assert!(engine.store.content("doomed.md").is_none());
        assert!(engine.state().remote().get("doomed.md").is_none());
    }

    #[tokio::test]
    async fn noop_pass_reports_nothing() {
        let engine_report = {
            let mut engine = engine();
            queue_bootstrap(&engine, &[], 1);
            engine.bootstrap().await.unwrap();
            engine.run_pass().await.unwrap()
        };
        assert!(engine_report.is_noop());
    }
}
