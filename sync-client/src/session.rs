//! The protocol session for one vault.
//!
//! A [`VaultSession`] owns the encryption key, the frame router, and
//! the lifecycle phase for one connection to one vault. It speaks the
//! exchanges of the wire protocol (handshake, size query, pull, push,
//! keepalive) and hands decrypted metadata and content to the engine
//! above it. It holds no file-tree state of its own.
//!
//! Every bounded exchange runs under the configured time budget;
//! waiting for the next live push notification does not, because a
//! quiet vault is not an error.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::channel::{LogEntry, MessageChannel};
use crate::crypto::{content_hash, CryptoError, SessionKey};
use crate::error::SessionError;
use crate::router::FrameRouter;
use crate::transport::Transport;
use sync_core::{SessionPhase, SyncState};
use sync_types::{
    ClientMessage, Frame, Op, PullHeader, PushFrame, Ready, RemoteEntry, SizeInfo, VaultIdentity,
};

/// Tuning knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Account auth token from signin.
    pub auth_token: String,
    /// Device label shown in the vault's device list.
    pub device_name: String,
    /// Time budget for each bounded exchange.
    pub exchange_timeout: Duration,
    /// Router buffer capacity.
    pub buffer_capacity: usize,
}

impl SessionConfig {
    /// Defaults with the given auth token.
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            device_name: "vaultsync".into(),
            exchange_timeout: Duration::from_secs(30),
            buffer_capacity: sync_core::buffer::DEFAULT_CAPACITY,
        }
    }
}

/// An authenticated, encrypted session with one vault.
pub struct VaultSession<T: Transport> {
    router: FrameRouter<T>,
    key: SessionKey,
    vault_id: String,
    host: String,
    config: SessionConfig,
    phase: Mutex<SessionPhase>,
}

impl<T: Transport> VaultSession<T> {
    /// Build a session for a vault, deriving the encryption key from
    /// the vault password. Derivation is CPU-heavy and happens once
    /// here.
    pub fn new(
        vault: &VaultIdentity,
        password: &str,
        config: SessionConfig,
        transport: T,
    ) -> Result<Self, CryptoError> {
        let key = SessionKey::derive(password, &vault.salt)?;
        let channel = MessageChannel::new(transport);
        let router = FrameRouter::new(channel, config.buffer_capacity);
        Ok(Self {
            router,
            key,
            vault_id: vault.id.clone(),
            host: vault.host.clone(),
            config,
            phase: Mutex::new(SessionPhase::new()),
        })
    }

    /// The channel this session runs over.
    pub fn channel(&self) -> &MessageChannel<T> {
        self.router.channel()
    }

    /// Subscribe to the live frame log.
    pub fn frame_log(&self) -> broadcast::Receiver<LogEntry> {
        self.channel().subscribe()
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        *self.phase.lock().await
    }

    /// Pings sent but not yet answered.
    pub fn outstanding_pings(&self) -> u32 {
        self.router.outstanding_pings()
    }

    /// Open the transport connection to the vault host.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.channel().connect(&self.host).await
    }

    /// Run the login handshake and fold the server's snapshot into
    /// `state`. Returns the number of snapshot entries received.
    ///
    /// Sequence: `init`, then `{res:"ok"}`, then zero or more `push`
    /// notifications, terminated by `ready`. Anything else during the
    /// burst is a protocol violation.
    pub async fn handshake(&self, state: &mut SyncState) -> Result<usize, SessionError> {
        self.advance(SessionPhase::Handshaking).await?;
        self.channel()
            .send_control(&ClientMessage::Init {
                id: self.vault_id.clone(),
                token: self.config.auth_token.clone(),
                keyhash: self.key.key_hash(),
                version: state.remote_version(),
                initial: state.last_sync_ms() == 0,
                device: self.config.device_name.clone(),
            })
            .await?;

        let ack = self.timed("handshake ack", self.router.next()).await?;
        if ack.ack() != Some(Op::Ok) {
            return Err(SessionError::AuthenticationFailed(ack.to_string()));
        }
        self.advance(SessionPhase::AwaitingSnapshot).await?;

        let mut received = 0usize;
        loop {
            let frame = self.timed("snapshot", self.router.next()).await?;
            match frame.op() {
                Some(Op::Push) => {
                    let push: PushFrame = frame.decode()?;
                    let deleted = push.deleted;
                    let entry = self.decrypt_push(&push)?;
                    state.apply_remote(entry, deleted);
                    received += 1;
                }
                Some(Op::Ready) => {
                    let ready: Ready = frame.decode()?;
                    state.set_remote_version(ready.version);
                    break;
                }
                _ => return Err(SessionError::ProtocolViolation { frame }),
            }
        }
        self.advance(SessionPhase::Ready).await?;
        tracing::info!(
            vault = %self.vault_id,
            entries = received,
            version = state.remote_version(),
            "handshake complete"
        );
        Ok(received)
    }

    /// Query the vault's storage usage and quota.
    pub async fn query_size(&self) -> Result<SizeInfo, SessionError> {
        self.channel().send_control(&ClientMessage::Size).await?;
        // The response carries no op tag; match it by key set.
        let frame = self
            .timed("size query", self.router.await_keys(&["size", "limit"]))
            .await?;
        Ok(frame.decode()?)
    }

    /// Pull and decrypt the content of one file version.
    ///
    /// The received ciphertext length is checked against the header
    /// before any decryption, then the plaintext hash is checked
    /// against the header's (decrypted) expected hash.
    pub async fn pull_file(&self, uid: u64) -> Result<Vec<u8>, SessionError> {
        self.advance(SessionPhase::Pulling).await?;
        let result = self.pull_inner(uid).await;
        self.advance(SessionPhase::Ready).await?;
        result
    }

    async fn pull_inner(&self, uid: u64) -> Result<Vec<u8>, SessionError> {
        self.channel()
            .send_control(&ClientMessage::Pull { uid })
            .await?;

        let frame = self
            .timed(
                "pull header",
                self.router.await_keys(&["hash", "size", "pieces"]),
            )
            .await?;
        let header: PullHeader = frame.decode()?;

        let mut transfer = PendingTransfer::new(uid, &header);
        for _ in 0..header.pieces {
            let piece = self.timed("pull piece", self.router.await_binary()).await?;
            if let Some(bytes) = piece.into_binary() {
                transfer.absorb(bytes);
            }
        }
        let sealed = transfer.into_verified()?;

        let plaintext = self.key.decrypt(&sealed)?;
        let expected = self.key.decrypt_hex(&header.hash)?;
        if content_hash(&plaintext) != expected {
            return Err(SessionError::IntegrityFailure(
                "content hash mismatch after decryption".into(),
            ));
        }
        Ok(plaintext)
    }

    /// Push one entry to the server, returning the server's echoed
    /// notification (which carries the assigned version id).
    ///
    /// Folders and deletions send a descriptor only; files send their
    /// sealed content in one binary frame after the `{res:"next"}`
    /// go-ahead. Any deviation from the acknowledgment sequence rejects
    /// the push.
    pub async fn push_entry(&self, request: PushRequest<'_>) -> Result<PushFrame, SessionError> {
        self.advance(SessionPhase::Pushing).await?;
        let result = self.push_inner(request).await;
        self.advance(SessionPhase::Ready).await?;
        result
    }

    async fn push_inner(&self, request: PushRequest<'_>) -> Result<PushFrame, SessionError> {
        let encrypted_path = hex::encode(self.key.encrypt(request.path.as_bytes())?);
        let (hash, size, pieces, payload) = if request.folder || request.deleted {
            (String::new(), 0, 0, None)
        } else {
            let digest = content_hash(request.content);
            let hash = hex::encode(self.key.encrypt(&digest)?);
            let sealed = self.key.encrypt(request.content)?;
            let size = sealed.len() as u64;
            (hash, size, 1, Some(sealed))
        };

        self.channel()
            .send_control(&ClientMessage::Push {
                path: encrypted_path,
                extension: extension_of(request.path).to_string(),
                hash,
                ctime: request.ctime,
                mtime: request.mtime,
                folder: request.folder,
                deleted: request.deleted,
                size,
                pieces,
            })
            .await?;

        let ack = self
            .timed("push ack", self.router.await_matching(|f| f.ack().is_some()))
            .await?;
        if ack.ack() != Some(Op::Next) {
            return Err(push_rejected("go-ahead", &ack));
        }

        if let Some(payload) = payload {
            self.channel().send_binary(payload).await?;
        }

        let echo = self.timed("push echo", self.router.await_op(Op::Push)).await?;
        let echo: PushFrame = echo.decode()?;

        self.timed("push done", self.router.await_op(Op::Ok)).await?;
        Ok(echo)
    }

    /// Wait for the next live push notification. No time budget: a
    /// quiet vault can stay quiet indefinitely.
    pub async fn next_push(&self) -> Result<PushFrame, SessionError> {
        let frame = self.router.await_op(Op::Push).await?;
        Ok(frame.decode()?)
    }

    /// Decrypt a push notification's path and hash into a remote entry.
    pub fn decrypt_push(&self, push: &PushFrame) -> Result<RemoteEntry, SessionError> {
        Ok(RemoteEntry {
            path: self.key.decrypt_hex_string(&push.path)?,
            encrypted_path: push.path.clone(),
            hash: self.key.decrypt_hex(&push.hash)?,
            uid: push.uid,
            ctime: push.ctime,
            mtime: push.mtime,
            folder: push.folder,
        })
    }

    /// Spawn the keepalive loop: a `ping` every 20 to 30 seconds until
    /// the session closes or a send fails.
    pub fn spawn_keepalive(self: &Arc<Self>) -> JoinHandle<()>
    where
        T: 'static,
    {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(keepalive_interval()).await;
                if session.phase().await.is_closed() {
                    break;
                }
                if let Err(error) = session.channel().send_control(&ClientMessage::Ping).await {
                    tracing::debug!(%error, "keepalive loop ending");
                    break;
                }
                session.router.note_ping_sent();
            }
        })
    }

    /// Close the session and its transport.
    pub async fn close(&self) {
        {
            let mut guard = self.phase.lock().await;
            if let Ok(next) = guard.advance(SessionPhase::Closed) {
                *guard = next;
            }
        }
        self.channel().close().await;
    }

    async fn advance(&self, to: SessionPhase) -> Result<(), SessionError> {
        let mut guard = self.phase.lock().await;
        *guard = guard.advance(to)?;
        Ok(())
    }

    async fn timed<F, R>(&self, what: &'static str, fut: F) -> Result<R, SessionError>
    where
        F: std::future::Future<Output = Result<R, SessionError>>,
    {
        match tokio::time::timeout(self.config.exchange_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::TimeoutExceeded {
                what,
                secs: self.config.exchange_timeout.as_secs(),
            }),
        }
    }
}

/// One in-flight pull: expected totals from the header plus the
/// ciphertext accumulated so far. Exists only for the duration of the
/// transfer.
struct PendingTransfer {
    uid: u64,
    expected_size: u64,
    bytes: Vec<u8>,
}

impl PendingTransfer {
    fn new(uid: u64, header: &PullHeader) -> Self {
        Self {
            uid,
            expected_size: header.size,
            bytes: Vec::with_capacity(header.size as usize),
        }
    }

    fn absorb(&mut self, piece: Vec<u8>) {
        self.bytes.extend_from_slice(&piece);
    }

    /// Length check against the header, before any decryption.
    fn into_verified(self) -> Result<Vec<u8>, SessionError> {
        if self.bytes.len() as u64 != self.expected_size {
            return Err(SessionError::IntegrityFailure(format!(
                "pull of uid {}: received {} ciphertext bytes, header declared {}",
                self.uid,
                self.bytes.len(),
                self.expected_size
            )));
        }
        Ok(self.bytes)
    }
}

/// One entry to push: metadata plus plaintext content (empty for
/// folders and deletions).
#[derive(Debug, Clone, Copy)]
pub struct PushRequest<'a> {
    /// Plaintext vault-relative path.
    pub path: &'a str,
    /// Creation time, milliseconds.
    pub ctime: i64,
    /// Modification time, milliseconds.
    pub mtime: i64,
    /// Whether the entry is a folder.
    pub folder: bool,
    /// Whether the entry is being deleted.
    pub deleted: bool,
    /// Plaintext content.
    pub content: &'a [u8],
}

fn push_rejected(expected: &str, frame: &Frame) -> SessionError {
    SessionError::PushRejected(format!("expected {expected}, got {frame}"))
}

fn extension_of(path: &str) -> &str {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

fn keepalive_interval() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(20_000..30_000))
}
