//! # vaultsync-client
//!
//! Client for the vaultsync end-to-end encrypted vault protocol.
//!
//! ## Architecture
//!
//! The crate is layered; each layer only knows the one below it:
//!
//! - [`transport`] - raw frame transport ([`transport::ws::WsTransport`]
//!   for production, [`transport::mock::MockTransport`] for tests)
//! - [`channel`] - JSON/binary framing and the observable frame log
//! - [`router`] - match-and-buffer delivery of frames to waiters
//! - [`session`] - the protocol exchanges: handshake, pull, push,
//!   size query, keepalive
//! - [`engine`] - reconciliation between the local tree and the
//!   server's view
//!
//! Alongside: [`crypto`] (the encryption envelope), [`store`] (local
//! vault storage), and [`api`] (the account HTTP endpoints).
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaultsync_client::{
//!     AccountApi, FsStore, SessionConfig, SyncEngine, VaultSession,
//! };
//! use vaultsync_client::transport::ws::WsTransport;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = AccountApi::new();
//! let token = api.signin("me@example.com", "account-password").await?;
//! let vault = api.list_vaults(&token).await?.remove(0);
//!
//! let session = Arc::new(VaultSession::new(
//!     &vault,
//!     "vault-password",
//!     SessionConfig::new(token),
//!     WsTransport::new(),
//! )?);
//! let keepalive = session.spawn_keepalive();
//!
//! let mut engine = SyncEngine::new(session, FsStore::new("/path/to/vault"));
//! engine.bootstrap().await?;
//! engine.run_pass().await?;
//! keepalive.abort();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod channel;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod router;
pub mod session;
pub mod store;
pub mod transport;

pub use api::{AccountApi, ApiError};
pub use channel::{Direction, LogEntry, MessageChannel};
pub use crypto::{CryptoError, SessionKey};
pub use engine::{EngineError, PassFailure, PassReport, SyncEngine};
pub use error::SessionError;
pub use router::FrameRouter;
pub use session::{PushRequest, SessionConfig, VaultSession};
pub use store::{FsStore, MemStore, StoreError, VaultStore};
pub use transport::{Transport, TransportError};
