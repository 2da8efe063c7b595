//! Durable storage for in-flight authorization sessions, one-time codes and
//! refresh-token chains.
//!
//! All protocol invariants that outlive a single request live here. Two
//! operations carry hard atomicity requirements and are implemented as a
//! single store operation in every backend, never as a read followed by a
//! separate write:
//!
//! - `consume_code`: exactly one exchange of a given code may succeed
//! - `rotate_refresh`: exactly one concurrent use of a refresh token may win
//!
//! Expired rows are excluded by every read; nothing relies on a background
//! sweeper.

use crate::config::store::{StoreBackendKind, StoreConfig};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod redis;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to serialize row: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// An authorization request that passed validation and is waiting for the
/// user to finish logging in. Owned by the authorization endpoint until the
/// login UI completes it or it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationSession {
    pub session_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Requested scope, space-separated
    pub scope: String,
    /// Client CSRF state, echoed back on completion
    pub state: Option<String>,
    pub code_challenge: String,
    /// Fixed to S256; stored for the record
    pub code_challenge_method: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// A single-use authorization code bound to the session's challenge,
/// redirect URI and scope at the moment the user authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    /// Granted scope, space-separated
    pub scope: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// One link in a refresh-token rotation chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    /// Granted scope, space-separated
    pub scope: String,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds; rotation expires the predecessor by moving this to now
    pub expires_at: i64,
    /// Back-reference to the predecessor in the chain, if any
    pub rotated_from: Option<String>,
}

impl RefreshToken {
    pub fn is_active(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Result of a rotation attempt
#[derive(Debug)]
pub enum RotateOutcome {
    /// The presented token was active; it is now expired and this successor
    /// replaces it
    Rotated(RefreshToken),
    /// Unknown token, or expired without ever having been rotated
    NotFound,
    /// The presented token was already rotated away: a replay. The entire
    /// downstream chain has been revoked.
    Reused { revoked: usize },
}

/// Contract every store backend must fulfill
#[async_trait::async_trait]
pub trait StoreBackend: Send + Sync {
    async fn put_session(&self, session: &AuthorizationSession) -> Result<(), StoreError>;

    /// Atomically remove and return a session. Expired sessions are treated
    /// as absent.
    async fn take_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthorizationSession>, StoreError>;

    async fn put_code(&self, code: &AuthorizationCode) -> Result<(), StoreError>;

    /// Atomically remove and return a code. Of two concurrent calls with the
    /// same code, at most one receives `Some`. Expired codes are absent.
    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError>;

    async fn insert_refresh(&self, token: &RefreshToken) -> Result<(), StoreError>;

    /// Atomically expire `old_token` and insert its successor. Of two
    /// concurrent calls presenting the same token, exactly one observes it
    /// as active and rotates; the other sees `Reused`. A replay of a token
    /// rotated away earlier also reports `Reused` and revokes the whole
    /// downstream chain. A token issued to a different client than
    /// `client_id` is reported as `NotFound` without touching the chain.
    async fn rotate_refresh(
        &self,
        old_token: &str,
        new_token: &str,
        client_id: &str,
        refresh_ttl_secs: i64,
    ) -> Result<RotateOutcome, StoreError>;

    /// Move a refresh token's active window to the past. Returns whether the
    /// token existed; callers deciding what to reveal must not forward that.
    async fn revoke_refresh(&self, token: &str) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), String>;
}

/// Uniform store interface regardless of backend; the concrete
/// implementation is chosen at runtime from configuration.
#[derive(Clone)]
pub enum Store {
    Memory(memory::MemoryStore),
    Redis(redis::RedisStore),
}

#[async_trait::async_trait]
impl StoreBackend for Store {
    async fn put_session(&self, session: &AuthorizationSession) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put_session(session).await,
            Self::Redis(store) => store.put_session(session).await,
        }
    }

    async fn take_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthorizationSession>, StoreError> {
        match self {
            Self::Memory(store) => store.take_session(session_id).await,
            Self::Redis(store) => store.take_session(session_id).await,
        }
    }

    async fn put_code(&self, code: &AuthorizationCode) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put_code(code).await,
            Self::Redis(store) => store.put_code(code).await,
        }
    }

    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        match self {
            Self::Memory(store) => store.consume_code(code).await,
            Self::Redis(store) => store.consume_code(code).await,
        }
    }

    async fn insert_refresh(&self, token: &RefreshToken) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.insert_refresh(token).await,
            Self::Redis(store) => store.insert_refresh(token).await,
        }
    }

    async fn rotate_refresh(
        &self,
        old_token: &str,
        new_token: &str,
        client_id: &str,
        refresh_ttl_secs: i64,
    ) -> Result<RotateOutcome, StoreError> {
        match self {
            Self::Memory(store) => {
                store
                    .rotate_refresh(old_token, new_token, client_id, refresh_ttl_secs)
                    .await
            }
            Self::Redis(store) => {
                store
                    .rotate_refresh(old_token, new_token, client_id, refresh_ttl_secs)
                    .await
            }
        }
    }

    async fn revoke_refresh(&self, token: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(store) => store.revoke_refresh(token).await,
            Self::Redis(store) => store.revoke_refresh(token).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::Memory(store) => store.health_check().await,
            Self::Redis(store) => store.health_check().await,
        }
    }
}

/// Create the store backend selected by configuration
pub async fn create_store(config: &StoreConfig) -> Result<Store, StoreError> {
    match config.backend {
        StoreBackendKind::Memory => Ok(Store::Memory(memory::MemoryStore::new())),
        StoreBackendKind::Redis => {
            if config.redis.url.is_empty() {
                return Err(StoreError::Config(
                    "Redis URL is required for the redis store".to_string(),
                ));
            }
            let store = redis::RedisStore::new(&config.redis.url)
                .await
                .map_err(StoreError::Config)?;
            Ok(Store::Redis(store))
        }
    }
}

pub(crate) fn now_ts() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn decode_row<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(StoreError::Serialization)
}
