//! In-memory store backend.
//!
//! All four tables live behind one `RwLock`, so every conditional update
//! (consume, rotate) runs inside a single write-guard critical section and
//! the single-winner guarantees hold without compare-and-swap machinery.
//! Suitable for a single instance; horizontal deployments use the redis
//! backend.

use super::{
    AuthorizationCode, AuthorizationSession, RefreshToken, RotateOutcome, StoreBackend, StoreError,
};
use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, AuthorizationSession>,
    codes: HashMap<String, AuthorizationCode>,
    refresh_tokens: HashMap<String, RefreshToken>,
    /// Forward pointers along rotation chains, for reuse detection
    rotated_to: HashMap<String, String>,
}

impl Tables {
    fn prune_expired(&mut self, now: i64) {
        self.sessions.retain(|_, session| session.expires_at > now);
        self.codes.retain(|_, code| code.expires_at > now);
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn put_session(&self, session: &AuthorizationSession) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.prune_expired(super::now_ts());
        tables
            .sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn take_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthorizationSession>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .sessions
            .remove(session_id)
            .filter(|session| session.expires_at > super::now_ts()))
    }

    async fn put_code(&self, code: &AuthorizationCode) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.prune_expired(super::now_ts());
        tables.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .codes
            .remove(code)
            .filter(|row| row.expires_at > super::now_ts()))
    }

    async fn insert_refresh(&self, token: &RefreshToken) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn rotate_refresh(
        &self,
        old_token: &str,
        new_token: &str,
        client_id: &str,
        refresh_ttl_secs: i64,
    ) -> Result<RotateOutcome, StoreError> {
        let now = super::now_ts();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        // Wrong-client presentation never rotates and never trips reuse
        // revocation
        if let Some(row) = tables.refresh_tokens.get(old_token) {
            if row.client_id != client_id {
                return Ok(RotateOutcome::NotFound);
            }
        }

        let successor = tables
            .refresh_tokens
            .get_mut(old_token)
            .filter(|row| row.is_active(now))
            .map(|old| {
                old.expires_at = now;
                RefreshToken {
                    token: new_token.to_string(),
                    user_id: old.user_id.clone(),
                    client_id: old.client_id.clone(),
                    scope: old.scope.clone(),
                    issued_at: now,
                    expires_at: now + refresh_ttl_secs,
                    rotated_from: Some(old.token.clone()),
                }
            });

        match successor {
            Some(successor) => {
                tables
                    .refresh_tokens
                    .insert(new_token.to_string(), successor.clone());
                tables
                    .rotated_to
                    .insert(old_token.to_string(), new_token.to_string());
                Ok(RotateOutcome::Rotated(successor))
            }
            // Replaying a token that was rotated away revokes everything
            // issued downstream of it.
            None if tables.rotated_to.contains_key(old_token) => {
                let revoked = revoke_chain(tables, old_token, now);
                warn!(
                    "Refresh token reuse detected; revoked {} downstream tokens",
                    revoked
                );
                Ok(RotateOutcome::Reused { revoked })
            }
            None => Ok(RotateOutcome::NotFound),
        }
    }

    async fn revoke_refresh(&self, token: &str) -> Result<bool, StoreError> {
        let now = super::now_ts();
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(token) {
            Some(row) => {
                row.expires_at = now - 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Walk the forward pointers from `from` and expire every descendant.
/// Runs under the table write guard.
fn revoke_chain(tables: &mut Tables, from: &str, now: i64) -> usize {
    let mut revoked = 0;
    let mut cursor = from.to_string();
    while let Some(next) = tables.rotated_to.get(&cursor).cloned() {
        if let Some(row) = tables.refresh_tokens.get_mut(&next) {
            if row.is_active(now) {
                row.expires_at = now - 1;
                revoked += 1;
            }
        }
        cursor = next;
    }
    revoked
}
