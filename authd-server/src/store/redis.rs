//! Redis store backend, the deployment target for horizontally scaled
//! installations.
//!
//! Atomicity comes from Redis itself: `GETDEL` makes code and session
//! consumption single-winner, and rotation runs as one Lua script (EVAL is
//! atomic server-side). Rows are JSON strings with per-row TTLs; rotated-away
//! refresh rows and the forward pointers outlive their logical expiry by a
//! grace window so replays can still be recognized as reuse.

use super::{
    AuthorizationCode, AuthorizationSession, RefreshToken, RotateOutcome, StoreBackend, StoreError,
};
use async_trait::async_trait;
use log::{error, warn};
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use serde::Serialize;

/// How long a dead refresh row / rotation pointer stays visible for reuse
/// detection, beyond its logical expiry
const REUSE_GRACE_SECS: i64 = 7 * 24 * 3600;

const ROTATE_SCRIPT: &str = r#"
local old = redis.call('GET', KEYS[1])
local now = tonumber(ARGV[1])
local ttl = tonumber(ARGV[3])
local grace = tonumber(ARGV[4])
if not old then
    if redis.call('EXISTS', KEYS[2]) == 1 then return {'reused'} end
    return {'notfound'}
end
local row = cjson.decode(old)
if row['client_id'] ~= ARGV[5] then return {'notfound'} end
if tonumber(row['expires_at']) <= now then
    if redis.call('EXISTS', KEYS[2]) == 1 then return {'reused'} end
    return {'notfound'}
end
row['expires_at'] = now
redis.call('SET', KEYS[1], cjson.encode(row), 'EX', grace)
local successor = {}
successor['token'] = ARGV[2]
successor['user_id'] = row['user_id']
successor['client_id'] = row['client_id']
successor['scope'] = row['scope']
successor['issued_at'] = now
successor['expires_at'] = now + ttl
successor['rotated_from'] = row['token']
local encoded = cjson.encode(successor)
redis.call('SET', KEYS[3], encoded, 'EX', ttl + grace)
redis.call('SET', KEYS[2], ARGV[2], 'EX', ttl + grace)
return {'rotated', encoded}
"#;

fn session_key(session_id: &str) -> String {
    format!("authd:session:{}", session_id)
}

fn code_key(code: &str) -> String {
    format!("authd:code:{}", code)
}

fn refresh_key(token: &str) -> String {
    format!("authd:refresh:{}", token)
}

fn rotated_key(token: &str) -> String {
    format!("authd:rotated:{}", token)
}

#[derive(Clone)]
pub struct RedisStore {
    _client: Client,
    conn_manager: ConnectionManager,
}

impl RedisStore {
    /// Initialize a new redis store instance
    pub async fn new(redis_url: &str) -> Result<Self, String> {
        let client = match Client::open(redis_url) {
            Ok(client) => client,
            Err(err) => {
                return Err(format!("Failed to connect to Redis: {}", err));
            }
        };

        let conn_manager = match ConnectionManager::new(client.clone()).await {
            Ok(manager) => manager,
            Err(err) => {
                return Err(format!("Failed to create Redis connection manager: {}", err));
            }
        };

        // Test the connection to ensure it's working
        let mut conn = conn_manager.clone();
        if let Err(err) = redis::cmd("PING").query_async::<String>(&mut conn).await {
            return Err(format!("Failed to ping Redis: {}", err));
        }

        Ok(Self {
            _client: client,
            conn_manager,
        })
    }

    async fn put_row<T: Serialize>(
        &self,
        key: &str,
        row: &T,
        ttl_secs: i64,
    ) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(row)?;
        let mut conn = self.conn_manager.clone();
        conn.set_ex::<_, _, ()>(key, serialized, ttl_secs.max(1) as u64)
            .await
            .map_err(|err| {
                error!("Redis error while setting key {}: {}", key, err);
                StoreError::Redis(err.to_string())
            })
    }

    /// GETDEL: at most one caller receives the row
    async fn take_row(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("GETDEL")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|err| {
                error!("Redis error while consuming key {}: {}", key, err);
                StoreError::Redis(err.to_string())
            })
    }

    /// Best-effort expiry of every token downstream of `from`. Reuse
    /// containment, not a correctness invariant, so a plain read-modify-write
    /// per link is acceptable here.
    async fn revoke_descendants(&self, from: &str) -> Result<usize, StoreError> {
        let now = super::now_ts();
        let mut conn = self.conn_manager.clone();
        let mut revoked = 0;
        let mut cursor = from.to_string();
        loop {
            let next: Option<String> = conn
                .get(rotated_key(&cursor))
                .await
                .map_err(|err| StoreError::Redis(err.to_string()))?;
            let Some(next) = next else { break };
            let raw: Option<String> = conn
                .get(refresh_key(&next))
                .await
                .map_err(|err| StoreError::Redis(err.to_string()))?;
            if let Some(raw) = raw {
                let mut row: RefreshToken = super::decode_row(&raw)?;
                if row.is_active(now) {
                    row.expires_at = now - 1;
                    self.put_row(&refresh_key(&next), &row, REUSE_GRACE_SECS)
                        .await?;
                    revoked += 1;
                }
            }
            cursor = next;
        }
        Ok(revoked)
    }
}

#[async_trait]
impl StoreBackend for RedisStore {
    async fn put_session(&self, session: &AuthorizationSession) -> Result<(), StoreError> {
        let ttl = session.expires_at - super::now_ts();
        self.put_row(&session_key(&session.session_id), session, ttl)
            .await
    }

    async fn take_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthorizationSession>, StoreError> {
        match self.take_row(&session_key(session_id)).await? {
            Some(raw) => {
                let session: AuthorizationSession = super::decode_row(&raw)?;
                Ok(Some(session).filter(|row| row.expires_at > super::now_ts()))
            }
            None => Ok(None),
        }
    }

    async fn put_code(&self, code: &AuthorizationCode) -> Result<(), StoreError> {
        let ttl = code.expires_at - super::now_ts();
        self.put_row(&code_key(&code.code), code, ttl).await
    }

    async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        match self.take_row(&code_key(code)).await? {
            Some(raw) => {
                let row: AuthorizationCode = super::decode_row(&raw)?;
                Ok(Some(row).filter(|row| row.expires_at > super::now_ts()))
            }
            None => Ok(None),
        }
    }

    async fn insert_refresh(&self, token: &RefreshToken) -> Result<(), StoreError> {
        let ttl = token.expires_at - super::now_ts() + REUSE_GRACE_SECS;
        self.put_row(&refresh_key(&token.token), token, ttl).await
    }

    async fn rotate_refresh(
        &self,
        old_token: &str,
        new_token: &str,
        client_id: &str,
        refresh_ttl_secs: i64,
    ) -> Result<RotateOutcome, StoreError> {
        let mut conn = self.conn_manager.clone();
        let result: Vec<String> = Script::new(ROTATE_SCRIPT)
            .key(refresh_key(old_token))
            .key(rotated_key(old_token))
            .key(refresh_key(new_token))
            .arg(super::now_ts())
            .arg(new_token)
            .arg(refresh_ttl_secs)
            .arg(REUSE_GRACE_SECS)
            .arg(client_id)
            .invoke_async(&mut conn)
            .await
            .map_err(|err| {
                error!("Redis error while rotating refresh token: {}", err);
                StoreError::Redis(err.to_string())
            })?;

        match result.first().map(String::as_str) {
            Some("rotated") => {
                let raw = result
                    .get(1)
                    .ok_or_else(|| StoreError::Redis("rotation returned no row".to_string()))?;
                Ok(RotateOutcome::Rotated(super::decode_row(raw)?))
            }
            Some("reused") => {
                let revoked = self.revoke_descendants(old_token).await.unwrap_or_else(|err| {
                    error!("Failed to revoke downstream refresh chain: {}", err);
                    0
                });
                warn!(
                    "Refresh token reuse detected; revoked {} downstream tokens",
                    revoked
                );
                Ok(RotateOutcome::Reused { revoked })
            }
            _ => Ok(RotateOutcome::NotFound),
        }
    }

    async fn revoke_refresh(&self, token: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn
            .get(refresh_key(token))
            .await
            .map_err(|err| StoreError::Redis(err.to_string()))?;
        match raw {
            Some(raw) => {
                let mut row: RefreshToken = super::decode_row(&raw)?;
                row.expires_at = super::now_ts() - 1;
                self.put_row(&refresh_key(token), &row, REUSE_GRACE_SECS)
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        let mut conn = self.conn_manager.clone();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(err) => Err(format!("Redis health check failed: {}", err)),
        }
    }
}
