//! Token lifetimes and signing configuration

use confique::Config;

#[derive(Debug, Config, Clone)]
pub struct TokenConfig {
    /// HMAC key for access-token signatures. Shared with resource servers;
    /// must be overridden outside development.
    #[config(env = "AUTHD_TOKENS_SIGNING_KEY", default = "dev-signing-key-change-me")]
    pub signing_key: String,

    /// Access-token TTL in seconds (default: 15 minutes)
    #[config(env = "AUTHD_TOKENS_ACCESS_TTL_SECS", default = 900)]
    pub access_ttl_secs: i64,

    /// Refresh-token TTL in seconds (default: 14 days)
    #[config(env = "AUTHD_TOKENS_REFRESH_TTL_SECS", default = 1209600)]
    pub refresh_ttl_secs: i64,

    /// Authorization-session TTL in seconds: how long a user may take to
    /// finish logging in (default: 10 minutes)
    #[config(env = "AUTHD_TOKENS_SESSION_TTL_SECS", default = 600)]
    pub session_ttl_secs: i64,

    /// Authorization-code TTL in seconds (default: 2 minutes)
    #[config(env = "AUTHD_TOKENS_CODE_TTL_SECS", default = 120)]
    pub code_ttl_secs: i64,
}
