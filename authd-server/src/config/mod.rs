//! Server configuration, loaded from environment variables (prefix `AUTHD_`)
//! with an optional `authd.toml` on disk.

use confique::Config;

pub mod ratelimit;
pub mod store;
pub mod tokens;

pub use ratelimit::RateLimitConfig;
pub use store::StoreConfig;
pub use tokens::TokenConfig;

/// Main configuration structure for the authorization server
#[derive(Debug, Config, Clone)]
pub struct AuthdConfig {
    /// The port the server will listen to (default: 7700)
    #[config(env = "AUTHD_PORT", default = 7700)]
    pub port: u16,

    /// Issuer identifier, also the base URL advertised in the discovery
    /// document
    #[config(env = "AUTHD_ISSUER", default = "http://localhost:7700")]
    pub issuer: String,

    /// Login UI the user agent is redirected to for authentication
    #[config(env = "AUTHD_LOGIN_URL", default = "http://localhost:3000/login")]
    pub login_url: String,

    /// API key the login UI presents when completing a session. The internal
    /// surface rejects everything while this is empty.
    #[config(env = "AUTHD_INTERNAL_API_KEY", default = "")]
    pub internal_api_key: String,

    /// Path to the registered-clients catalogue (JSON array)
    #[config(env = "AUTHD_CLIENTS_FILE", default = "")]
    pub clients_file: String,

    /// Token lifetimes and signing
    #[config(nested)]
    pub tokens: TokenConfig,

    /// Durable store backend
    #[config(nested)]
    pub store: StoreConfig,

    /// Public-endpoint rate limiting
    #[config(nested)]
    pub rate_limit: RateLimitConfig,
}

impl AuthdConfig {
    /// Load configuration from the environment and, if present, `authd.toml`
    pub fn load() -> Result<Self, confique::Error> {
        Self::builder().env().file("authd.toml").load()
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            issuer: "http://localhost:7700".to_string(),
            login_url: "http://localhost:3000/login".to_string(),
            internal_api_key: "test-internal-key".to_string(),
            clients_file: String::new(),
            tokens: TokenConfig {
                signing_key: "test-signing-key".to_string(),
                access_ttl_secs: 900,
                refresh_ttl_secs: 1_209_600,
                session_ttl_secs: 600,
                code_ttl_secs: 120,
            },
            store: StoreConfig {
                backend: store::StoreBackendKind::Memory,
                redis: store::RedisStoreConfig {
                    url: String::new(),
                },
            },
            rate_limit: RateLimitConfig {
                max_requests: 100,
                window_secs: 60,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // No AUTHD_* variables set in the test environment for these keys
        let config = AuthdConfig::builder().load().unwrap();
        assert_eq!(config.port, 7700);
        assert_eq!(config.issuer, "http://localhost:7700");
        assert_eq!(config.tokens.access_ttl_secs, 900);
        assert_eq!(config.tokens.code_ttl_secs, 120);
        assert_eq!(config.tokens.session_ttl_secs, 600);
        assert_eq!(config.tokens.refresh_ttl_secs, 1_209_600);
        assert_eq!(config.store.backend, store::StoreBackendKind::Memory);
        assert_eq!(config.rate_limit.max_requests, 30);
        assert_eq!(config.rate_limit.window_secs, 60);
    }
}
