//! Store backend selection

use confique::Config;
use serde::Deserialize;

/// Specifies which store backend to use
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackendKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Config, Clone)]
pub struct StoreConfig {
    /// Store backend: "memory" (single instance) or "redis"
    #[config(env = "AUTHD_STORE_BACKEND", default = "memory")]
    pub backend: StoreBackendKind,

    /// Redis-specific configuration
    #[config(nested)]
    pub redis: RedisStoreConfig,
}

#[derive(Debug, Config, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection string
    #[config(env = "AUTHD_STORE_REDIS_URL", default = "")]
    pub url: String,
}
