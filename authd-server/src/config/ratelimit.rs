//! Rate limiting for the public authorize/token endpoints

use confique::Config;

#[derive(Debug, Config, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per caller per window (default: 30)
    #[config(env = "AUTHD_RATE_LIMIT_MAX_REQUESTS", default = 30)]
    pub max_requests: usize,

    /// Window length in seconds (default: 60)
    #[config(env = "AUTHD_RATE_LIMIT_WINDOW_SECS", default = 60)]
    pub window_secs: u64,
}
