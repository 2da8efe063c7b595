use crate::clients::{ClientRepository, RegistryError, StaticClientRegistry};
use crate::config::AuthdConfig;
use crate::ratelimit::SlidingWindowLimiter;
use crate::store::Store;
use crate::tokens::Signer;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state, cheap to clone into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthdConfig>,
    pub store: Arc<Store>,
    pub clients: Arc<dyn ClientRepository>,
    pub signer: Arc<Signer>,
    pub authorize_limiter: Arc<SlidingWindowLimiter>,
    pub token_limiter: Arc<SlidingWindowLimiter>,
}

impl AppState {
    /// Build state around an already-initialized store, loading the client
    /// catalogue from configuration
    pub async fn with_store(config: &AuthdConfig, store: Store) -> Result<Self, RegistryError> {
        let registry = StaticClientRegistry::from_file(&config.clients_file)?;
        Ok(Self::assemble(config, store, Arc::new(registry)))
    }

    fn assemble(
        config: &AuthdConfig,
        store: Store,
        clients: Arc<dyn ClientRepository>,
    ) -> Self {
        let window = Duration::from_secs(config.rate_limit.window_secs);
        Self {
            config: Arc::new(config.clone()),
            store: Arc::new(store),
            clients,
            signer: Arc::new(Signer::from_secret(
                &config.tokens.signing_key,
                &config.issuer,
            )),
            authorize_limiter: Arc::new(SlidingWindowLimiter::new(
                config.rate_limit.max_requests,
                window,
            )),
            token_limiter: Arc::new(SlidingWindowLimiter::new(
                config.rate_limit.max_requests,
                window,
            )),
        }
    }

    #[cfg(test)]
    pub fn for_testing(
        config: &AuthdConfig,
        store: Store,
        clients: Arc<dyn ClientRepository>,
    ) -> Self {
        Self::assemble(config, store, clients)
    }
}
