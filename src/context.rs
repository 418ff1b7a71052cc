use tracing::{error, info};

use crate::cache::{MemoryCache, TokenCache};
use crate::config::SdkConfig;
use crate::dispatcher::AuthenticatedDispatcher;
use crate::errors::Error;
use crate::token::{TokenManager, TokenManagerConfig};
use crate::transport::{HttpTransport, Transport};

/// Everything an SDK session needs, built once by the application and passed
/// around explicitly.
pub struct SdkContext<T = HttpTransport, C = MemoryCache> {
    config: SdkConfig,
    token_manager: TokenManager<T, C>,
    dispatcher: AuthenticatedDispatcher<T, TokenManager<T, C>>,
}

impl SdkContext {
    /// Builds the default reqwest transport and in-memory cache, then blocks
    /// until the first verification token is available.
    pub async fn start(config: SdkConfig) -> Result<Self, Error> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        Self::start_with(config, transport, MemoryCache::new()).await
    }
}

impl<T, C> SdkContext<T, C>
where
    T: Transport + Clone + 'static,
    C: TokenCache + 'static,
{
    pub async fn start_with(config: SdkConfig, transport: T, cache: C) -> Result<Self, Error> {
        info!(project_id = %config.project_id, "sdk.initializing");
        let token_manager = TokenManager::new(
            TokenManagerConfig::from_sdk_config(&config),
            transport.clone(),
            cache,
        );
        if let Err(err) = token_manager.initialize().await {
            error!(error = %err, "sdk.initialization_failed");
            token_manager.dispose();
            return Err(err);
        }
        info!("API verification token ready");

        let dispatcher = AuthenticatedDispatcher::new(transport, token_manager.clone());
        info!("sdk.ready");
        Ok(Self {
            config,
            token_manager,
            dispatcher,
        })
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &AuthenticatedDispatcher<T, TokenManager<T, C>> {
        &self.dispatcher
    }

    pub fn token_manager(&self) -> &TokenManager<T, C> {
        &self.token_manager
    }

    /// Tears down the token manager; requests made afterwards fail with
    /// [`Error::AuthMissing`].
    pub fn shutdown(&self) {
        self.token_manager.dispose();
        info!("sdk.shutdown");
    }
}
