use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

use crate::cache::TokenCache;
use crate::config::SdkConfig;
use crate::errors::Error;
use crate::platform::{Platform, SDK_VERSION};
use crate::telemetry::refresh::{RefreshTelemetry, RefreshTrigger};
use crate::transport::{ApiRequest, Transport};

use super::schedule::RefreshSchedule;
use super::{RefreshPolicy, Token, TokenProvider};

pub const TOKEN_CACHE_KEY: &str = "api_verification_token";
pub const TOKEN_ENDPOINT: &str = "/identity/token";
pub const TOKEN_SERVICE: &str = "identity";

/// Identity sent to the issuing endpoint plus the refresh timing rules.
#[derive(Clone, Debug)]
pub struct TokenManagerConfig {
    pub project_id: String,
    pub api_key: String,
    pub sdk_version: String,
    pub platform: Platform,
    pub policy: RefreshPolicy,
}

impl TokenManagerConfig {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            sdk_version: SDK_VERSION.to_string(),
            platform: Platform::current(),
            policy: RefreshPolicy::default(),
        }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        let mut manager_config = Self::new(config.project_id.as_str(), config.api_key.as_str());
        manager_config.policy = manager_config.policy.with_auto_refresh(config.auto_refresh);
        manager_config
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    project_id: &'a str,
    api_key: &'a str,
    sdk_version: &'a str,
    platform: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "Token", alias = "token", default)]
    token: Option<String>,
}

#[derive(Default)]
struct TokenState {
    token: Option<Token>,
    /// Bumped each time a refresh attempt completes, successful or not.
    epoch: u64,
    last_failure: Option<Error>,
}

struct Inner<T, C> {
    config: TokenManagerConfig,
    transport: T,
    cache: C,
    state: RwLock<TokenState>,
    refresh_lock: Semaphore,
    schedule: RefreshSchedule,
    disposed: AtomicBool,
}

/// Owns the verification token: single-flight refresh, cache persistence and
/// proactive background renewal.
///
/// Cloning is cheap and every clone shares the same state.
pub struct TokenManager<T, C> {
    inner: Arc<Inner<T, C>>,
}

impl<T, C> Clone for TokenManager<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, C> TokenManager<T, C>
where
    T: Transport + 'static,
    C: TokenCache + 'static,
{
    pub fn new(config: TokenManagerConfig, transport: T, cache: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                cache,
                state: RwLock::new(TokenState::default()),
                refresh_lock: Semaphore::new(1),
                schedule: RefreshSchedule::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Adopts a usable cached token or fetches a fresh one. Resolves only once
    /// a token is held; failure is fatal to SDK start-up.
    pub async fn initialize(&self) -> Result<(), Error> {
        self.inner.ensure_live()?;
        let policy = &self.inner.config.policy;
        if self.inner.usable_token(Timestamp::now()).await.is_some() {
            return Ok(());
        }
        info!("initializing API verification token");

        match self.inner.load_cached() {
            Ok(Some(token)) if token.is_usable(Timestamp::now(), policy.safety_buffer) => {
                let expires_at = token.expires_at();
                self.inner.state.write().await.token = Some(token);
                if policy.auto_refresh {
                    self.inner.arm_schedule(expires_at);
                }
                info!(expires_at = %expires_at, "using cached verification token");
                return Ok(());
            }
            Ok(Some(_)) => debug!("cached verification token is stale"),
            Ok(None) => debug!("no cached verification token"),
            Err(err) => warn!(error = %err, "cache.load_failed; fetching a new token"),
        }

        self.inner
            .refresh(RefreshTrigger::Initialize)
            .await
            .map(|_| ())
            .map_err(|err| Error::Initialization(Box::new(err)))
    }

    /// Returns the held token when it is outside the safety buffer, otherwise
    /// refreshes. Concurrent callers share a single refresh.
    pub async fn get_token(&self) -> Result<String, Error> {
        self.inner.ensure_live()?;
        if let Some(token) = self.inner.usable_token(Timestamp::now()).await {
            return Ok(token.value().to_string());
        }
        let token = self.inner.refresh(RefreshTrigger::OnDemand).await?;
        Ok(token.value().to_string())
    }

    /// Snapshot of the held token, usable or not.
    pub async fn current_token(&self) -> Option<Token> {
        self.inner.state.read().await.token.clone()
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner.schedule.is_armed()
    }

    pub fn scheduled_refresh_at(&self) -> Option<Timestamp> {
        self.inner.schedule.fire_at()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &TokenManagerConfig {
        &self.inner.config
    }

    /// Cancels the pending background refresh and closes the refresh lock.
    /// Every later call fails with [`Error::Disposed`].
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.schedule.cancel();
        self.inner.refresh_lock.close();
        info!("token manager disposed");
    }
}

impl<T, C> TokenProvider for TokenManager<T, C>
where
    T: Transport + 'static,
    C: TokenCache + 'static,
{
    async fn provide_token(&self) -> Result<String, Error> {
        self.get_token().await
    }
}

impl<T, C> Inner<T, C>
where
    T: Transport + 'static,
    C: TokenCache + 'static,
{
    fn ensure_live(&self) -> Result<(), Error> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    async fn usable_token(&self, now: Timestamp) -> Option<Token> {
        let state = self.state.read().await;
        state
            .token
            .as_ref()
            .filter(|token| token.is_usable(now, self.config.policy.safety_buffer))
            .cloned()
    }

    fn load_cached(&self) -> Result<Option<Token>, Error> {
        Ok(self.cache.get(TOKEN_CACHE_KEY)?.map(Token::from_value))
    }

    async fn refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> Result<Token, Error> {
        let telemetry = RefreshTelemetry::new(trigger);
        let observed_epoch = self.state.read().await.epoch;

        // Only one refresh attempt should run at a time.
        let _permit = self
            .refresh_lock
            .acquire()
            .await
            .map_err(|_| Error::Disposed)?;
        self.ensure_live()?;

        {
            let state = self.state.read().await;
            if state.epoch != observed_epoch {
                // Another caller finished a refresh while this one waited.
                if let Some(err) = state.last_failure.as_ref() {
                    telemetry.emit_joined(false);
                    return Err(err.clone());
                }
                if let Some(token) = state.token.as_ref() {
                    telemetry.emit_joined(true);
                    return Ok(token.clone());
                }
            }
            // Scheduled refreshes fire while the token is still usable, so
            // only on-demand paths may short-circuit here.
            if trigger != RefreshTrigger::Scheduled
                && let Some(token) = state.token.as_ref()
                && token.is_usable(Timestamp::now(), self.config.policy.safety_buffer)
            {
                return Ok(token.clone());
            }
        }

        telemetry.emit_start(Timestamp::now());
        let result = self
            .fetch_token()
            .await
            .map_err(|err| Error::Refresh(Box::new(err)));

        let mut state = self.state.write().await;
        state.epoch += 1;
        match result {
            Ok(token) => {
                state.token = Some(token.clone());
                state.last_failure = None;
                drop(state);
                if self.ensure_live().is_err() {
                    // Disposed while the request was in flight.
                    debug!("token manager disposed during refresh; not persisting");
                } else {
                    self.persist(&token);
                    if self.config.policy.auto_refresh {
                        self.arm_schedule(token.expires_at());
                    }
                }
                telemetry.emit_success(token.expires_at());
                Ok(token)
            }
            Err(err) => {
                state.last_failure = Some(err.clone());
                drop(state);
                telemetry.emit_failure(&err, Timestamp::now());
                Err(err)
            }
        }
    }

    async fn fetch_token(&self) -> Result<Token, Error> {
        let body = TokenRequest {
            project_id: &self.config.project_id,
            api_key: &self.config.api_key,
            sdk_version: &self.config.sdk_version,
            platform: self.config.platform.as_str(),
        };
        let request = ApiRequest::post(TOKEN_ENDPOINT, TOKEN_SERVICE, &body)?;
        let response = self.transport.send(request).await?;
        let value = serde_json::from_value::<Option<TokenResponse>>(response)?
            .and_then(|response| response.token)
            .filter(|token| !token.is_empty())
            .ok_or(Error::EmptyToken)?;
        Ok(Token::from_value(value))
    }

    /// The cached copy uses a fixed TTL rather than the token's own expiry.
    fn persist(&self, token: &Token) {
        let ttl = self.config.policy.cache_ttl;
        if let Err(err) = self
            .cache
            .set(TOKEN_CACHE_KEY, token.value().to_string(), Some(ttl))
        {
            warn!(error = %err, "cache.store_failed");
        }
    }

    fn arm_schedule(self: &Arc<Self>, expires_at: Timestamp) {
        let Some(delay) = self
            .config
            .policy
            .schedule_delay(expires_at, Timestamp::now())
        else {
            self.schedule.cancel();
            debug!(expires_at = %expires_at, "refresh.schedule_skipped");
            return;
        };

        let weak = Arc::downgrade(self);
        self.schedule.arm(delay, move |generation| async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.schedule.release(generation) || inner.ensure_live().is_err() {
                return;
            }
            if let Err(err) = inner.refresh(RefreshTrigger::Scheduled).await {
                warn!(error = %err, "scheduled refresh failed; next request will retry");
            }
        });
        if self.ensure_live().is_err() {
            // dispose() may have cancelled before this timer was stored.
            self.schedule.cancel();
            return;
        }
        debug!(
            delay_secs = delay.as_secs(),
            expires_at = %expires_at,
            "refresh.scheduled"
        );
    }
}
