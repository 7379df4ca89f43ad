//! Per-provider bearer token cache.
//!
//! The cache hands out tokens that satisfy [`CachedToken::is_valid`] and
//! refreshes them through a [`TokenRefresher`]:
//!
//! ```text
//! Empty ──refresh──▶ Valid ──(< 5 min left)──▶ Refreshing ──▶ Valid
//!   ▲                                              │
//!   └──────────────── Failed (after one retry) ◀───┘
//! ```
//!
//! - Tokens with at least 5 minutes left are returned as is.
//! - Tokens with 30 s to 5 min left are returned immediately while a refresh
//!   runs in the background.
//! - Tokens with less than 30 s left are never returned; the caller waits
//!   for a refresh.
//!
//! At most one refresh is in flight per cache. Every caller that arrives
//! while it runs awaits the same [`Shared`] future and observes the same
//! token or the same error.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, instrument, warn};
use vtx_core::{AccessToken, AuthError, CachedToken, DEFAULT_GRACE_PERIOD, DEFAULT_REFRESH_BUFFER};

use crate::retry::RetryStrategy;

// ============================================================================
// Token Refresher
// ============================================================================

/// Source of fresh tokens for a [`CredentialCache`].
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtains a new token.
    async fn refresh(&self) -> Result<AccessToken, AuthError>;
}

/// Adapts an async closure into a [`TokenRefresher`].
pub struct RefreshFn<F>(pub F);

#[async_trait]
impl<F, Fut> TokenRefresher for RefreshFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<AccessToken, AuthError>> + Send,
{
    async fn refresh(&self) -> Result<AccessToken, AuthError> {
        (self.0)().await
    }
}

// ============================================================================
// Cache State
// ============================================================================

type RefreshFuture = Shared<BoxFuture<'static, Result<AccessToken, AuthError>>>;

enum Lookup {
    Fresh(AccessToken),
    Stale(AccessToken),
    Refresh,
}

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct CacheState {
    token: Option<CachedToken>,
    in_flight: Option<InFlight>,
    retry_count: u32,
    next_refresh_id: u64,
}

struct CacheInner {
    provider: String,
    refresher: Arc<dyn TokenRefresher>,
    retry: RetryStrategy,
    refresh_buffer: Duration,
    grace_period: Duration,
    state: Mutex<CacheState>,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Credential Cache
// ============================================================================

/// Bearer token cache for one named provider.
///
/// Cloning is cheap and clones share the same cached token.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("CredentialCache")
            .field("provider", &self.inner.provider)
            .field("has_token", &state.token.is_some())
            .field("refreshing", &state.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    /// Creates a cache with the default windows and single-retry policy.
    pub fn new(provider: impl Into<String>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::builder(provider, refresher).build()
    }

    /// Starts building a cache with custom refresh windows.
    pub fn builder(
        provider: impl Into<String>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> CredentialCacheBuilder {
        CredentialCacheBuilder {
            provider: provider.into(),
            refresher,
            retry: RetryStrategy::single_retry(),
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Provider name this cache serves.
    pub fn provider(&self) -> &str {
        &self.inner.provider
    }

    /// Returns the cached token, refreshing first when it is inside the
    /// grace period.
    ///
    /// A token produced by the refresh this call waited on is handed out
    /// even when its own lifetime is under the grace period; the next call
    /// refreshes again instead of reusing it.
    ///
    /// # Errors
    ///
    /// Returns the error of the final refresh attempt when both attempts fail.
    #[instrument(skip(self), fields(provider = %self.inner.provider))]
    pub async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let future = {
            let mut state = self.inner.lock();
            match lookup(&state) {
                Lookup::Fresh(token) => {
                    debug!("Serving cached token");
                    return Ok(token);
                }
                Lookup::Stale(token) => {
                    let (future, started) = start_refresh(&self.inner, &mut state);
                    if started {
                        debug!("Token is stale, refreshing in background");
                        tokio::spawn(async move {
                            // Failures are recorded in the cache state.
                            let _ = future.await;
                        });
                    }
                    return Ok(token);
                }
                Lookup::Refresh => start_refresh(&self.inner, &mut state).0,
            }
        };
        future.await
    }

    /// Drops the cached token and retry bookkeeping.
    ///
    /// A refresh already in flight still completes and repopulates the cache.
    pub fn clear_cache(&self) {
        let mut state = self.inner.lock();
        state.token = None;
        state.retry_count = 0;
        debug!(provider = %self.inner.provider, "Credential cache cleared");
    }

    /// True if a cached token would be returned right now without waiting
    /// for a refresh.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .lock()
            .token
            .as_ref()
            .is_some_and(CachedToken::is_valid)
    }

    /// Remaining lifetime of the cached token. `None` when empty or when the
    /// token never expires.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.inner
            .lock()
            .token
            .as_ref()
            .and_then(CachedToken::time_until_expiry)
    }

    /// Number of failed attempts in the current refresh cycle.
    pub fn retry_count(&self) -> u32 {
        self.inner.lock().retry_count
    }

    /// True while a refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }
}

/// Builder for [`CredentialCache`].
pub struct CredentialCacheBuilder {
    provider: String,
    refresher: Arc<dyn TokenRefresher>,
    retry: RetryStrategy,
    refresh_buffer: Duration,
    grace_period: Duration,
}

impl CredentialCacheBuilder {
    /// Sets the refresh-ahead window.
    #[must_use]
    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// Sets the minimum remaining lifetime for handing out a token.
    #[must_use]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Builds the cache.
    pub fn build(self) -> CredentialCache {
        CredentialCache {
            inner: Arc::new(CacheInner {
                provider: self.provider,
                refresher: self.refresher,
                retry: self.retry,
                refresh_buffer: self.refresh_buffer,
                grace_period: self.grace_period,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }
}

// ============================================================================
// Refresh
// ============================================================================

fn lookup(state: &CacheState) -> Lookup {
    let now = Utc::now();
    match state.token.as_ref() {
        Some(cached) if cached.is_valid_at(now) => {
            if cached.needs_refresh_at(now) {
                Lookup::Stale(cached.token().clone())
            } else {
                Lookup::Fresh(cached.token().clone())
            }
        }
        Some(_) => {
            debug!("Token inside grace period, refreshing");
            Lookup::Refresh
        }
        None => {
            debug!("No cached token, refreshing");
            Lookup::Refresh
        }
    }
}

/// Joins the in-flight refresh or publishes a new one.
///
/// Returns the shared future and whether this call started it.
fn start_refresh(inner: &Arc<CacheInner>, state: &mut CacheState) -> (RefreshFuture, bool) {
    if let Some(in_flight) = &state.in_flight {
        return (in_flight.future.clone(), false);
    }

    state.next_refresh_id += 1;
    let id = state.next_refresh_id;
    let weak = Arc::downgrade(inner);
    let refresher = Arc::clone(&inner.refresher);
    let retry = inner.retry.clone();
    let windows = (inner.refresh_buffer, inner.grace_period);
    let provider = inner.provider.clone();

    let future = async move {
        let result = refresh_with_retry(&provider, refresher.as_ref(), &retry, windows, &weak).await;
        finish_refresh(&weak, id, &result);
        result.map(|cached| cached.token().clone())
    }
    .boxed()
    .shared();

    state.in_flight = Some(InFlight {
        id,
        future: future.clone(),
    });
    (future, true)
}

async fn refresh_with_retry(
    provider: &str,
    refresher: &dyn TokenRefresher,
    retry: &RetryStrategy,
    (refresh_buffer, grace_period): (Duration, Duration),
    weak: &Weak<CacheInner>,
) -> Result<CachedToken, AuthError> {
    let mut attempt = 1;
    loop {
        info!(provider = %provider, attempt, "Refreshing token");
        let result = refresher
            .refresh()
            .await
            .and_then(|token| CachedToken::with_windows(token, refresh_buffer, grace_period));

        match result {
            Ok(cached) => return Ok(cached),
            Err(err) if retry.should_retry(attempt) => {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().retry_count = attempt;
                }
                let delay = retry.delay;
                warn!(
                    provider = %provider,
                    error = %err,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Token refresh failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(provider = %provider, error = %err, "Token refresh failed, giving up");
                return Err(err);
            }
        }
    }
}

fn finish_refresh(weak: &Weak<CacheInner>, id: u64, result: &Result<CachedToken, AuthError>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let mut state = inner.lock();

    if state.in_flight.as_ref().is_some_and(|f| f.id == id) {
        state.in_flight = None;
    }
    state.retry_count = 0;

    match result {
        Ok(cached) => {
            debug!(
                provider = %inner.provider,
                expires_in = ?cached.time_until_expiry(),
                "Token cached"
            );
            state.token = Some(cached.clone());
        }
        Err(_) => state.token = None,
    }
}

// ============================================================================
// Tests
// ============================================================================
