//! Single-flight token refresh
//!
//! Many requests can fail with the same expired token at once. Each one
//! lands here, but only the first to take `refresh_lock` talks to the
//! refresh endpoint. The rest wait on the lock, then see a stored token
//! that differs from the one they were sent with and reuse it.
//!
//! The store is re-read under the lock every time. This type never caches
//! a token of its own.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use auth_api::is_auth_endpoint;
use reqwest::header::HeaderValue;
use tokio::sync::Mutex;
use token_store::TokenStore;
use tracing::{debug, info, warn};

use crate::Authenticator;
use crate::challenge::{FailedResponse, bearer_value, with_authorization};
use crate::refresh::RefreshEndpoint;

/// Give up once a logical request has failed this many times.
pub const MAX_RESPONSE_COUNT: usize = 3;

/// How a challenge was resolved, for logs and the outcome counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AuthEndpoint,
    RetryLimit,
    NotReplayable,
    Reused,
    Refreshed,
    NoRefreshToken,
    RefreshFailed,
    StoreFailed,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::AuthEndpoint => "auth_endpoint",
            Outcome::RetryLimit => "retry_limit",
            Outcome::NotReplayable => "not_replayable",
            Outcome::Reused => "reused",
            Outcome::Refreshed => "refreshed",
            Outcome::NoRefreshToken => "no_refresh_token",
            Outcome::RefreshFailed => "refresh_failed",
            Outcome::StoreFailed => "store_failed",
        }
    }
}

fn record(outcome: Outcome) {
    metrics::counter!("auth_challenges_total", "outcome" => outcome.label()).increment(1);
}

/// Authenticator that refreshes the stored token pair on a 401.
///
/// Share one instance (behind `Arc`) across every client that uses the same
/// store; the lock only serializes callers of the same instance.
pub struct TokenAuthenticator {
    store: Arc<dyn TokenStore>,
    endpoint: Arc<dyn RefreshEndpoint>,
    refresh_lock: Mutex<()>,
    max_response_count: usize,
}

impl TokenAuthenticator {
    pub fn new(store: Arc<dyn TokenStore>, endpoint: Arc<dyn RefreshEndpoint>) -> Self {
        Self {
            store,
            endpoint,
            refresh_lock: Mutex::new(()),
            max_response_count: MAX_RESPONSE_COUNT,
        }
    }

    /// Override the retry ceiling. Values below 1 are raised to 1.
    pub fn with_max_response_count(mut self, max: usize) -> Self {
        self.max_response_count = max.max(1);
        self
    }

    /// Produce an Authorization value newer than `attached`, refreshing if
    /// nobody has yet.
    ///
    /// Returns None when the session is unrecoverable; stored credentials
    /// are cleared in that case.
    async fn fresh_authorization(&self, attached: Option<&str>) -> Option<HeaderValue> {
        let _guard = self.refresh_lock.lock().await;

        // A stored token that cannot be sent counts as stale
        if let Some(current) = self.store.access_token().await {
            if Some(current.expose().as_str()) != attached {
                if let Ok(value) = bearer_value(current.expose()) {
                    debug!("token already refreshed by a concurrent request, reusing it");
                    record(Outcome::Reused);
                    return Some(value);
                }
                warn!("stored access token is not a valid header value, refreshing");
            }
        }

        let Some(refresh_token) = self.store.refresh_token().await else {
            warn!("no refresh token stored, clearing credentials");
            record(Outcome::NoRefreshToken);
            self.clear().await;
            return None;
        };

        let tokens = match self.endpoint.refresh(refresh_token.expose()).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing credentials");
                record(Outcome::RefreshFailed);
                self.clear().await;
                return None;
            }
        };

        let value = match bearer_value(tokens.access.expose()) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    error = %e,
                    "refreshed token is not a valid header value, clearing credentials"
                );
                record(Outcome::RefreshFailed);
                self.clear().await;
                return None;
            }
        };

        if let Err(e) = self.store.save_tokens(tokens).await {
            warn!(error = %e, "failed to persist refreshed tokens, clearing credentials");
            record(Outcome::StoreFailed);
            self.clear().await;
            return None;
        }
        info!("access token refreshed");
        record(Outcome::Refreshed);
        Some(value)
    }

    async fn clear(&self) {
        if let Err(e) = self.store.clear_tokens().await {
            warn!(error = %e, "failed to clear stored tokens");
        }
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate<'a>(
        &'a self,
        failed: &FailedResponse,
    ) -> Pin<Box<dyn Future<Output = Option<reqwest::Request>> + Send + 'a>> {
        let path = failed.request().url().path();
        let status = failed.status().as_u16();

        if is_auth_endpoint(path) {
            debug!(path, status, "challenge from an auth endpoint, not refreshing");
            record(Outcome::AuthEndpoint);
            return Box::pin(async { None });
        }

        let count = failed.response_count();
        if count >= self.max_response_count {
            warn!(path, status, count, "too many failed attempts, giving up");
            record(Outcome::RetryLimit);
            return Box::pin(async { None });
        }

        let Some(retry) = failed.request().try_clone() else {
            warn!(path, status, "request body cannot be replayed, giving up");
            record(Outcome::NotReplayable);
            return Box::pin(async { None });
        };
        let attached = failed.attached_token().map(str::to_owned);

        Box::pin(async move {
            let value = self.fresh_authorization(attached.as_deref()).await?;
            Some(with_authorization(retry, value))
        })
    }
}
