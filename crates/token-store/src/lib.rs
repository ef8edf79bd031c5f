//! Credential storage for the fitcard API client
//!
//! Holds the access/refresh token pair issued by the backend. The store is
//! the single owner of token data: the HTTP interceptor reads the access
//! token before each request, the authenticator reads and rewrites both
//! tokens during a refresh, and login/logout write or clear them.
//!
//! Two implementations share the `TokenStore` trait:
//! - `FileTokenStore` persists to a JSON file with atomic writes
//! - `MemoryTokenStore` keeps tokens in process memory only

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Error, Result};
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};

/// An access/refresh token pair as issued by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: Secret<String>,
    pub refresh: Secret<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: Secret::new(refresh.into()),
        }
    }
}

/// On-disk and in-memory layout of stored tokens.
///
/// Each key is optional so a partially written or cleared store still
/// deserializes. Empty strings are treated as absent by the readers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Secret<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret<String>>,
}

impl StoredTokens {
    fn access(&self) -> Option<Secret<String>> {
        non_empty(self.access_token.as_ref())
    }

    fn refresh(&self) -> Option<Secret<String>> {
        non_empty(self.refresh_token.as_ref())
    }

    fn set(&mut self, tokens: TokenPair) {
        self.access_token = Some(tokens.access);
        self.refresh_token = Some(tokens.refresh);
    }

    fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

fn non_empty(token: Option<&Secret<String>>) -> Option<Secret<String>> {
    token.filter(|t| !t.is_empty()).cloned()
}

/// Async key-value storage for the token pair.
///
/// Every operation is atomic with respect to the others: a reader never
/// observes an access token from one pair and a refresh token from another.
///
/// Uses `Pin<Box<dyn Future>>` return types so stores can be shared as
/// `Arc<dyn TokenStore>`.
pub trait TokenStore: Send + Sync {
    /// Current access token, or None when absent or empty.
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Option<Secret<String>>> + Send + '_>>;

    /// Current refresh token, or None when absent or empty.
    fn refresh_token(&self) -> Pin<Box<dyn Future<Output = Option<Secret<String>>> + Send + '_>>;

    /// Replace both tokens in one write.
    fn save_tokens(
        &self,
        tokens: TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Remove both tokens.
    fn clear_tokens(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Whether a non-empty access token is stored.
    fn has_valid_token(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move { self.access_token().await.is_some() })
    }
}
