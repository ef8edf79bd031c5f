//! In-memory token store
//!
//! Same semantics as `FileTokenStore` without persistence. Used for
//! short-lived sessions and by tests that exercise the authenticator.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::{StoredTokens, TokenPair, TokenStore};

#[derive(Default)]
pub struct MemoryTokenStore {
    state: RwLock<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a token pair.
    pub fn with_tokens(tokens: TokenPair) -> Self {
        let mut stored = StoredTokens::default();
        stored.set(tokens);
        Self {
            state: RwLock::new(stored),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Option<Secret<String>>> + Send + '_>> {
        Box::pin(async move { self.state.read().await.access() })
    }

    fn refresh_token(&self) -> Pin<Box<dyn Future<Output = Option<Secret<String>>> + Send + '_>> {
        Box::pin(async move { self.state.read().await.refresh() })
    }

    fn save_tokens(
        &self,
        tokens: TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.state.write().await.set(tokens);
            Ok(())
        })
    }

    fn clear_tokens(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.state.write().await.clear();
            Ok(())
        })
    }
}
