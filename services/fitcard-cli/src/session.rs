//! Login state: obtains token pairs from the auth endpoints and stores them

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_api::{AuthApi, AuthResponse, User};
use common::Secret;
use token_store::TokenStore;
use tracing::info;

pub struct Session {
    api: AuthApi,
    store: Arc<dyn TokenStore>,
}

impl Session {
    pub fn new(api: AuthApi, store: Arc<dyn TokenStore>) -> Self {
        Self { api, store }
    }

    pub async fn login(&self, email: &str, password: Secret<String>) -> Result<User> {
        let response = self.api.login(email, password).await?;
        self.start(response).await
    }

    pub async fn register(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password: Secret<String>,
    ) -> Result<User> {
        let response = self.api.register(name, surname, email, password).await?;
        self.start(response).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.store
            .clear_tokens()
            .await
            .context("failed to clear stored tokens")?;
        info!("logged out");
        Ok(())
    }

    /// Whether an access token is stored. Says nothing about its expiry.
    pub async fn is_logged_in(&self) -> bool {
        self.store.has_valid_token().await
    }

    async fn start(&self, response: AuthResponse) -> Result<User> {
        self.store
            .save_tokens(response.token_pair())
            .await
            .context("failed to save tokens")?;
        info!(user_id = %response.user.id, "session started");
        Ok(response.user)
    }
}
