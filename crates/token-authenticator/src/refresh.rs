//! Refresh endpoint seam
//!
//! The authenticator only needs "exchange this refresh token for a new
//! pair". `AuthApi` provides it over HTTP; tests substitute their own.

use std::future::Future;
use std::pin::Pin;

use auth_api::AuthApi;
use token_store::TokenPair;

pub trait RefreshEndpoint: Send + Sync {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = auth_api::Result<TokenPair>> + Send + 'a>>;
}

impl RefreshEndpoint for AuthApi {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = auth_api::Result<TokenPair>> + Send + 'a>> {
        Box::pin(AuthApi::refresh(self, refresh_token))
    }
}
