//! Client for the fitcard backend's auth endpoints
//!
//! Provides the wire types, input validation, error taxonomy and the
//! `AuthApi` client for login, registration and token refresh. Tokens
//! returned here are written to a `token_store::TokenStore` by the caller.
//!
//! Credential flow:
//! 1. `AuthApi::login()` or `AuthApi::register()` returns an `AuthResponse`
//! 2. The caller saves `AuthResponse::token_pair()` to its token store
//! 3. Authenticated requests carry the access token as a Bearer header
//! 4. On a 401 the token authenticator calls `AuthApi::refresh()`
//! 5. The refreshed pair replaces the stored one

pub mod client;
pub mod constants;
pub mod dto;
pub mod error;
pub mod validation;

pub use client::{AuthApi, parse_base_url};
pub use constants::*;
pub use dto::{AuthResponse, User};
pub use error::{AuthKind, Error, NetworkKind, Result, ServerKind};
pub use validation::ValidationError;
