//! Calls against the backend's auth endpoints
//!
//! Login, register and refresh all POST JSON to `<base_url>/auth/...`. The
//! `reqwest::Client` handed in here must not carry the token authenticator:
//! a refresh that itself triggered a refresh would recurse.

use common::Secret;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use token_store::TokenPair;
use tracing::{debug, instrument};

use crate::constants::{AUTH_LOGIN, AUTH_REFRESH, AUTH_REGISTER};
use crate::dto::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RefreshTokenResponse, RegisterRequest,
};
use crate::error::{AuthKind, Error, Result};
use crate::validation::{validate_email, validate_name, validate_password};

/// Client for the unauthenticated auth endpoints.
#[derive(Clone)]
pub struct AuthApi {
    client: reqwest::Client,
    base_url: Url,
}

impl AuthApi {
    /// `base_url` must be absolute; a trailing slash is added if missing so
    /// relative endpoint paths join under it.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    /// Validate and submit credentials.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn login(&self, email: &str, password: Secret<String>) -> Result<AuthResponse> {
        validate_email(email)?;
        validate_password(password.expose())?;

        let request = LoginRequest {
            email: email.trim().to_string(),
            password,
        };
        self.post(AUTH_LOGIN, &request)
            .await
            .map_err(|e| {
                credentials_rejected(
                    e,
                    AuthKind::InvalidCredentials,
                    "email or password is incorrect",
                )
            })
    }

    /// Validate and create a new account.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn register(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password: Secret<String>,
    ) -> Result<AuthResponse> {
        validate_name("Name", name)?;
        validate_name("Surname", surname)?;
        validate_email(email)?;
        validate_password(password.expose())?;

        let request = RegisterRequest {
            name: name.trim().to_string(),
            surname: surname.trim().to_string(),
            email: email.trim().to_string(),
            password,
        };
        self.post(AUTH_REGISTER, &request).await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let request = RefreshTokenRequest { refresh_token };
        let response: RefreshTokenResponse = self
            .post(AUTH_REFRESH, &request)
            .await
            .map_err(|e| {
                credentials_rejected(e, AuthKind::TokenExpired, "refresh token rejected")
            })?;
        Ok(response.into())
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            debug!(%status, "auth endpoint returned error");
            return Err(Error::from_status(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Parse(format!("invalid {path} response: {e}")))
    }
}

/// Parse a base URL, forcing a trailing slash.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    let url = Url::parse(&normalized).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(format!("{base_url}: not a base URL")));
    }
    Ok(url)
}

/// On the auth endpoints a 401 means the submitted credential is bad, not
/// that a session expired.
fn credentials_rejected(err: Error, kind: AuthKind, message: &str) -> Error {
    match err {
        Error::Auth {
            kind: AuthKind::Unauthorized,
            ..
        } => Error::Auth {
            kind,
            message: message.to_string(),
        },
        other => other,
    }
}
