//! HTTP client that attaches the stored token and retries on a 401

use std::sync::Arc;

use auth_api::{Error, Result, parse_base_url};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Request, RequestBuilder, Response, StatusCode, Url};
use token_store::TokenStore;
use tracing::{Instrument, debug, info_span, warn};

use crate::Authenticator;
use crate::challenge::{FailedResponse, bearer_value};

/// Client for authenticated backend calls.
///
/// The authenticator is shared with every other client that uses the same
/// store so concurrent refreshes collapse into one.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn TokenStore>,
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticatedClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        store: Arc<dyn TokenStore>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            store,
            authenticator,
        })
    }

    /// Resolve a path against the base URL.
    ///
    /// Absolute URLs are accepted only on the base URL's origin; the stored
    /// token is never sent to another host.
    pub fn url(&self, path: &str) -> Result<Url> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
        if url.origin() != self.base_url.origin() {
            return Err(Error::InvalidUrl(format!("{path}: outside {}", self.base_url)));
        }
        Ok(url)
    }

    /// Start a request to `path`. Build it and pass it to `execute`.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        let request = self
            .request(Method::GET, path)?
            .build()
            .map_err(|e| Error::from_reqwest(&e))?;
        self.execute(request).await
    }

    /// Send a request, refreshing credentials on authentication challenges.
    ///
    /// A 401 the authenticator cannot recover from is returned as the
    /// response, not as an error.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().simple());
        let span = info_span!(
            "request",
            %request_id,
            method = %request.method(),
            path = %request.url().path(),
        );
        self.send_with_refresh(request).instrument(span).await
    }

    async fn send_with_refresh(&self, mut request: Request) -> Result<Response> {
        self.attach_token(&mut request).await;

        let mut prior: Option<FailedResponse> = None;
        loop {
            let sent = request.try_clone();
            let response = self
                .http
                .execute(request)
                .await
                .map_err(|e| Error::from_reqwest(&e))?;

            if response.status() != StatusCode::UNAUTHORIZED {
                debug!(status = %response.status(), "response received");
                return Ok(response);
            }

            let Some(sent) = sent else {
                warn!("401 on a request that cannot be replayed");
                return Ok(response);
            };

            let failed = FailedResponse::new(sent, response.status(), prior.take());
            match self.authenticator.authenticate(&failed).await {
                Some(retry) => {
                    debug!(attempt = failed.response_count() + 1, "retrying with refreshed token");
                    request = retry;
                    prior = Some(failed);
                }
                None => return Ok(response),
            }
        }
    }

    async fn attach_token(&self, request: &mut Request) {
        let Some(token) = self.store.access_token().await else {
            return;
        };
        match bearer_value(token.expose()) {
            Ok(value) => {
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "stored token is not a valid header value"),
        }
    }
}

/// Turn a non-success response into an error, reading its body for context.
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Err(Error::from_status(status, &body))
}
