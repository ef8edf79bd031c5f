//! Failed request context handed to the authenticator

use auth_api::BEARER_PREFIX;
use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};
use reqwest::{Request, StatusCode};

/// A request that came back with an authentication challenge.
///
/// `prior` links to the previous failure of the same logical request, so
/// the chain length is the number of attempts made so far.
#[derive(Debug)]
pub struct FailedResponse {
    request: Request,
    status: StatusCode,
    prior: Option<Box<FailedResponse>>,
}

impl FailedResponse {
    /// `request` is the request exactly as sent, headers included.
    pub fn new(request: Request, status: StatusCode, prior: Option<FailedResponse>) -> Self {
        Self {
            request,
            status,
            prior: prior.map(Box::new),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn prior(&self) -> Option<&FailedResponse> {
        self.prior.as_deref()
    }

    /// Number of failed responses in the chain, this one included.
    pub fn response_count(&self) -> usize {
        let mut count = 1;
        let mut current = self.prior();
        while let Some(prior) = current {
            count += 1;
            current = prior.prior();
        }
        count
    }

    /// The credential that was attached when the request was sent.
    ///
    /// A header without the `Bearer ` prefix is returned whole.
    pub fn attached_token(&self) -> Option<&str> {
        let value = self.request.headers().get(AUTHORIZATION)?.to_str().ok()?;
        Some(value.strip_prefix(BEARER_PREFIX).unwrap_or(value))
    }
}

/// Authorization header value for a token, hidden from header debug output.
pub(crate) fn bearer_value(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Replace the request's Authorization header.
pub(crate) fn with_authorization(mut request: Request, value: HeaderValue) -> Request {
    request.headers_mut().insert(AUTHORIZATION, value);
    request
}
