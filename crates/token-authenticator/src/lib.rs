//! Token refresh on authentication challenges
//!
//! When an authenticated request comes back 401, the HTTP layer hands the
//! failed response to an `Authenticator`, which either returns the request
//! rebuilt with a fresh credential or gives up. `TokenAuthenticator` is the
//! single-flight implementation: one refresh at a time, later callers reuse
//! the token the first one obtained.
//!
//! Request lifecycle through `AuthenticatedClient::execute`:
//! 1. Stored access token is attached as `Authorization: Bearer ...`
//! 2. Response is not 401 → returned to the caller
//! 3. Response is 401 → `FailedResponse` built, linked to prior failures
//! 4. `Authenticator::authenticate` returns a replacement request → resend
//! 5. `authenticate` returns None → the 401 response is returned unchanged

pub mod authenticator;
pub mod challenge;
pub mod client;
pub mod refresh;

pub use authenticator::{MAX_RESPONSE_COUNT, TokenAuthenticator};
pub use challenge::FailedResponse;
pub use client::{AuthenticatedClient, ensure_success};
pub use refresh::RefreshEndpoint;

use std::future::Future;
use std::pin::Pin;

/// Hook invoked by the HTTP layer on an authentication challenge.
///
/// Returning `None` means "give up": the caller sees the 401 as received.
/// There is no error path; every failure inside the hook ends as `None`.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Authenticator>`).
pub trait Authenticator: Send + Sync {
    fn authenticate<'a>(
        &'a self,
        failed: &FailedResponse,
    ) -> Pin<Box<dyn Future<Output = Option<reqwest::Request>> + Send + 'a>>;
}
