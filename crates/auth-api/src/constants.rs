//! Backend endpoint and header constants

/// Default API base URL (host loopback as seen from the Android emulator)
pub const DEFAULT_BASE_URL: &str = "http://10.0.2.2:5000/api/";

/// Default connect and overall request timeouts, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint paths, relative to the base URL
pub const AUTH_LOGIN: &str = "auth/login";
pub const AUTH_REGISTER: &str = "auth/register";
pub const AUTH_REFRESH: &str = "auth/refresh";

/// Prefix of the Authorization header value
pub const BEARER_PREFIX: &str = "Bearer ";

/// Whether a request path targets one of the auth endpoints.
///
/// A 401 from these endpoints means bad credentials or a dead refresh
/// token; trying to refresh in response would loop.
pub fn is_auth_endpoint(path: &str) -> bool {
    [AUTH_LOGIN, AUTH_REGISTER, AUTH_REFRESH]
        .iter()
        .any(|endpoint| path.contains(&format!("/{endpoint}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_endpoints_are_detected() {
        assert!(is_auth_endpoint("/api/auth/login"));
        assert!(is_auth_endpoint("/api/auth/register"));
        assert!(is_auth_endpoint("/api/auth/refresh"));
        assert!(is_auth_endpoint("/auth/refresh"));
    }

    #[test]
    fn other_paths_are_not_auth_endpoints() {
        assert!(!is_auth_endpoint("/api/workouts"));
        assert!(!is_auth_endpoint("/api/cards/auth"));
        assert!(!is_auth_endpoint("/"));
    }
}
