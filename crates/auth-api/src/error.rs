//! Error taxonomy for backend calls
//!
//! Every failure a caller can see is one of a handful of categories, each
//! carrying enough to decide whether to retry and how long to wait. HTTP
//! statuses map through `Error::from_status`, transport failures through
//! `Error::from_reqwest`.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    NoConnection,
    Timeout,
    Ssl,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    InternalError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Unauthorized,
    Forbidden,
    TokenExpired,
    InvalidCredentials,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkKind::NoConnection => "no connection",
            NetworkKind::Timeout => "timeout",
            NetworkKind::Ssl => "ssl",
            NetworkKind::Unknown => "unknown",
        })
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerKind::InternalError => "internal error",
            ServerKind::BadGateway => "bad gateway",
            ServerKind::ServiceUnavailable => "service unavailable",
            ServerKind::GatewayTimeout => "gateway timeout",
            ServerKind::Generic => "server error",
        })
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthKind::Unauthorized => "unauthorized",
            AuthKind::Forbidden => "forbidden",
            AuthKind::TokenExpired => "token expired",
            AuthKind::InvalidCredentials => "invalid credentials",
        })
    }
}

/// Errors from auth API and authenticated client calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network error ({kind}): {message}")]
    Network { kind: NetworkKind, message: String },

    #[error("server error ({status}, {kind}): {message}")]
    Server {
        status: u16,
        kind: ServerKind,
        message: String,
    },

    #[error("authentication failed ({kind}): {message}")]
    Auth { kind: AuthKind, message: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid response: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{message}")]
    Unknown {
        status: Option<u16>,
        message: String,
    },
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let unknown = |message: String| Error::Unknown {
            status: Some(code),
            message,
        };
        let server = |kind: ServerKind, message: &str| Error::Server {
            status: code,
            kind,
            message: message.to_string(),
        };

        match code {
            400 => unknown(server_message(body).unwrap_or_else(|| "bad request".into())),
            401 => Error::Auth {
                kind: AuthKind::Unauthorized,
                message: "unauthorized".into(),
            },
            403 => Error::Auth {
                kind: AuthKind::Forbidden,
                message: "forbidden".into(),
            },
            404 => unknown("not found".into()),
            408 => Error::Network {
                kind: NetworkKind::Timeout,
                message: "request timeout".into(),
            },
            422 => unknown(validation_message(body).unwrap_or_else(|| "validation failed".into())),
            429 => unknown("rate limited".into()),
            500 => server(ServerKind::InternalError, "internal server error"),
            502 => server(ServerKind::BadGateway, "bad gateway"),
            503 => server(ServerKind::ServiceUnavailable, "service unavailable"),
            504 => server(ServerKind::GatewayTimeout, "gateway timeout"),
            400..=499 => unknown(
                server_message(body).unwrap_or_else(|| format!("client error: {code}")),
            ),
            500..=599 => server(ServerKind::Generic, "server error"),
            _ => unknown(format!("HTTP error: {code}")),
        }
    }

    /// Map a transport-level reqwest failure to an error.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Error::Network {
                kind: NetworkKind::Timeout,
                message,
            }
        } else if is_tls_failure(err) {
            Error::Network {
                kind: NetworkKind::Ssl,
                message,
            }
        } else if err.is_connect() {
            Error::Network {
                kind: NetworkKind::NoConnection,
                message,
            }
        } else if err.is_decode() {
            Error::Parse(message)
        } else {
            Error::Network {
                kind: NetworkKind::Unknown,
                message,
            }
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { kind, .. } => *kind != NetworkKind::Ssl,
            Error::Server { kind, .. } => matches!(
                kind,
                ServerKind::InternalError
                    | ServerKind::BadGateway
                    | ServerKind::ServiceUnavailable
                    | ServerKind::GatewayTimeout
            ),
            _ => false,
        }
    }

    /// Suggested wait before a retry. Zero for non-retryable errors.
    pub fn retry_delay(&self) -> Duration {
        let millis = match self {
            Error::Network { kind, .. } => match kind {
                NetworkKind::Timeout => 5000,
                NetworkKind::NoConnection => 3000,
                _ => 2000,
            },
            Error::Server { kind, .. } => match kind {
                ServerKind::ServiceUnavailable => 10_000,
                ServerKind::GatewayTimeout => 5000,
                _ => 3000,
            },
            _ => 0,
        };
        Duration::from_millis(millis)
    }

    /// HTTP status behind this error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::Unknown { status, .. } => *status,
            Error::Auth {
                kind: AuthKind::Unauthorized,
                ..
            } => Some(401),
            Error::Auth {
                kind: AuthKind::Forbidden,
                ..
            } => Some(403),
            _ => None,
        }
    }
}

/// Extract a human message from `{"message"|"error"|"detail": "..."}`.
fn server_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .filter_map(|key| json.get(key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

/// First field error of `{"errors": {"field": ["msg", ...]}}` as `field: msg`.
fn validation_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let errors = json.get("errors")?.as_object()?;
    let (field, messages) = errors.iter().next()?;
    let first = messages.as_array()?.first()?.as_str()?;
    Some(format!("{field}: {first}"))
}

/// TLS failures surface as connect errors; the cause chain names them.
fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_maps_to_unauthorized() {
        let err = Error::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(
            err,
            Error::Auth {
                kind: AuthKind::Unauthorized,
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn status_503_is_retryable_with_long_delay() {
        let err = Error::from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(
            err,
            Error::Server {
                kind: ServerKind::ServiceUnavailable,
                status: 503,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay(), Duration::from_secs(10));
    }

    #[test]
    fn status_400_uses_server_message() {
        let body = r#"{"message":"email already in use"}"#;
        let err = Error::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.to_string(), "email already in use");

        let err = Error::from_status(StatusCode::BAD_REQUEST, r#"{"detail":"missing body"}"#);
        assert_eq!(err.to_string(), "missing body");

        let err = Error::from_status(StatusCode::BAD_REQUEST, "<html>");
        assert_eq!(err.to_string(), "bad request");
    }

    #[test]
    fn status_422_reports_first_field_error() {
        let body = r#"{"errors":{"email":["is invalid","is taken"]}}"#;
        let err = Error::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(err.to_string(), "email: is invalid");

        let err = Error::from_status(StatusCode::UNPROCESSABLE_ENTITY, "{}");
        assert_eq!(err.to_string(), "validation failed");
    }

    #[test]
    fn status_408_is_a_network_timeout() {
        let err = Error::from_status(StatusCode::REQUEST_TIMEOUT, "");
        assert!(matches!(
            err,
            Error::Network {
                kind: NetworkKind::Timeout,
                ..
            }
        ));
        assert_eq!(err.retry_delay(), Duration::from_secs(5));
    }

    #[test]
    fn other_statuses_fall_back_by_range() {
        let err = Error::from_status(StatusCode::IM_A_TEAPOT, "");
        assert_eq!(err.to_string(), "client error: 418");
        assert!(!err.is_retryable());

        let err = Error::from_status(StatusCode::from_u16(507).unwrap(), "");
        assert!(matches!(
            err,
            Error::Server {
                kind: ServerKind::Generic,
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(507));
    }

    #[test]
    fn ssl_network_errors_are_not_retryable() {
        let err = Error::Network {
            kind: NetworkKind::Ssl,
            message: "bad certificate".into(),
        };
        assert!(!err.is_retryable());

        let err = Error::Network {
            kind: NetworkKind::NoConnection,
            message: "refused".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_no_connection() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap_err();
        let mapped = Error::from_reqwest(&err);
        assert!(
            matches!(
                mapped,
                Error::Network {
                    kind: NetworkKind::NoConnection,
                    ..
                }
            ),
            "got: {mapped:?}"
        );
    }
}
