//! Wire types for the auth endpoints
//!
//! Field names follow the backend's camelCase JSON.

use common::Secret;
use serde::{Deserialize, Serialize};
use token_store::TokenPair;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    /// Unix timestamp in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: Secret<String>,
}

/// Response body of both login and register.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl AuthResponse {
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access: self.token.clone(),
            refresh: self.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Refresh response. The backend may also send `user`; it is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub token: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl From<RefreshTokenResponse> for TokenPair {
    fn from(response: RefreshTokenResponse) -> Self {
        TokenPair {
            access: response.token,
            refresh: response.refresh_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_deserializes_camel_case() {
        let json = r#"{
            "user": {"id": "u1", "email": "a@b.co", "name": "Ada", "profileImageUrl": null, "createdAt": 1735500000000},
            "token": "at_abc",
            "refreshToken": "rt_def"
        }"#;
        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.user.id, "u1");
        assert_eq!(response.user.created_at, Some(1735500000000));
        assert!(response.user.profile_image_url.is_none());

        let pair = response.token_pair();
        assert_eq!(pair.access.expose(), "at_abc");
        assert_eq!(pair.refresh.expose(), "rt_def");
    }

    #[test]
    fn refresh_request_uses_wire_field_name() {
        let body = serde_json::to_value(RefreshTokenRequest {
            refresh_token: "rt_1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"refreshToken": "rt_1"}));
    }

    #[test]
    fn refresh_response_ignores_user() {
        let json = r#"{"user": {"id": "u1", "email": "a@b.co", "name": "Ada"}, "token": "at_2", "refreshToken": "rt_2"}"#;
        let response: RefreshTokenResponse = serde_json::from_str(json).unwrap();
        let pair: TokenPair = response.into();
        assert_eq!(pair.access.expose(), "at_2");
        assert_eq!(pair.refresh.expose(), "rt_2");
    }

    #[test]
    fn register_request_sends_password_verbatim() {
        let body = serde_json::to_value(RegisterRequest {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: Secret::from("pw123456"),
        })
        .unwrap();
        assert_eq!(body["password"], "pw123456");
        assert_eq!(body["surname"], "Lovelace");
    }
}
