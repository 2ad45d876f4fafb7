//! HTTP wire types shared by the server and its clients.
//!
//! All bodies are JSON objects with camelCase field names. Request fields
//! default to empty so that a missing field is reported by the server as a
//! validation failure rather than a decoding error.

use serde::{Deserialize, Serialize};

/// Route paths, all under [`routes::BASE`].
pub mod routes {
    pub const BASE: &str = "/api/auth";
    pub const CHALLENGE: &str = "/api/auth/challenge";
    pub const LOGIN_SIGNED: &str = "/api/auth/loginuser";
    pub const REGISTER_KEY: &str = "/api/auth/registernewuser";
    pub const REGISTER_NAME: &str = "/api/auth/registerwithoutnostr";
    pub const COMPLETE_REGISTRATION: &str = "/api/auth/completeRegistration";
    pub const LOGIN_PASSWORD: &str = "/api/auth/login";
    pub const CHECK_USERNAME: &str = "/api/auth/check-username";
    pub const CHECK_PUBKEY: &str = "/api/auth/check-pubkey";
    pub const GET_PUBKEY: &str = "/api/auth/get-pubkey";
    pub const GET_USERNAME: &str = "/api/auth/get-username";
    pub const DELETE_PUBKEY: &str = "/api/auth/deletepubkey";
    pub const DISPLAY_NAME: &str = "/api/auth/display-name";
    pub const ME: &str = "/api/auth/me";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const HEALTH: &str = "/api/auth/health";
}

// ── Client → Server ─────────────────────────────────────────────────────

/// Answer to a challenge: the fields of a kind 27235 event minus its id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub pub_key: String,
    pub signature: String,
    pub challenge: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompleteRegistrationRequest {
    pub user_name: String,
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordLoginRequest {
    pub username: String,
    pub password: String,
}

// ── Server → Client ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub challenge: String,
    /// Unix seconds after which the challenge is no longer accepted.
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// `signature` or `password`.
    pub method: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueResponse {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNameResponse {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

// ── Error code constants ────────────────────────────────────────────────

pub mod error_codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_uses_camel_case() {
        let req = LoginRequest {
            pub_key: "ab".into(),
            signature: "cd".into(),
            challenge: "ef".into(),
            created_at: 7,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""pubKey":"ab""#));
        assert!(json.contains(r#""createdAt":7"#));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"pubKey":"ab"}"#).unwrap();
        assert_eq!(req.pub_key, "ab");
        assert!(req.signature.is_empty());
        assert_eq!(req.created_at, 0);

        let reg: RegisterRequest = serde_json::from_str(r#"{"secret":"s"}"#).unwrap();
        assert!(reg.pub_key.is_none());
        assert!(reg.user_name.is_none());
    }

    #[test]
    fn optional_fields_are_omitted() {
        let resp = SessionResponse {
            token: "t".into(),
            pub_key: None,
            user_name: Some("alice".into()),
            method: "password".into(),
            expires_at: 1,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("pubKey"));
        assert!(json.contains(r#""userName":"alice""#));
    }
}
