//! HTTP client for the nostrauth server.

use anyhow::{Context, Result};
use nostrauth_proto::wire::{
    routes, ChallengeResponse, CompleteRegistrationRequest, CreatedResponse, ErrorBody,
    LoginRequest, PasswordLoginRequest, RegisterRequest, SessionResponse,
};
use nostrauth_proto::{Keys, UnsignedEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct AuthClient {
    base: String,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return resp.json().await.context("malformed server response");
        }
        match resp.json::<ErrorBody>().await {
            Ok(body) => anyhow::bail!("server rejected request ({status}): {}", body.message),
            Err(_) => anyhow::bail!("server rejected request ({status})"),
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn post_authorized<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T> {
        let req = self.http.post(self.url(path)).bearer_auth(token).json(body);
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base))?;
        Self::decode(resp).await
    }

    pub async fn challenge(&self, pub_key: &str) -> Result<ChallengeResponse> {
        let req = self
            .http
            .get(self.url(routes::CHALLENGE))
            .query(&[("pubKey", pub_key)]);
        self.send(req).await
    }

    /// Fetch a challenge, sign it and submit the answer.
    pub async fn login_with_keys(&self, keys: &Keys) -> Result<SessionResponse> {
        let pub_key = keys.public_key_hex();
        let challenge = self.challenge(&pub_key).await?;
        tracing::debug!(expires_at = challenge.expires_at, "challenge received");

        let req = sign_challenge(keys, &challenge.challenge, unix_now());
        self.post(routes::LOGIN_SIGNED, &req).await
    }

    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionResponse> {
        let req = PasswordLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post(routes::LOGIN_PASSWORD, &req).await
    }

    pub async fn register_key(
        &self,
        pub_key: &str,
        secret: &str,
        username: Option<&str>,
    ) -> Result<CreatedResponse> {
        let req = RegisterRequest {
            pub_key: Some(pub_key.to_string()),
            secret: secret.to_string(),
            user_name: username.map(str::to_string),
        };
        self.post(routes::REGISTER_KEY, &req).await
    }

    pub async fn register_name(&self, username: &str, secret: &str) -> Result<CreatedResponse> {
        let req = RegisterRequest {
            pub_key: None,
            secret: secret.to_string(),
            user_name: Some(username.to_string()),
        };
        self.post(routes::REGISTER_NAME, &req).await
    }

    /// Requires the bearer `token` of a session that owns the record.
    pub async fn complete_registration(
        &self,
        token: &str,
        username: &str,
        secret: &str,
        pub_key: Option<&str>,
    ) -> Result<CreatedResponse> {
        let req = CompleteRegistrationRequest {
            user_name: username.to_string(),
            secret: secret.to_string(),
            pub_key: pub_key.map(str::to_string),
        };
        self.post_authorized(routes::COMPLETE_REGISTRATION, token, &req)
            .await
    }
}

/// Sign the kind 27235 event whose content is `challenge`.
pub fn sign_challenge(keys: &Keys, challenge: &str, created_at: i64) -> LoginRequest {
    let event = UnsignedEvent::auth(keys.public_key_hex(), created_at, challenge).sign(keys);
    LoginRequest {
        pub_key: event.pubkey,
        signature: event.sig,
        challenge: challenge.to_string(),
        created_at,
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostrauth_proto::crypto::schnorr;

    #[test]
    fn signed_answer_verifies_over_challenge() {
        let keys = Keys::generate();
        let req = sign_challenge(&keys, "abcd", 1_700_000_000);
        let id = UnsignedEvent::auth(req.pub_key.clone(), req.created_at, "abcd").compute_id();
        assert!(schnorr::verify_hex(&hex::encode(id), &req.pub_key, &req.signature));

        let other = UnsignedEvent::auth(req.pub_key.clone(), req.created_at, "abce").compute_id();
        assert!(!schnorr::verify_hex(&hex::encode(other), &req.pub_key, &req.signature));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = AuthClient::new("http://localhost:8080/");
        assert_eq!(client.url(routes::HEALTH), "http://localhost:8080/api/auth/health");
    }
}
