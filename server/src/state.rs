//! Shared server state.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::challenge::{self, ChallengeStore};
use crate::config::ServerConfig;
use crate::identity::{IdentityRecord, IdentityStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Signature,
    Password,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Signature => "signature",
            AuthMethod::Password => "password",
        }
    }
}

/// An authenticated session bound to one identity record.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub token: String,
    pub identity_id: i64,
    pub public_key: Option<String>,
    pub username: Option<String>,
    pub method: AuthMethod,
    pub expires_at: Instant,
    pub expires_at_unix: i64,
}

pub struct AppState {
    /// Outstanding and recently consumed challenges.
    pub challenges: ChallengeStore,
    /// Session token → session
    pub sessions: DashMap<String, AuthenticatedSession>,
    /// Rate limit tracking: IP → attempt timestamps
    pub rate_limits: DashMap<IpAddr, Vec<Instant>>,
    pub identities: Arc<dyn IdentityStore>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig, identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            challenges: ChallengeStore::new(config.challenge_ttl),
            sessions: DashMap::new(),
            rate_limits: DashMap::new(),
            identities,
            config,
        }
    }

    /// Open a session for `record` and remember it.
    pub fn open_session(
        &self,
        record: &IdentityRecord,
        method: AuthMethod,
    ) -> AuthenticatedSession {
        let expiry = self.config.session_expiry;
        let session = AuthenticatedSession {
            token: challenge::generate_token(),
            identity_id: record.id,
            public_key: record.public_key.clone(),
            username: record.username.clone(),
            method,
            expires_at: Instant::now() + expiry,
            expires_at_unix: challenge::unix_now().saturating_add(expiry.as_secs() as i64),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Look up a live session.
    pub fn session(&self, token: &str) -> Option<AuthenticatedSession> {
        self.sessions
            .get(token)
            .filter(|s| s.expires_at > Instant::now())
            .map(|s| s.clone())
    }

    pub fn close_session(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

pub type SharedState = Arc<AppState>;
