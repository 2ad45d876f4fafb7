//! Authentication protocol.
//!
//! A signature login moves through
//! `ChallengeIssued -> SignatureSubmitted -> {Verified | Rejected}`.
//! [`issue_challenge`] enters the first state, [`submit`] performs the first
//! transition and [`verify_submission`] the second. Password login is a
//! single step, [`login_with_password`].
//!
//! Every rejection carries a precise [`RejectReason`] for the logs. Callers
//! facing the network collapse all authentication reasons to one response.

use nostrauth_proto::crypto::schnorr;
use nostrauth_proto::event::UnsignedEvent;
use nostrauth_proto::keys;
use nostrauth_proto::wire::LoginRequest;
use thiserror::Error;

use crate::challenge::{Challenge, ChallengeError, ChallengeStore};
use crate::identity::StoreError;
use crate::password::{self, PasswordError};
use crate::state::{AppState, AuthMethod, AuthenticatedSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingField,
    InvalidCreatedAt,
    InvalidPublicKey,
    UnknownChallenge,
    ExpiredChallenge,
    ChallengeReused,
    /// Challenge was issued for a different key than the one presented.
    ChallengeKeyMismatch,
    SignatureMismatch,
    UnknownIdentity,
    InvalidCredentials,
}

impl RejectReason {
    /// Malformed input rather than a failed proof.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            RejectReason::MissingField
                | RejectReason::InvalidCreatedAt
                | RejectReason::InvalidPublicKey
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::MissingField => "missing required field",
            RejectReason::InvalidCreatedAt => "invalid or missing created_at",
            RejectReason::InvalidPublicKey => "invalid public key",
            RejectReason::UnknownChallenge => "unknown challenge",
            RejectReason::ExpiredChallenge => "expired challenge",
            RejectReason::ChallengeReused => "challenge already used",
            RejectReason::ChallengeKeyMismatch => "challenge issued for another key",
            RejectReason::SignatureMismatch => "signature mismatch",
            RejectReason::UnknownIdentity => "unknown identity",
            RejectReason::InvalidCredentials => "invalid credentials",
        }
    }
}

impl From<ChallengeError> for RejectReason {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::NotFound => RejectReason::UnknownChallenge,
            ChallengeError::Expired => RejectReason::ExpiredChallenge,
            ChallengeError::AlreadyUsed => RejectReason::ChallengeReused,
        }
    }
}

/// Terminal state of an attempt.
#[derive(Debug)]
pub enum AuthOutcome {
    Verified(AuthenticatedSession),
    Rejected(RejectReason),
}

/// Faults that are not a verdict on the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    Invalid(&'static str),

    /// The session does not own the record it tried to change.
    #[error("record belongs to another identity")]
    NotOwner,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The `SignatureSubmitted` state: the challenge is consumed and the event
/// rebuilt, the signature not yet checked.
#[derive(Debug)]
pub struct Submission {
    pub challenge: Challenge,
    pub event: UnsignedEvent,
    pub signature: String,
}

/// Issue a challenge for `public_key` (hex or npub).
pub fn issue_challenge(state: &AppState, public_key: &str) -> Result<Challenge, RejectReason> {
    if public_key.trim().is_empty() {
        return Err(RejectReason::MissingField);
    }
    let public_key =
        keys::normalize_public_key(public_key).map_err(|_| RejectReason::InvalidPublicKey)?;
    let challenge = state.challenges.issue(&public_key);
    tracing::debug!(pubkey = %public_key, "challenge issued");
    Ok(challenge)
}

/// `ChallengeIssued -> SignatureSubmitted`.
///
/// A present challenge token is burned even when another field is invalid,
/// so a rejected attempt can never be replayed.
pub fn submit(challenges: &ChallengeStore, req: &LoginRequest) -> Result<Submission, RejectReason> {
    let any_empty = req.pub_key.is_empty() || req.signature.is_empty() || req.challenge.is_empty();
    if any_empty || req.created_at <= 0 {
        if !req.challenge.is_empty() {
            let _ = challenges.consume(&req.challenge);
        }
        return Err(if any_empty {
            RejectReason::MissingField
        } else {
            RejectReason::InvalidCreatedAt
        });
    }

    let challenge = challenges.consume(&req.challenge)?;

    let public_key =
        keys::normalize_public_key(&req.pub_key).map_err(|_| RejectReason::InvalidPublicKey)?;
    if challenge.public_key != public_key {
        return Err(RejectReason::ChallengeKeyMismatch);
    }

    let event = UnsignedEvent::auth(public_key, req.created_at, challenge.token.clone());
    Ok(Submission {
        challenge,
        event,
        signature: req.signature.clone(),
    })
}

/// Check `signature` over the recomputed id of `event`.
pub fn verify_auth_signature(event: &UnsignedEvent, signature: &str) -> bool {
    let id = event.compute_id();
    schnorr::verify_hex_key(&id, &event.pubkey, signature)
}

/// `SignatureSubmitted -> {Verified | Rejected}`.
pub async fn verify_submission(
    state: &AppState,
    submission: Submission,
) -> Result<AuthOutcome, AuthError> {
    if !verify_auth_signature(&submission.event, &submission.signature) {
        return Ok(AuthOutcome::Rejected(RejectReason::SignatureMismatch));
    }

    // Login never registers: an unknown key is a rejection.
    let Some(record) = state
        .identities
        .find_by_public_key(&submission.event.pubkey)
        .await?
    else {
        return Ok(AuthOutcome::Rejected(RejectReason::UnknownIdentity));
    };

    Ok(AuthOutcome::Verified(state.open_session(&record, AuthMethod::Signature)))
}

/// Run a full signature login.
pub async fn login_with_signature(
    state: &AppState,
    req: &LoginRequest,
) -> Result<AuthOutcome, AuthError> {
    let submission = match submit(&state.challenges, req) {
        Ok(s) => s,
        Err(reason) => {
            tracing::warn!(
                pubkey = %req.pub_key,
                reason = reason.as_str(),
                "signature login rejected"
            );
            return Ok(AuthOutcome::Rejected(reason));
        }
    };

    let pubkey = submission.event.pubkey.clone();
    let outcome = verify_submission(state, submission).await?;
    match &outcome {
        AuthOutcome::Verified(session) => {
            tracing::info!(
                pubkey = %pubkey,
                identity = session.identity_id,
                "signature login verified"
            );
        }
        AuthOutcome::Rejected(reason) => {
            tracing::warn!(pubkey = %pubkey, reason = reason.as_str(), "signature login rejected");
        }
    }
    Ok(outcome)
}

/// Username/secret login. Unknown user and wrong secret produce the same
/// outcome after the same amount of hashing work.
pub async fn login_with_password(
    state: &AppState,
    username: &str,
    secret: &str,
) -> Result<AuthOutcome, AuthError> {
    if username.is_empty() || secret.is_empty() {
        return Ok(AuthOutcome::Rejected(RejectReason::MissingField));
    }

    let record = state.identities.find_by_username(username).await?;
    let hash = record.as_ref().map(|r| r.secret_hash.clone());
    let secret = secret.to_string();
    let matches = tokio::task::spawn_blocking(move || {
        password::verify_or_dummy(&secret, hash.as_deref())
    })
    .await??;

    match record {
        Some(record) if matches => {
            tracing::info!(identity = record.id, "password login verified");
            Ok(AuthOutcome::Verified(state.open_session(&record, AuthMethod::Password)))
        }
        Some(_) => {
            tracing::warn!(username = %username, reason = "bad secret", "password login rejected");
            Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials))
        }
        None => {
            tracing::warn!(
                username = %username,
                reason = "unknown user",
                "password login rejected"
            );
            Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials))
        }
    }
}

/// Argon2 off the async runtime.
pub(crate) async fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let secret = secret.to_string();
    Ok(tokio::task::spawn_blocking(move || password::hash_password(&secret)).await??)
}
