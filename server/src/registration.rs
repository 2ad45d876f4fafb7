//! Identity creation and completion.
//!
//! Uniqueness is enforced by the store; these functions never check for an
//! existing record before inserting.

use nostrauth_proto::keys;

use crate::auth::{hash_secret, AuthError};
use crate::identity::{IdentityRecord, NewIdentity, StoreError};
use crate::state::{AppState, AuthenticatedSession};

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_key(public_key: &str) -> Result<String, AuthError> {
    keys::normalize_public_key(public_key).map_err(|_| AuthError::Invalid("invalid public key"))
}

/// Create a record keyed by public key (hex or npub).
pub async fn register_by_key(
    state: &AppState,
    public_key: &str,
    secret: &str,
    username: Option<&str>,
) -> Result<IdentityRecord, AuthError> {
    let public_key = parse_key(public_key)?;
    if secret.is_empty() {
        return Err(AuthError::Invalid("secret is required"));
    }

    let record = state
        .identities
        .insert(NewIdentity {
            public_key: Some(public_key),
            username: non_empty(username),
            secret_hash: hash_secret(secret).await?,
        })
        .await?;
    tracing::info!(identity = record.id, pubkey = ?record.public_key, "registered by key");
    Ok(record)
}

/// Create a record with a username and secret but no key.
pub async fn register_by_name(
    state: &AppState,
    username: &str,
    secret: &str,
) -> Result<IdentityRecord, AuthError> {
    let Some(username) = non_empty(Some(username)) else {
        return Err(AuthError::Invalid("username is required"));
    };
    if secret.is_empty() {
        return Err(AuthError::Invalid("secret is required"));
    }

    let record = state
        .identities
        .insert(NewIdentity {
            public_key: None,
            username: Some(username),
            secret_hash: hash_secret(secret).await?,
        })
        .await?;
    tracing::info!(identity = record.id, username = ?record.username, "registered by name");
    Ok(record)
}

/// Attach a username and secret to the record owned by `session`.
///
/// The record is found by public key when one is given, falling back to the
/// username. A record that exists but belongs to another identity is
/// [`AuthError::NotOwner`].
pub async fn complete_registration(
    state: &AppState,
    session: &AuthenticatedSession,
    username: &str,
    secret: &str,
    public_key: Option<&str>,
) -> Result<IdentityRecord, AuthError> {
    let Some(username) = non_empty(Some(username)) else {
        return Err(AuthError::Invalid("username is required"));
    };
    if secret.is_empty() {
        return Err(AuthError::Invalid("secret is required"));
    }

    let mut existing = None;
    if let Some(pk) = non_empty(public_key) {
        existing = state.identities.find_by_public_key(&parse_key(&pk)?).await?;
    }
    if existing.is_none() {
        existing = state.identities.find_by_username(&username).await?;
    }
    let Some(existing) = existing else {
        return Err(StoreError::NotFound.into());
    };

    if existing.id != session.identity_id {
        tracing::warn!(
            identity = session.identity_id,
            target = existing.id,
            "registration completion for another identity refused"
        );
        return Err(AuthError::NotOwner);
    }

    let hash = hash_secret(secret).await?;
    let record = state
        .identities
        .update_credentials(existing.id, &username, &hash)
        .await?;
    tracing::info!(identity = record.id, "registration completed");
    Ok(record)
}

/// Whether `username` is free.
pub async fn username_available(state: &AppState, username: &str) -> Result<bool, AuthError> {
    Ok(state.identities.find_by_username(username).await?.is_none())
}

/// Whether `public_key` is free. A malformed key is rejected.
pub async fn public_key_available(state: &AppState, public_key: &str) -> Result<bool, AuthError> {
    let pk = parse_key(public_key)?;
    Ok(state.identities.find_by_public_key(&pk).await?.is_none())
}

/// Username registered for `public_key`, if any.
pub async fn username_for_key(
    state: &AppState,
    public_key: &str,
) -> Result<Option<String>, AuthError> {
    let pk = parse_key(public_key)?;
    Ok(state
        .identities
        .find_by_public_key(&pk)
        .await?
        .and_then(|r| r.username))
}

/// Public key registered for `username`, if any.
pub async fn key_for_username(
    state: &AppState,
    username: &str,
) -> Result<Option<String>, AuthError> {
    Ok(state
        .identities
        .find_by_username(username)
        .await?
        .and_then(|r| r.public_key))
}

/// Remove the record keyed by `public_key`. Missing records are `NotFound`.
pub async fn delete_by_key(state: &AppState, public_key: &str) -> Result<(), AuthError> {
    let pk = parse_key(public_key)?;
    if !state.identities.delete_by_public_key(&pk).await? {
        return Err(StoreError::NotFound.into());
    }
    tracing::info!(pubkey = %pk, "identity deleted");
    Ok(())
}
