//! `nostrauth register` / `nostrauth complete`.

use anyhow::Result;
use dialoguer::Password;

use crate::client::AuthClient;
use crate::storage;

fn read_secret(secret: Option<String>) -> Result<String> {
    match secret {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Ok(Password::new()
            .with_prompt("Account secret")
            .with_confirmation("Confirm secret", "Secrets do not match")
            .interact()?),
    }
}

pub async fn run(
    server: &str,
    username: Option<String>,
    secret: Option<String>,
    name_only: bool,
) -> Result<()> {
    let client = AuthClient::new(server);
    let secret = read_secret(secret)?;

    if name_only {
        let username =
            username.ok_or_else(|| anyhow::anyhow!("--name-only requires --username"))?;
        let resp = client.register_name(&username, &secret).await?;
        eprintln!("{} ({username})", resp.message);
        return Ok(());
    }

    let mut identity = storage::require_identity()?;
    let pk = identity.keys()?.public_key_hex();
    let resp = client.register_key(&pk, &secret, username.as_deref()).await?;
    eprintln!("{} ({pk})", resp.message);

    if username.is_some() {
        identity.username = username;
        storage::save_identity(&identity)?;
    }
    Ok(())
}

/// Attach a username and secret to the local key's record.
///
/// Logs in with the local key first; the server only completes a record for
/// the session that owns it.
pub async fn complete(server: &str, username: String, secret: Option<String>) -> Result<()> {
    let client = AuthClient::new(server);
    let secret = read_secret(secret)?;

    let mut identity = storage::require_identity()?;
    let keys = identity.keys()?;
    let pk = keys.public_key_hex();
    let session = client.login_with_keys(&keys).await?;
    let resp = client
        .complete_registration(&session.token, &username, &secret, Some(&pk))
        .await?;
    eprintln!("{}", resp.message);

    identity.username = Some(username);
    storage::save_identity(&identity)?;
    Ok(())
}
