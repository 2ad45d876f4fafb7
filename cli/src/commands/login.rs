//! `nostrauth login` and `nostrauth password-login`.

use anyhow::Result;
use dialoguer::Password;
use nostrauth_proto::wire::SessionResponse;

use crate::client::AuthClient;
use crate::storage;

fn report(session: &SessionResponse) {
    let who = session
        .user_name
        .as_deref()
        .or(session.pub_key.as_deref())
        .unwrap_or("unknown");
    eprintln!("Logged in as {who} via {} (expires at {})", session.method, session.expires_at);
    println!("{}", session.token);
}

/// Answer a server challenge with the local key.
pub async fn run(server: &str) -> Result<()> {
    let keys = storage::require_identity()?.keys()?;
    let session = AuthClient::new(server).login_with_keys(&keys).await?;
    report(&session);
    Ok(())
}

pub async fn password(
    server: &str,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let stored = || storage::load_identity().ok().flatten().and_then(|i| i.username);
    let username = match username.or_else(stored) {
        Some(u) => u,
        None => dialoguer::Input::new().with_prompt("Username").interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Secret").interact()?,
    };

    let session = AuthClient::new(server)
        .login_with_password(&username, &password)
        .await?;
    report(&session);
    Ok(())
}
