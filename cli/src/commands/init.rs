//! `nostrauth init`: create or import the local signing key.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Password};
use nostrauth_proto::keys;
use nostrauth_proto::Keys;

use crate::storage;

pub fn run(import: bool, force: bool) -> Result<()> {
    if let Some(existing) = storage::load_identity()? {
        let pk = existing.keys()?.public_key_hex();
        if !force
            && !Confirm::new()
                .with_prompt(format!("An identity for {pk} already exists. Replace it?"))
                .default(false)
                .interact()?
        {
            eprintln!("Keeping existing identity.");
            return Ok(());
        }
    }

    let keys = if import {
        let secret = Password::new()
            .with_prompt("Secret key (64 hex characters)")
            .interact()?;
        Keys::from_secret_hex(secret.trim()).context("not a valid secp256k1 secret key")?
    } else {
        eprintln!("Generating a new secp256k1 key...");
        Keys::generate()
    };

    let identity = storage::Identity {
        secret_key: keys.secret_hex().to_string(),
        username: None,
    };
    storage::save_identity(&identity)?;

    eprintln!("Identity saved to ~/.nostrauth/identity.toml");
    println!("{}", keys.public_key_hex());
    println!("{}", keys::encode_npub(&keys.public_key())?);

    if storage::load_config()?.server.is_empty() {
        storage::save_config(&storage::Config::default())?;
    }

    Ok(())
}
