//! `nostrauth whoami`: print the local identity.

use anyhow::Result;
use nostrauth_proto::keys;

use crate::storage;

pub fn run() -> Result<()> {
    let identity = storage::require_identity()?;
    let keys = identity.keys()?;

    println!("pubkey:   {}", keys.public_key_hex());
    println!("npub:     {}", keys::encode_npub(&keys.public_key())?);
    if let Some(name) = identity.username {
        println!("username: {name}");
    }
    Ok(())
}
