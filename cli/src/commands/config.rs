//! `nostrauth config set/get`: server URL management.

use crate::storage;
use anyhow::Result;

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut config = storage::load_config()?;

    match key {
        "server" => {
            config.server = storage::validate_server_url(value)?;
            storage::save_config(&config)?;
            eprintln!("server = {}", config.server);
        }
        _ => anyhow::bail!("unknown config key: {key} (valid keys: server)"),
    }

    Ok(())
}

pub fn get(key: &str) -> Result<()> {
    let config = storage::load_config()?;

    match key {
        "server" => println!("{}", config.server),
        _ => anyhow::bail!("unknown config key: {key} (valid keys: server)"),
    }

    Ok(())
}
