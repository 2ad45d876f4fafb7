//! ~/.nostrauth/ config and identity files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use nostrauth_proto::Keys;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Get the nostrauth config directory (~/.nostrauth/).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".nostrauth"))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

// ── config.toml ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
        }
    }
}

fn default_server() -> String {
    "http://127.0.0.1:8080".into()
}

/// Server URLs must be http(s) with no trailing slash.
pub fn validate_server_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("invalid server URL {url:?}: must start with http:// or https://");
    }
    Ok(url.to_string())
}

pub fn load_config() -> Result<Config> {
    let path = config_dir()?.join("config.toml");
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let mut config: Config = toml::from_str(&contents)?;
    if config.server.is_empty() {
        config.server = default_server();
    } else {
        config.server = validate_server_url(&config.server).with_context(|| {
            format!(
                "in ~/.nostrauth/config.toml; reset it with: nostrauth config set server {}",
                default_server()
            )
        })?;
    }
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    let dir = ensure_config_dir()?;
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(dir.join("config.toml"), contents)?;
    Ok(())
}

// ── identity.toml ──

#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Hex secp256k1 secret key.
    pub secret_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    pub fn keys(&self) -> Result<Keys> {
        Keys::from_secret_hex(&self.secret_key).context("identity.toml holds an invalid secret key")
    }
}

pub fn load_identity() -> Result<Option<Identity>> {
    let path = config_dir()?.join("identity.toml");
    if !path.exists() {
        return Ok(None);
    }
    let contents = Zeroizing::new(std::fs::read_to_string(&path)?);
    let id: Identity = toml::from_str(&contents)?;
    Ok(Some(id))
}

/// Like [`load_identity`] but a missing file is an error.
pub fn require_identity() -> Result<Identity> {
    load_identity()?.context("no identity found; run `nostrauth init` first")
}

pub fn save_identity(identity: &Identity) -> Result<()> {
    let dir = ensure_config_dir()?;
    let path = dir.join("identity.toml");
    let contents = Zeroizing::new(toml::to_string_pretty(identity)?);
    std::fs::write(&path, contents.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_must_be_http() {
        assert_eq!(
            validate_server_url("https://auth.example.com/").unwrap(),
            "https://auth.example.com"
        );
        assert!(validate_server_url("ws://auth.example.com").is_err());
        assert!(validate_server_url("auth.example.com").is_err());
    }

    #[test]
    fn identity_toml_shape() {
        let id = Identity {
            secret_key: "00".repeat(31) + "03",
            username: None,
        };
        let text = toml::to_string_pretty(&id).unwrap();
        assert!(!text.contains("username"));
        let back: Identity = toml::from_str(&text).unwrap();
        assert_eq!(
            back.keys().unwrap().public_key_hex(),
            "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );
    }
}
