//! Server configuration.

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "nostrauth-server", about = "Nostr challenge/response authentication server")]
pub struct ServerArgs {
    /// Address to bind (e.g. "0.0.0.0:8080")
    #[arg(long, env = "NOSTRAUTH_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// SQLite connection string for identity records.
    #[arg(long, env = "NOSTRAUTH_DATABASE_URL", default_value = "sqlite://nostrauth.db?mode=rwc")]
    pub database_url: String,

    /// Challenge validity window in seconds.
    #[arg(long, env = "NOSTRAUTH_CHALLENGE_TTL", default_value = "300")]
    pub challenge_ttl: u64,

    /// Authenticated session expiry in seconds.
    #[arg(long, env = "NOSTRAUTH_SESSION_EXPIRY", default_value = "3600")]
    pub session_expiry: u64,

    /// Login rate limit: max attempts per IP per minute.
    #[arg(long, env = "NOSTRAUTH_RATE_LIMIT_AUTH", default_value = "10")]
    pub rate_limit_auth: u32,

    /// Nostr relay queried for profile display names.
    #[arg(long, env = "NOSTRAUTH_PROFILE_RELAY", default_value = "wss://relay.nostrich.cc")]
    pub profile_relay: String,

    /// Upper bound on a display-name lookup, in seconds.
    #[arg(long, env = "NOSTRAUTH_PROFILE_TIMEOUT", default_value = "5")]
    pub profile_timeout: u64,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, env = "NOSTRAUTH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Parsed configuration used throughout the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    pub challenge_ttl: Duration,
    pub session_expiry: Duration,
    pub rate_limit_auth: u32,
    pub profile_relay: String,
    pub profile_timeout: Duration,
    pub log_level: String,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            bind: args.bind,
            database_url: args.database_url,
            challenge_ttl: Duration::from_secs(args.challenge_ttl),
            session_expiry: Duration::from_secs(args.session_expiry),
            rate_limit_auth: args.rate_limit_auth,
            profile_relay: args.profile_relay,
            profile_timeout: Duration::from_secs(args.profile_timeout),
            log_level: args.log_level,
        }
    }
}

impl ServerConfig {
    /// In-memory database, short windows, generous limits.
    pub fn for_tests() -> Self {
        Self {
            bind: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            challenge_ttl: Duration::from_secs(60),
            session_expiry: Duration::from_secs(60),
            rate_limit_auth: 1000,
            profile_relay: "ws://127.0.0.1:9".into(),
            profile_timeout: Duration::from_millis(200),
            log_level: "warn".into(),
        }
    }
}
