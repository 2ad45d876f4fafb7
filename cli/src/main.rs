mod client;
mod commands;
mod storage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nostrauth", about = "Log in to a nostrauth server with a Nostr key")]
struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "NOSTRAUTH_VERBOSE")]
    verbose: bool,

    /// Server URL override (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, env = "NOSTRAUTH_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a signing key, or import one with --import
    Init {
        /// Read an existing hex secret key instead of generating one
        #[arg(long)]
        import: bool,

        /// Replace an existing identity without asking
        #[arg(long)]
        force: bool,
    },

    /// Register the local key (or just a username) with the server
    Register {
        #[arg(long)]
        username: Option<String>,

        /// Account secret; prompted for when omitted
        #[arg(long, env = "NOSTRAUTH_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Register a username and secret without a key
        #[arg(long)]
        name_only: bool,
    },

    /// Attach a username and secret to the registered local key
    Complete {
        #[arg(long)]
        username: String,

        #[arg(long, env = "NOSTRAUTH_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Log in by signing a server challenge; prints the session token
    Login,

    /// Log in with username and secret; prints the session token
    PasswordLogin {
        #[arg(long)]
        username: Option<String>,

        #[arg(long, env = "NOSTRAUTH_SECRET", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the local public key
    Whoami,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a config value
    Set { key: String, value: String },
    /// Get a config value
    Get { key: String },
}

fn server_url(flag: Option<String>) -> Result<String> {
    match flag {
        Some(url) => storage::validate_server_url(&url),
        None => Ok(storage::load_config()?.server),
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { import, force } => commands::init::run(import, force),
        Commands::Register {
            username,
            secret,
            name_only,
        } => commands::register::run(&server_url(cli.server)?, username, secret, name_only).await,
        Commands::Complete { username, secret } => {
            commands::register::complete(&server_url(cli.server)?, username, secret).await
        }
        Commands::Login => commands::login::run(&server_url(cli.server)?).await,
        Commands::PasswordLogin { username, password } => {
            commands::login::password(&server_url(cli.server)?, username, password).await
        }
        Commands::Whoami => commands::whoami::run(),
        Commands::Config { action } => match action {
            ConfigAction::Set { key, value } => commands::config::set(&key, &value),
            ConfigAction::Get { key } => commands::config::get(&key),
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
