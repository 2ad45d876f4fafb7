use clap::Parser;
use nostrauth_server::config::{ServerArgs, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    let config = ServerConfig::from(args);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Err(e) = nostrauth_server::server::run(config).await {
        tracing::error!("server error: {e:#}");
        std::process::exit(1);
    }
}
