//! HTTP server: router, listener and background tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{delete, get, post};
use axum::Router;
use nostrauth_proto::wire::routes as paths;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::identity::SqliteIdentityStore;
use crate::routes;
use crate::state::{AppState, SharedState};

/// Build the `/api/auth` router over `state`.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(paths::CHALLENGE, get(routes::challenge))
        .route(paths::LOGIN_SIGNED, post(routes::login_user))
        .route(paths::REGISTER_KEY, post(routes::register_new_user))
        .route(paths::REGISTER_NAME, post(routes::register_without_nostr))
        .route(paths::COMPLETE_REGISTRATION, post(routes::complete_registration))
        .route(paths::LOGIN_PASSWORD, post(routes::password_login))
        .route(paths::CHECK_USERNAME, get(routes::check_username))
        .route(paths::CHECK_PUBKEY, get(routes::check_pubkey))
        .route(paths::GET_PUBKEY, get(routes::get_pubkey))
        .route(paths::GET_USERNAME, get(routes::get_username))
        .route(&format!("{}/:pub_key", paths::DELETE_PUBKEY), delete(routes::delete_pubkey))
        .route(paths::DISPLAY_NAME, get(routes::display_name))
        .route(paths::ME, get(routes::me))
        .route(paths::LOGOUT, post(routes::logout))
        .route(paths::HEALTH, get(routes::health))
        .with_state(state)
}

async fn build_state(config: ServerConfig) -> anyhow::Result<SharedState> {
    let store = SqliteIdentityStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open identity store at {}", config.database_url))?;
    Ok(Arc::new(AppState::new(config, Arc::new(store))))
}

async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    let app = router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}

/// Start the server and run until the listener fails.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let bind = config.bind.clone();
    let state = build_state(config).await?;

    {
        let state = state.clone();
        tokio::spawn(crate::cleanup::run_cleanup_loop(state));
    }

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(addr = %listener.local_addr()?, "nostrauth-server listening");

    serve(listener, state).await.context("server error")
}

/// Start the server on a random local port. Returns the bound address and
/// the task running it; abort the handle to stop the server.
pub async fn run_test(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let state = build_state(config).await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "test server stopped");
        }
    });

    Ok((addr, handle))
}
