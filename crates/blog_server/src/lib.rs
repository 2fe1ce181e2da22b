//! HTTP surface of the blog article service.
//!
//! # Routes
//! - `GET  /api/articles/{name}`: article with `canUpvote` for the caller.
//! - `PUT  /api/articles/{name}/upvote`: upvote per deployment mode.
//! - `POST /api/articles/{name}/comments`: append `{ postedBy?, text }`.
//! - `GET  /api/health`: liveness probe.
//!
//! Any other path is served from `BLOG_STATIC_DIR` when configured, falling
//! back to its `index.html` so the frontend router can resolve it.
//!
//! # Identity
//! The `authtoken` header is verified on every route. An unverifiable token
//! is rejected with 401; it is never treated as anonymous. In
//! `authenticated` mode the upvote and comment routes also require a
//! verified caller, while reads stay anonymous with `canUpvote=false`.
//!
//! # Setup
//!
//! ```sh
//! blog_cli --db blog.sqlite3 seed
//! BLOG_AUTH_MODE=authenticated BLOG_TOKENS_FILE=tokens.json blog_server
//! ```

use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
    routing::{get, post, put},
    Router,
};
use blog_core::{db::DbError, init_logging, RepoError};
use log::{error, info};
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::services::{ServeDir, ServeFile};

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

use config::{Config, ConfigError};
use identity::TokenFileError;
use routes::{
    add_comment_handler, api_not_found_handler, get_article_handler, health_handler,
    upvote_handler,
};
use state::AppState;

/// Startup failures. Request-time failures use [`error::AppError`].
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("article store setup failed: {0}")]
    Db(#[from] DbError),

    #[error("article store setup failed: {0}")]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Tokens(#[from] TokenFileError),

    #[error("server i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds the router for `state`, optionally serving a built frontend.
pub fn app(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/articles/:name", get(get_article_handler))
        .route("/articles/:name/upvote", put(upvote_handler))
        .route("/articles/:name/comments", post(add_comment_handler))
        .fallback(api_not_found_handler);

    let router = Router::new().nest("/api", api);

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    router.with_state(state)
}

/// Loads configuration, prepares the store and serves until shutdown.
pub async fn start_server() -> Result<(), ServerError> {
    let config = Config::load()?;
    init_logging(&config.log_level, config.log_dir.as_deref()).map_err(ServerError::Logging)?;

    info!(
        "event=server_init module=server status=start auth_mode={} upvote_policy={}",
        config.auth_mode.as_str(),
        config.auth_mode.upvote_policy().as_str()
    );
    let state = AppState::from_config(&config)?;

    let app = app(state, config.static_dir.as_deref());

    let address = SocketAddr::new(config.bind_addr, config.port);
    let listener = TcpListener::bind(address).await?;
    info!("event=server_listen module=server status=ok address={address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("event=shutdown_signal module=server signal=ctrl_c"),
            Err(err) => {
                error!("event=shutdown_signal module=server status=error signal=ctrl_c error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=shutdown_signal module=server signal=terminate");
            }
            Err(err) => {
                error!(
                    "event=shutdown_signal module=server status=error signal=terminate error={err}"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
