mod auth;
mod config;
mod datastore;
mod handlers;
mod ws_player;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{AuthProvider, NoopAuthProvider};
use datastore::{Datastore, NoopDatastore};
use engine::Host;
use protocol::MAX_REQUEST_BODY_BYTES;
use tic_tac_toe::TicTacToeState;

const CONFIG_PATH: &str = "config/server.yaml";

/// Shared state handed to every handler: the lifecycle engine, and the
/// auth/datastore providers the original keeps as separate interfaces
/// rather than folding into the engine itself.
pub struct AppState {
    pub host: Arc<Host<TicTacToeState>>,
    pub auth: Arc<dyn AuthProvider>,
    pub datastore: Arc<dyn Datastore>,
}

#[tokio::main]
/// Loads configuration, wires up the lifecycle engine around the
/// tic-tac-toe game rules, and serves the HTTP/WebSocket surface until
/// interrupted.
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let config = match config::load_server_config(CONFIG_PATH).await {
        Ok(config) => config,
        Err(message) => {
            tracing::warn!(message, "falling back to default configuration");
            config::ServerConfig::default()
        }
    };

    let host = Host::new(
        tic_tac_toe::init(),
        tic_tac_toe::tick(),
        Duration::from_millis(config.server.tick_interval_ms),
    );

    let state = Arc::new(AppState {
        host,
        auth: Arc::new(NoopAuthProvider),
        datastore: Arc::new(NoopDatastore),
    });

    let app = Router::new()
        .route("/connect", post(handlers::connect))
        .route("/game/create", post(handlers::create_game))
        .route("/game/join", get(handlers::join_game))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!(%addr, "relay-server listening");

    // `with_graceful_shutdown` only starts draining once `shutdown_rx` resolves,
    // so the serve task itself runs for the process's whole lifetime; it is
    // spawned separately so the 10-second force-close deadline below starts
    // counting from the shutdown *signal*, not from startup.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let serve_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    // Give in-flight connections (including a game still in `Waiting` on a
    // long `waitForPlayersTimeout`) a 10-second grace period to drain, then
    // force-close rather than wait indefinitely.
    match tokio::time::timeout(Duration::from_secs(10), serve_task).await {
        Ok(Ok(result)) => result.unwrap(),
        Ok(Err(join_err)) => panic!("serve task panicked: {join_err}"),
        Err(_) => tracing::warn!("graceful shutdown deadline elapsed; forcing close"),
    }
}

/// Waits for Ctrl+C (or, on Unix, SIGTERM) so in-flight game instances get a
/// chance to observe cancellation before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
