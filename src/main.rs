//! Diep Arena Server - authoritative multiplayer arena shooter
//!
//! Players connect over WebSocket to a named room. Every room runs its own
//! simulation task; HTTP serves health, room listings and the static client.

mod app;
mod config;
mod game;
mod http;
mod util;
mod ws;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Configuration errors are fatal before any room starts
    let config = Config::from_env()?;

    init_tracing(&config);
    init_server_time();

    info!(
        addr = %config.server_addr,
        max_rooms = config.rooms.max_rooms,
        max_room_members = config.rooms.max_room_members,
        framerate = config.rooms.framerate,
        stuff_types = config.rooms.stuff_types.len(),
        "Starting Diep Arena Server"
    );

    let addr = config.server_addr;
    let router = build_router(AppState::new(config));
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/game_ws?name=<player>&room=<room>", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL`
fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_json {
        registry.with(fmt::layer().json().with_target(false)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };
    info!(signal, "Shutting down, closing listener");
}
