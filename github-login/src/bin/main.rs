//! github-login server

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

use github_login::{
    config::AppConfig,
    observability::{self, ObservabilityConfig},
    routes,
    session::spawn_purge_task,
    state::AppState,
};

#[derive(Parser)]
#[command(name = "github-login")]
#[command(version)]
#[command(about = "Sign in with GitHub using the OAuth2 authorization code flow", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./github-login.toml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding `server.bind`
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    observability::init(&ObservabilityConfig::default())
        .context("Failed to initialize logging")?;

    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let bind = config.server.bind;
    let purge_interval = config.session.purge_interval();
    let state = AppState::from_config(config).context("Invalid configuration")?;

    let purger = spawn_purge_task(state.sessions.clone(), purge_interval);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    purger.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => (),
        () = terminate => (),
    }
    info!("Shutdown signal received, shutting down server gracefully");
}
