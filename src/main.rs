/// trailhead server binary
///
/// Parses command-line arguments, optionally seeds the in-memory store
/// from a JSON file, and serves the API.

use clap::Parser;
use std::path::PathBuf;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use trailhead::http;
use trailhead::state::AppState;

#[derive(Parser)]
#[command(name = "trailhead", about = "Tour booking REST API")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// JSON file with initial tours, users, and reviews
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let state = AppState::new();

    if let Some(path) = &cli.seed {
        let raw = std::fs::read_to_string(path)?;
        let root = serde_json::from_str(&raw)?;
        let loaded = state.seed(&root)?;
        info!(count = loaded, "seed data loaded");
    }

    let app = http::router(state);

    let address = format!("0.0.0.0:{}", cli.port);
    let listener = TcpListener::bind(&address).await?;
    info!("listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
