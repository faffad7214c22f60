//! reelscout server entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelscout_server::{AppState, ServerConfig, router};

#[derive(Parser)]
#[command(
    name = "reelscout",
    about = "HTTP endpoints for finding movie download and streaming links",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port), overrides the config file.
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    let app = router(AppState::from_config(&config)?);
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;

    tracing::info!(
        listen = %config.server.listen,
        download_service = %config.upstream.download_service_url,
        "reelscout listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
