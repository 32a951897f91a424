//! HTML Drop Server - HTTP surface for pasting and previewing HTML projects.
//!
//! Wraps `htmldrop-core` in an axum router, runs the expiry reaper on its
//! timer and shuts both down on Ctrl-C.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use htmldrop_core::{HtmlDrop, LogFormat, Settings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "htmldrop-server")]
#[command(about = "Paste HTML, get a preview link")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Directory holding projects and the resource cache (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(&args)?;

    init_logging(settings.log_format, args.debug);
    info!("Starting HTML Drop server");
    info!("Data directory: {}", settings.data_dir.display());
    info!("Public URL: {}", settings.host_url);

    let host = settings.host.clone();
    let port = settings.port;
    let service = HtmlDrop::builder(settings).build()?;
    let reaper = service.start_reaper();

    let handle = server::start_server(service, &host, port, shutdown_signal()).await?;
    info!("HTML Drop listening on {}", handle.addr);

    handle.wait().await?;
    reaper.stop().await;
    info!("Shutdown complete");

    Ok(())
}

/// Environment first, then command-line overrides.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::from_env()?;

    if let Some(host) = &args.host {
        settings.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.port = port;
        if std::env::var("HOST_URL").is_err() {
            settings.host_url = format!("http://127.0.0.1:{}", port);
        }
    }
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }

    Ok(settings)
}

fn init_logging(format: LogFormat, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Json => FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init(),
        LogFormat::Pretty => FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .compact()
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
