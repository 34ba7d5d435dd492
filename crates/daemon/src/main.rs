//! Harbor - Main Entry Point
//! Thread-pool HTTP server: one accept thread, N workers, bounded queue

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::TcpStream;
use std::sync::Arc;
use tracing::info;

use config::{CliArgs, ServerConfig};
use harbor_core::application::Server;
use harbor_core::port::ConnectionHandler;
use harbor_infra_net::{HttpResponder, TcpAcceptor};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// The server runs on plain OS threads; the runtime only waits for signals.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = ServerConfig::try_from(CliArgs::parse())?;

    // 2. Initialize logging
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;
    info!("Harbor server v{} starting...", VERSION);

    // 3. Bind listener
    let listener = TcpAcceptor::bind(config.bind_addr())
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    // 4. Wire handler and start the pool
    let handler: Arc<dyn ConnectionHandler<TcpStream>> =
        Arc::new(HttpResponder::new(config.response_delay));
    let server = Server::start(config.pool, listener, handler)?;

    info!(
        addr = ?server.local_addr(),
        workers = server.worker_count(),
        response_delay_ms = config.response_delay.as_millis() as u64,
        "System ready. Press Ctrl+C to shutdown"
    );

    // 5. Wait for shutdown signal
    shutdown_signal().await?;
    info!("Shutdown signal received. Draining accepted connections...");

    // 6. Graceful shutdown (joins OS threads, so keep it off the runtime)
    let report = tokio::task::spawn_blocking(move || server.shutdown()).await??;

    info!(
        accepted = report.accept.accepted,
        accept_failures = report.accept.failed,
        handled = report.pool.handled,
        failed = report.pool.failed,
        panicked = report.pool.panicked,
        "Shutdown complete."
    );

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
