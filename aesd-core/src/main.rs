use aesd_core::config::ServerConfig;
use aesd_core::daemon::{self, Detached};
use aesd_core::net::Server;
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: ServerConfig) -> anyhow::Result<()> {
    let background = config.daemon;
    let server = Server::bind(config).context("failed to start listening")?;
    info!("bound to {}", server.local_addr());

    // Fork before any runtime threads exist.
    if background {
        if let Detached::Parent(child) = daemon::daemonize().context("failed to detach")? {
            info!(%child, "running in the background");
            return Ok(());
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("aesdsocket-worker")
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(async move {
        let shutdown = CancellationToken::new();
        spawn_signal_handler(shutdown.clone()).context("failed to install signal handlers")?;
        server.run(shutdown).await?;
        anyhow::Ok(())
    })?;

    info!("server shutdown gracefully");
    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
///
/// Both handlers are registered before returning, so a failure surfaces
/// while the server is still starting.
fn spawn_signal_handler(shutdown: CancellationToken) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        shutdown.cancel();
    });

    Ok(())
}
