//! Server lifecycle.
//!
//! The server moves through `Starting -> Listening -> Draining -> Stopped`.
//! Binding happens in [`Server::bind`] so that failures surface before the
//! process detaches; the remaining startup work, the accept loop and the
//! drain all happen in [`Server::run`].

use crate::config::ServerConfig;
use crate::disk::SharedLog;
use crate::error::{Error, Result};
use crate::net::handler::ConnectionHandler;
use crate::net::listener::bind_listener;
use crate::timestamp::TimestampInjector;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Pause after a failed accept. Errors such as `EMFILE` leave the listener
/// readable.
const ACCEPT_ERROR_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

/// Lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Binding and preparing the shared log.
    Starting,

    /// Accepting connections; the timestamp task is running.
    Listening,

    /// No longer accepting; background work is being wound down.
    Draining,

    /// Every resource has been released.
    Stopped,
}

/// A bound, not yet running, socket server.
#[derive(Debug)]
pub struct Server {
    /// Configuration the server was bound with.
    config: ServerConfig,

    /// Listening socket, created in `bind`.
    listener: std::net::TcpListener,

    /// Actual bound address (resolves port 0).
    local_addr: SocketAddr,

    /// Broadcasts state transitions.
    state: watch::Sender<ServerState>,
}

impl Server {
    /// Resolves the configured address and starts listening on it.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let addr = config.listen_addr()?;
        let listener = bind_listener(addr, config.backlog)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Listen { addr, source })?;
        let (state, _) = watch::channel(ServerState::Starting);

        Ok(Self {
            config,
            listener,
            local_addr,
            state,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Subscribes to lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Runs until `shutdown` is cancelled, then drains and returns.
    ///
    /// Errors are only returned from the startup phase. Per-connection
    /// failures are logged and do not stop the server.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let Self {
            config,
            listener,
            local_addr,
            state,
        } = self;

        let log = Arc::new(SharedLog::create(config.shared_log_options()).await?);
        let listener = TcpListener::from_std(listener).map_err(|source| Error::Listen {
            addr: local_addr,
            source,
        })?;

        let injector = TimestampInjector::spawn(
            log.clone(),
            config.timestamp_interval(),
            shutdown.child_token(),
        );
        let handler = ConnectionHandler::new(log.clone(), config.read_chunk_size);
        let tracker = TaskTracker::new();

        state.send_replace(ServerState::Listening);
        info!("listening on {local_addr}, logging to {}", log.path().display());

        let incoming = &listener;
        accept_loop(
            move || incoming.accept(),
            &handler,
            &tracker,
            &config,
            &shutdown,
        )
        .await;

        state.send_replace(ServerState::Draining);
        info!("shutdown requested, draining");

        let injected = injector.stop().await;
        info!(injected, "timestamp task stopped");

        drop(listener);

        tracker.close();
        if time::timeout(config.drain_timeout(), tracker.wait())
            .await
            .is_err()
        {
            warn!(
                in_flight = tracker.len(),
                "connections still open after drain timeout; they will fail"
            );
        }

        match log.remove().await {
            Ok(true) => info!("removed {}", log.path().display()),
            Ok(false) => warn!("{} was already gone", log.path().display()),
            Err(e) => warn!("failed to remove shared log: {e}"),
        }

        state.send_replace(ServerState::Stopped);
        Ok(())
    }
}

/// Accepts connections until `shutdown` is cancelled.
///
/// Each wait for a connection is bounded by the poll interval so the loop
/// re-checks for shutdown at least that often.
async fn accept_loop<A, F>(
    mut accept: A,
    handler: &ConnectionHandler,
    tracker: &TaskTracker,
    config: &ServerConfig,
    shutdown: &CancellationToken,
) where
    A: FnMut() -> F,
    F: Future<Output = io::Result<(TcpStream, SocketAddr)>>,
{
    let poll_interval = config.poll_interval();

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = time::timeout(poll_interval, accept()) => match accepted {
                Err(_elapsed) => continue,
                Ok(Ok((stream, peer))) => {
                    let handler = handler.clone();
                    let span = info_span!("connection", id = %Uuid::new_v4(), %peer);
                    tracker.spawn(async move { handler.serve(stream, peer).await }.instrument(span));
                }
                Ok(Err(e)) => {
                    warn!("Failed to accept connection: {e}");
                    time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}
