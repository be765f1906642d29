//! Error type for the aesd socket service.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors produced by the ring index, the shared log, connection handling
/// and service startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A ring index was requested with room for no records.
    #[error("ring index capacity must be at least 1")]
    ZeroCapacity,

    /// An operation on the shared log's backing store failed.
    #[error("failed to {op} shared log at {}: {source}", .path.display())]
    SharedLog {
        /// The operation that failed (`append`, `read`, `reset`, `remove`, `stat`).
        op: &'static str,
        /// Backing store location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to a client connection failed.
    #[error("connection i/o failed: {0}")]
    Connection(#[source] io::Error),

    /// The record buffer could not grow to hold more client bytes.
    #[error("failed to reserve {requested} more bytes for a record of {buffered} bytes")]
    RecordAllocation {
        /// Bytes already accumulated for the record.
        buffered: usize,
        /// Additional bytes requested.
        requested: usize,
    },

    /// Creating, binding or listening on the service endpoint failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// The address we tried to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configured listen address could not be parsed or resolved.
    #[error("invalid listen address {0:?}")]
    Address(String),

    /// Detaching into the background failed.
    #[error("failed to daemonize: {0}")]
    Daemonize(#[from] nix::Error),
}

impl Error {
    /// Returns true if the error came from a backing store that no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SharedLog { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
