//! Per-connection protocol.
//!
//! A client sends bytes until a line feed. Everything read up to and
//! including the chunk holding the line feed becomes one record, which is
//! appended to the shared log. The whole log is then written back and the
//! connection is closed.

use crate::disk::SharedLog;
use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Byte that terminates a client record.
pub const RECORD_DELIMITER: u8 = b'\n';

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// A record was appended and the log was sent back.
    Replied {
        /// Bytes appended for this connection.
        record_len: usize,
        /// Bytes of log sent back.
        response_len: usize,
    },

    /// The peer closed before sending a delimiter. Nothing was appended.
    ClosedEarly {
        /// Bytes received and dropped.
        discarded: usize,
    },
}

/// Result of reading from the peer.
enum Framed {
    Record(Vec<u8>),
    Closed(usize),
}

/// Serves single connections against a shared log.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    /// Log every connection appends to and reads from.
    log: Arc<SharedLog>,

    /// Bytes requested per read.
    read_chunk_size: usize,
}

impl ConnectionHandler {
    /// Creates a handler. `read_chunk_size` must be non-zero.
    pub fn new(log: Arc<SharedLog>, read_chunk_size: usize) -> Self {
        Self {
            log,
            read_chunk_size: read_chunk_size.max(1),
        }
    }

    /// Runs the protocol for one TCP connection, logging its lifecycle.
    pub async fn serve(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        info!("Accepted connection from {}", peer.ip());

        match self.handle(stream).await {
            Ok(ConnectionOutcome::Replied {
                record_len,
                response_len,
            }) => debug!(record_len, response_len, "record appended"),
            Ok(ConnectionOutcome::ClosedEarly { discarded }) => {
                debug!(discarded, "peer closed before end of record")
            }
            Err(e) if e.is_not_found() => warn!("shared log is gone, dropping record: {e}"),
            Err(e) => warn!("connection failed: {e}"),
        }

        info!("Closed connection from {}", peer.ip());
    }

    /// Runs the protocol over any byte stream.
    ///
    /// The stream is closed when this returns.
    pub async fn handle<S>(&self, mut stream: S) -> Result<ConnectionOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let record = match self.read_record(&mut stream).await? {
            Framed::Record(record) => record,
            Framed::Closed(discarded) => {
                return Ok(ConnectionOutcome::ClosedEarly { discarded });
            }
        };

        self.log.append(&record).await?;
        let contents = self.log.read_all().await?;

        stream.write_all(&contents).await.map_err(Error::Connection)?;
        stream.flush().await.map_err(Error::Connection)?;
        if let Err(e) = stream.shutdown().await {
            // The reply is already flushed; the peer may simply have gone.
            debug!("shutdown after reply failed: {e}");
        }

        Ok(ConnectionOutcome::Replied {
            record_len: record.len(),
            response_len: contents.len(),
        })
    }

    /// Reads until a chunk containing the delimiter arrives or the peer closes.
    async fn read_record<S>(&self, stream: &mut S) -> Result<Framed>
    where
        S: AsyncRead + Unpin,
    {
        let mut record = Vec::new();
        let mut chunk = vec![0u8; self.read_chunk_size];

        loop {
            let n = stream.read(&mut chunk).await.map_err(Error::Connection)?;
            if n == 0 {
                return Ok(Framed::Closed(record.len()));
            }

            record
                .try_reserve(n)
                .map_err(|_| Error::RecordAllocation {
                    buffered: record.len(),
                    requested: n,
                })?;
            record.extend_from_slice(&chunk[..n]);

            if chunk[..n].contains(&RECORD_DELIMITER) {
                return Ok(Framed::Record(record));
            }
        }
    }
}
