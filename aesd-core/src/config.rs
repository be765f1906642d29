//! Service configuration.
//!
//! Every option can be given on the command line or through an `AESD_*`
//! environment variable.

use crate::disk::{SharedLogOptions, DEFAULT_DATA_PATH};
use crate::error::{Error, Result};
use crate::timestamp::DEFAULT_TIMESTAMP_INTERVAL;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

/// Default listen host (all IPv4 interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 9000;

/// Default listen backlog.
pub const DEFAULT_BACKLOG: i32 = 5;

/// Default bytes requested per socket read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Configuration for the aesd socket server.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "aesdsocket", version, about = "Line-oriented append log over TCP")]
pub struct ServerConfig {
    /// Run in the background, detached from the controlling terminal.
    #[arg(short = 'd', long)]
    pub daemon: bool,

    /// Host to bind on.
    #[arg(long, default_value = DEFAULT_HOST, env = "AESD_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "AESD_PORT")]
    pub port: u16,

    /// Backing file for the shared log. Truncated at start, removed at exit.
    #[arg(long, default_value = DEFAULT_DATA_PATH, env = "AESD_DATA_FILE")]
    pub data_file: PathBuf,

    /// Listen backlog.
    #[arg(long, default_value_t = DEFAULT_BACKLOG, env = "AESD_BACKLOG")]
    pub backlog: i32,

    /// Seconds between injected timestamp records.
    #[arg(
        long,
        default_value_t = DEFAULT_TIMESTAMP_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        env = "AESD_TIMESTAMP_INTERVAL_SECS"
    )]
    pub timestamp_interval_secs: u64,

    /// Upper bound, in milliseconds, on each wait for a connection.
    #[arg(
        long,
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "AESD_POLL_INTERVAL_MS"
    )]
    pub poll_interval_ms: u64,

    /// How long shutdown waits for in-flight connections, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "AESD_DRAIN_TIMEOUT_MS")]
    pub drain_timeout_ms: u64,

    /// Bytes requested per socket read.
    #[arg(
        long,
        default_value_t = DEFAULT_READ_CHUNK_SIZE,
        value_parser = parse_chunk_size,
        env = "AESD_READ_CHUNK_SIZE"
    )]
    pub read_chunk_size: usize,

    /// Flush file data to stable storage after every append.
    #[arg(long)]
    pub sync_on_append: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            daemon: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_PATH),
            backlog: DEFAULT_BACKLOG,
            timestamp_interval_secs: DEFAULT_TIMESTAMP_INTERVAL.as_secs(),
            poll_interval_ms: 1000,
            drain_timeout_ms: 5000,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            sync_on_append: false,
        }
    }
}

impl ServerConfig {
    /// Period between injected timestamp records.
    pub fn timestamp_interval(&self) -> Duration {
        Duration::from_secs(self.timestamp_interval_secs)
    }

    /// Longest single wait for a connection before re-checking for shutdown.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// How long shutdown waits for in-flight connections.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Options for the shared log this server writes to.
    pub fn shared_log_options(&self) -> SharedLogOptions {
        SharedLogOptions {
            path: self.data_file.clone(),
            sync_on_append: self.sync_on_append,
        }
    }

    /// Resolves `host:port` to the first matching socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        // Bracket-less IPv6 literals don't parse through ToSocketAddrs.
        if let Ok(ip) = self.host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        let target = format!("{}:{}", self.host, self.port);
        target
            .to_socket_addrs()
            .map_err(|_| Error::Address(target.clone()))?
            .next()
            .ok_or(Error::Address(target))
    }
}

fn parse_chunk_size(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("read chunk size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_defaults_match_default_impl() {
        let parsed = ServerConfig::try_parse_from(["aesdsocket"]).unwrap();
        let default = ServerConfig::default();

        assert_eq!(parsed.daemon, default.daemon);
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.backlog, default.backlog);
        assert_eq!(parsed.data_file, default.data_file);
        assert_eq!(parsed.timestamp_interval(), DEFAULT_TIMESTAMP_INTERVAL);
        assert_eq!(default.timestamp_interval(), DEFAULT_TIMESTAMP_INTERVAL);
        assert_eq!(parsed.poll_interval(), Duration::from_secs(1));
        assert_eq!(parsed.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
    }

    #[test]
    fn test_daemon_flag() {
        let parsed = ServerConfig::try_parse_from(["aesdsocket", "-d"]).unwrap();
        assert!(parsed.daemon);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        assert!(ServerConfig::try_parse_from(["aesdsocket", "--timestamp-interval-secs", "0"]).is_err());
        assert!(ServerConfig::try_parse_from(["aesdsocket", "--poll-interval-ms", "0"]).is_err());
        assert!(ServerConfig::try_parse_from(["aesdsocket", "--read-chunk-size", "0"]).is_err());
    }

    #[test]
    fn test_listen_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9123,
            ..Default::default()
        };
        assert_eq!(config.listen_addr().unwrap(), "127.0.0.1:9123".parse().unwrap());

        let config = ServerConfig {
            host: "::1".to_string(),
            port: 9123,
            ..Default::default()
        };
        assert_eq!(config.listen_addr().unwrap(), "[::1]:9123".parse().unwrap());
    }

    #[test]
    fn test_shared_log_options() {
        let config = ServerConfig {
            data_file: PathBuf::from("/tmp/aesd-test-data"),
            sync_on_append: true,
            ..Default::default()
        };

        let options = config.shared_log_options();
        assert_eq!(options.path, PathBuf::from("/tmp/aesd-test-data"));
        assert!(options.sync_on_append);
    }
}
