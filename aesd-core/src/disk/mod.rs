//! Persistent state for the socket service.
//!
//! This module provides the append-only shared log that connection handlers
//! and the timestamp injector write to.

mod shared_log;

pub use shared_log::{SharedLog, SharedLogOptions};

use std::path::PathBuf;

/// Default location of the shared log's backing file.
pub const DEFAULT_DATA_PATH: &str = "/var/tmp/aesdsocketdata";

/// Returns the default path for the shared log.
pub fn get_default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}
