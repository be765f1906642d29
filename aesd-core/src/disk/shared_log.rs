//! Append-only shared log backed by a single file.
//!
//! Every operation takes the same lock for its full duration, so an append
//! is never observed half-written by a concurrent `read_all` and two appends
//! never interleave.

use crate::disk::DEFAULT_DATA_PATH;
use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Options for creating a shared log.
#[derive(Debug, Clone)]
pub struct SharedLogOptions {
    /// Path to the backing file.
    pub path: PathBuf,

    /// Whether to `fsync` file data after every append.
    pub sync_on_append: bool,
}

impl Default for SharedLogOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            sync_on_append: false,
        }
    }
}

/// An append-only byte log whose operations are serialized by one lock.
#[derive(Debug)]
pub struct SharedLog {
    /// Options the log was created with.
    options: SharedLogOptions,

    /// Held across the whole of every operation.
    lock: Mutex<()>,
}

impl SharedLog {
    /// Wraps the backing file at `options.path` without touching it.
    pub fn new(options: SharedLogOptions) -> Self {
        Self {
            options,
            lock: Mutex::new(()),
        }
    }

    /// Creates the log and truncates its backing file to empty.
    pub async fn create(options: SharedLogOptions) -> Result<Self> {
        let log = Self::new(options);
        log.reset().await?;
        Ok(log)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.options.path
    }

    /// Creates the backing file, or truncates it if it already exists.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.lock.lock().await;

        let file = File::create(self.path()).await.map_err(self.io_err("reset"))?;
        if self.options.sync_on_append {
            file.sync_all().await.map_err(self.io_err("reset"))?;
        }

        tracing::debug!(path = %self.path().display(), "shared log reset");
        Ok(())
    }

    /// Appends `bytes` as one record.
    ///
    /// The backing file is not created here: once it has been removed,
    /// appends fail with a not-found error.
    pub async fn append(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .append(true)
            .open(self.path())
            .await
            .map_err(self.io_err("append"))?;

        file.write_all(bytes).await.map_err(self.io_err("append"))?;
        // tokio buffers file writes; flush before the lock is released.
        file.flush().await.map_err(self.io_err("append"))?;

        if self.options.sync_on_append {
            file.sync_data().await.map_err(self.io_err("append"))?;
        }

        tracing::trace!(bytes = bytes.len(), "appended record");
        Ok(())
    }

    /// Reads the entire log.
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        let _guard = self.lock.lock().await;

        fs::read(self.path()).await.map_err(self.io_err("read"))
    }

    /// Current size of the log in bytes.
    pub async fn len(&self) -> Result<u64> {
        let _guard = self.lock.lock().await;

        let meta = fs::metadata(self.path()).await.map_err(self.io_err("stat"))?;
        Ok(meta.len())
    }

    /// Removes the backing file.
    ///
    /// Returns `false` if it was already gone.
    pub async fn remove(&self) -> Result<bool> {
        let _guard = self.lock.lock().await;

        match fs::remove_file(self.path()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_err("remove")(e)),
        }
    }

    fn io_err(&self, op: &'static str) -> impl Fn(io::Error) -> Error + '_ {
        move |source| Error::SharedLog {
            op,
            path: self.options.path.clone(),
            source,
        }
    }
}
