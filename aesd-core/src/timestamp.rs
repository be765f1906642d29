//! Periodic timestamp records.
//!
//! While the server is listening, one background task appends a line of the
//! form `timestamp:<RFC 2822 time>\n` to the shared log on a fixed period.

use crate::disk::SharedLog;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// `strftime` pattern for the time portion of a timestamp record.
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Default period between timestamp records.
pub const DEFAULT_TIMESTAMP_INTERVAL: Duration = Duration::from_secs(10);

/// Formats a complete timestamp record, trailing newline included.
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("timestamp:{}\n", at.format(TIMESTAMP_FORMAT))
}

/// Handle to the running timestamp task.
#[derive(Debug)]
pub struct TimestampInjector {
    /// Cancelled to ask the task to finish.
    stop: CancellationToken,

    /// Resolves to the number of records appended.
    handle: JoinHandle<u64>,
}

impl TimestampInjector {
    /// Starts appending a timestamp to `log` every `interval`.
    ///
    /// The first record is written one full interval after this call. The
    /// task also ends when `stop` is cancelled by someone else.
    pub fn spawn(log: Arc<SharedLog>, interval: Duration, stop: CancellationToken) -> Self {
        let handle = tokio::spawn(run(log, interval, stop.clone()));
        Self { stop, handle }
    }

    /// Whether the task has already exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Asks the task to stop and waits for it.
    ///
    /// An append already in progress completes first; nothing is appended
    /// after this returns. Returns the number of records written.
    pub async fn stop(self) -> u64 {
        self.stop.cancel();

        match self.handle.await {
            Ok(injected) => injected,
            Err(e) => {
                error!("timestamp task failed: {e}");
                0
            }
        }
    }
}

async fn run(log: Arc<SharedLog>, period: Duration, stop: CancellationToken) -> u64 {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut injected = 0;

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let record = format_timestamp(&Local::now());
                match log.append(record.as_bytes()).await {
                    Ok(()) => {
                        injected += 1;
                        debug!(record = record.trim_end(), "timestamp appended");
                    }
                    Err(e) => warn!("failed to append timestamp: {e}"),
                }
            }
        }
    }

    injected
}
