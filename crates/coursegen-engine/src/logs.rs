//! Append-only execution log stream with full replay.
//!
//! Every repair run owns one [`RunLog`]. Records are appended in total order
//! and never mutated afterwards; any number of [`LogReader`]s can subscribe,
//! and each subscription replays the full history from the beginning before
//! following the live tail. Once the log is closed (the run reached a
//! terminal state) readers drain the remaining records and then see the end
//! of the stream.

use chrono::{DateTime, Utc};
use coursegen_phase_api::LogSink;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Error,
}

/// One record of a run's execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Position in the run's total order, starting at 0.
    pub seq: u64,
    /// RFC3339 UTC timestamp of the append.
    pub at: DateTime<Utc>,
    /// Record severity.
    pub level: LogLevel,
    /// Record text. Executor lines are carried verbatim.
    pub message: String,
}

/// Append-only log owned by one repair run.
#[derive(Debug, Default)]
pub struct RunLog {
    records: Mutex<Vec<LogRecord>>,
    notify: Notify,
    closed: AtomicBool,
}

impl RunLog {
    /// Create an empty, open log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record with the given severity.
    ///
    /// Appends after [`close`](Self::close) are dropped: the stream is
    /// finite once the run is terminal, even if a detached executor is
    /// still holding the sink.
    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        {
            let mut records = self.records.lock().expect("run log mutex");
            let seq = records.len() as u64;
            records.push(LogRecord {
                seq,
                at: Utc::now(),
                level,
                message: message.into(),
            });
        }
        self.notify.notify_waiters();
    }

    /// Close the log: no further appends are expected and readers terminate
    /// after draining.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether the log has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("run log mutex").len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the full history at this instant.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.lock().expect("run log mutex").clone()
    }

    fn record_at(&self, index: usize) -> Option<LogRecord> {
        self.records.lock().expect("run log mutex").get(index).cloned()
    }

    /// Subscribe a reader that replays from the beginning.
    #[must_use]
    pub fn reader(self: &Arc<Self>) -> LogReader {
        LogReader {
            log: Arc::clone(self),
            next: 0,
        }
    }
}

impl LogSink for RunLog {
    fn append(&self, line: &str) {
        self.push(LogLevel::Info, line);
    }
}

/// Incremental reader over one run's log.
///
/// Each reader starts at record 0 regardless of when it subscribed.
#[derive(Debug)]
pub struct LogReader {
    log: Arc<RunLog>,
    next: usize,
}

impl LogReader {
    /// Next record in total order.
    ///
    /// Suspends while the log is open and no further record exists yet;
    /// returns `None` once the log is closed and fully drained.
    pub async fn next(&mut self) -> Option<LogRecord> {
        loop {
            // Register for wakeups before checking state so an append
            // between the check and the await cannot be lost.
            let notified = self.log.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(record) = self.log.record_at(self.next) {
                self.next += 1;
                return Some(record);
            }
            if self.log.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Drain every remaining record, returning once the stream ends.
    pub async fn collect_remaining(&mut self) -> Vec<LogRecord> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record);
        }
        records
    }
}
