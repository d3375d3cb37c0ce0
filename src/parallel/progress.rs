//! Progress tracking for a resize run

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use serde::{Serialize, Serializer};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Thread-safe progress tracker shared by the scanner and the workers.
///
/// Counters only ever grow during a run; `start` resets them.
pub struct ProgressTracker {
    sender: broadcast::Sender<ProgressUpdate>,
    queued: AtomicU64,
    skipped: AtomicU64,
    resized: AtomicU64,
    failed: AtomicU64,
}

/// Progress update event
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started {
        workers: usize,
    },
    /// Decoded by the scanner and handed to the workers
    ImageQueued {
        name: PathBuf,
    },
    /// Rejected by the scanner (unreadable, corrupt or unsupported)
    ImageSkipped {
        path: PathBuf,
        reason: String,
    },
    ImageResized {
        name: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    ImageFailed {
        name: PathBuf,
        error: String,
    },
    Finished {
        stats: RunStats,
    },
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);

        Self {
            sender,
            queued: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            resized: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Reset counters and announce a new run
    pub fn start(&self, workers: usize) {
        self.queued.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.resized.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);

        // No subscribers is fine
        let _ = self.sender.send(ProgressUpdate::Started { workers });

        info!("Started resize run with {} workers", workers);
    }

    pub fn record_queued(&self, name: PathBuf) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        debug!("Queued image: {:?}", name);
        let _ = self.sender.send(ProgressUpdate::ImageQueued { name });
    }

    pub fn record_skipped(&self, path: PathBuf, reason: String) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        warn!("Skipping {:?}: {}", path, reason);
        let _ = self.sender.send(ProgressUpdate::ImageSkipped { path, reason });
    }

    /// Count one successful encode+write
    pub fn record_resized(&self, name: PathBuf, output: PathBuf, width: u32, height: u32) {
        self.resized.fetch_add(1, Ordering::Relaxed);
        let _ = self.sender.send(ProgressUpdate::ImageResized {
            name,
            output,
            width,
            height,
        });
    }

    pub fn record_failed(&self, name: PathBuf, error: String) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        warn!("Failed to resize {:?}: {}", name, error);
        let _ = self.sender.send(ProgressUpdate::ImageFailed { name, error });
    }

    /// Number of images resized and written so far
    pub fn resized(&self) -> u64 {
        self.resized.load(Ordering::Relaxed)
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    /// Current counters as run statistics
    pub fn snapshot(&self, outcome: RunOutcome, elapsed: Duration) -> RunStats {
        RunStats {
            resized: self.resized.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            outcome,
            elapsed,
        }
    }

    /// Announce the end of a run
    pub fn finish(&self, stats: &RunStats) {
        info!(
            "Resize run {}: {} resized, {} skipped, {} failed in {:.2}s",
            stats.outcome,
            stats.resized,
            stats.skipped,
            stats.failed,
            stats.elapsed.as_secs_f64()
        );

        let _ = self.sender.send(ProgressUpdate::Finished {
            stats: stats.clone(),
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// The input tree was fully drained
    Completed,
    /// The cancellation token fired before the drain finished
    Cancelled,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final statistics of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    /// Images resized and written; exactly the number of successful writes
    pub resized: u64,
    pub skipped: u64,
    pub failed: u64,
    pub queued: u64,
    pub outcome: RunOutcome,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunStats {
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.resized as f64 / secs
        } else {
            0.0
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    /// Get processing speed as human-readable string
    pub fn speed_text(&self) -> String {
        let rate = self.files_per_second();
        if rate >= 1.0 {
            format!("{:.1} files/sec", rate)
        } else if rate > 0.0 {
            format!("{:.1} sec/file", 1.0 / rate)
        } else {
            "Unknown".to_string()
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
