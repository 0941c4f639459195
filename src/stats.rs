//! Download statistics types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Statistics for a single file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    /// Final size of the file in bytes.
    pub size: u64,
    /// Offset the transfer started at (non-zero for resumed files).
    pub resumed_from: u64,
    /// Bytes received in this transfer.
    pub transferred: u64,
    /// Time taken by the transfer.
    pub elapsed: Duration,
    /// Average transfer speed in bytes per second.
    pub average_speed: u64,
}

/// Statistics for one DAT file's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Files transferred (fresh or resumed).
    pub files_downloaded: usize,
    /// Of those, how many were resumed.
    pub files_resumed: usize,
    /// Files already complete on disk.
    pub files_skipped: usize,
    /// Total bytes transferred.
    pub total_bytes: u64,
    /// Total elapsed time for the run.
    pub elapsed: Duration,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    /// Creates empty session stats.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            files_downloaded: 0,
            files_resumed: 0,
            files_skipped: 0,
            total_bytes: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns the average transfer speed in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Tracks the bytes of one transfer while it runs.
pub struct DownloadStatsTracker {
    start_time: Instant,
    size: u64,
    resumed_from: u64,
    transferred: AtomicU64,
}

impl DownloadStatsTracker {
    /// Starts tracking a transfer of a `size`-byte file from `resumed_from`.
    #[must_use]
    pub fn new(size: u64, resumed_from: u64) -> Self {
        Self {
            start_time: Instant::now(),
            size,
            resumed_from,
            transferred: AtomicU64::new(0),
        }
    }

    /// Records received bytes and returns the running total.
    pub fn record_bytes(&self, bytes: u64) -> u64 {
        self.transferred.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    /// Bytes received so far.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    /// Time since tracking started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Snapshot of the finished transfer.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn finish(&self) -> FileStats {
        let elapsed = self.elapsed();
        let transferred = self.transferred();
        let secs = elapsed.as_secs_f64();
        let average_speed = if secs > 0.0 {
            (transferred as f64 / secs) as u64
        } else {
            0
        };
        FileStats {
            size: self.size,
            resumed_from: self.resumed_from,
            transferred,
            elapsed,
            average_speed,
        }
    }
}

/// Accumulates [`SessionStats`] over a run.
pub struct SessionStatsBuilder {
    stats: SessionStats,
    start_time: Instant,
}

impl Default for SessionStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStatsBuilder {
    /// Starts the session clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stats: SessionStats::new(),
            start_time: Instant::now(),
        }
    }

    /// Records a completed transfer.
    pub const fn add_download(&mut self, file: &FileStats) {
        self.stats.files_downloaded += 1;
        if file.resumed_from > 0 {
            self.stats.files_resumed += 1;
        }
        self.stats.total_bytes += file.transferred;
    }

    /// Records a file that was already complete.
    pub const fn add_skipped(&mut self) {
        self.stats.files_skipped += 1;
    }

    /// Finishes the session.
    #[must_use]
    pub fn build(mut self) -> SessionStats {
        self.stats.elapsed = self.start_time.elapsed();
        self.stats
    }
}
