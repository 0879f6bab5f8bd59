use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Throttled progress reporting for long-running passes over a key set
pub struct ProgressTracker {
    /// Name of the pass, e.g. "build_tree" or "cluster"
    stage: String,
    /// Number of items the pass will visit
    total: u64,
    /// Last update timestamp to throttle updates
    last_update: AtomicU64,
    /// Minimum interval between progress updates (in milliseconds)
    throttle_ms: u64,
}

impl ProgressTracker {
    /// Create a new progress tracker with default throttling (500ms)
    pub fn new(stage: impl Into<String>, total: usize) -> Self {
        Self::with_throttle(stage, total, 500)
    }

    /// Create a new progress tracker with custom throttling interval
    pub fn with_throttle(stage: impl Into<String>, total: usize, throttle_ms: u64) -> Self {
        Self {
            stage: stage.into(),
            total: total as u64,
            last_update: AtomicU64::new(0),
            throttle_ms,
        }
    }

    /// Check if we should allow a progress update based on throttling
    pub fn should_update(&self) -> bool {
        let now = now_millis();
        let last = self.last_update.load(Ordering::Relaxed);

        if now.saturating_sub(last) >= self.throttle_ms {
            self.last_update.store(now, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Percentage of the pass completed after `done` items
    pub fn percent(&self, done: usize) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((done as u64).min(self.total) * 100 / self.total) as u8
    }

    /// Report progress if throttling allows
    pub fn tick(&self, done: usize) {
        if self.should_update() {
            debug!(
                stage = %self.stage,
                done = %done,
                total = %self.total,
                progress_percent = %self.percent(done),
                "progress"
            );
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{millis}ms")
    } else if total_secs < 60 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{mins}m{secs}s")
    }
}
