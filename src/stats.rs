//! Lock-free navigation statistics
//!
//! Atomic counters shared between workers without mutex contention.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Run-wide navigation counters
#[derive(Debug)]
pub struct NavStats {
    navigations: AtomicU64,
    errors: AtomicU64,
    start_time: AtomicU64,
}

impl NavStats {
    /// Create new stats anchored at the current time
    pub fn new() -> Self {
        Self {
            navigations: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            start_time: AtomicU64::new(now_secs()),
        }
    }

    /// Record a completed navigation
    pub fn record_navigation(&self) {
        self.navigations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed operation
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get completed navigation count
    pub fn navigation_count(&self) -> u64 {
        self.navigations.load(Ordering::Relaxed)
    }

    /// Get error count
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Navigations per minute since the stats were created
    pub fn navigations_per_minute(&self) -> f64 {
        let elapsed_mins = (now_secs().saturating_sub(self.start_time.load(Ordering::Relaxed))) as f64 / 60.0;
        if elapsed_mins < 0.001 {
            return 0.0;
        }
        self.navigations.load(Ordering::Relaxed) as f64 / elapsed_mins
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.navigations.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.start_time.store(now_secs(), Ordering::Relaxed);
    }

    /// Get snapshot for serialization
    pub fn snapshot(&self) -> NavStatsSnapshot {
        NavStatsSnapshot {
            navigations: self.navigations.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            navigations_per_minute: self.navigations_per_minute(),
        }
    }
}

impl Default for NavStats {
    fn default() -> Self {
        Self::new()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Serializable snapshot of run stats
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavStatsSnapshot {
    pub navigations: u64,
    pub errors: u64,
    pub navigations_per_minute: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = NavStats::new();
        assert_eq!(stats.navigation_count(), 0);
        assert_eq!(stats.error_count(), 0);
    }

    #[test]
    fn test_record_and_reset() {
        let stats = NavStats::new();
        for _ in 0..30 {
            stats.record_navigation();
        }
        stats.record_error();
        assert_eq!(stats.navigation_count(), 30);
        assert_eq!(stats.error_count(), 1);

        stats.reset();
        assert_eq!(stats.navigation_count(), 0);
        assert_eq!(stats.error_count(), 0);
    }

    #[test]
    fn test_snapshot_serde_camel_case() {
        let stats = NavStats::new();
        stats.record_navigation();
        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"navigations\":1"));
        assert!(json.contains("navigationsPerMinute"));
    }
}
