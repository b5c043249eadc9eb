//! Worker pool
//!
//! Runs a fixed number of independent navigation loops, one tab session per
//! worker, all derived from a shared root session. Workers are intentionally
//! uncoordinated; the only synchronization is the completion barrier.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use tracing::{debug, error, info};

use crate::browser::{show_page, BrowserError, NavigationTask, RootSession, TabSession};
use crate::stats::NavStats;

/// Selector that marks a placeholder page as rendered.
pub const IMAGE_SELECTOR: &str = "img";

/// URL for the main window's navigation.
pub fn main_window_url() -> String {
    "https://via.placeholder.com/320x200/f00/fff?text=Main+Window".to_string()
}

/// URL for worker `w`'s iteration `i`.
///
/// Deterministically encodes both indices, so every (worker, iteration) pair
/// renders a distinct page.
pub fn worker_image_url(worker: usize, iteration: u32) -> String {
    // https://via.placeholder.com/320x200/00f/fff?text=Worker:1+Image:42
    format!("https://via.placeholder.com/320x200/00f/fff?text=Worker:{worker}+Image:{iteration}")
}

/// Uniformly random inter-iteration delay in `[0, max_delay_ms)`.
pub fn random_delay(max_delay_ms: u64) -> Duration {
    if max_delay_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_delay_ms))
}

/// Worker pool parameters
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    /// Number of concurrent worker tabs
    pub workers: usize,
    /// Navigations performed by each worker
    pub iterations: u32,
    /// Upper bound (exclusive) on the random inter-iteration delay
    pub max_delay_ms: u64,
    /// Deadline for each navigation + visibility wait, in seconds
    pub page_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            iterations: 10,
            max_delay_ms: 1000,
            page_timeout_secs: 60,
        }
    }
}

impl PoolConfig {
    /// Page timeout as a [`Duration`]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/// Outcome of a completed pool run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub workers: usize,
    pub navigations: u64,
}

/// Pool of concurrent worker tabs sharing one root session.
pub struct WorkerPool {
    config: PoolConfig,
    stats: Arc<NavStats>,
}

impl WorkerPool {
    /// Create a pool with the given parameters
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            stats: Arc::new(NavStats::new()),
        }
    }

    /// Shared navigation statistics for this pool
    pub fn stats(&self) -> Arc<NavStats> {
        self.stats.clone()
    }

    /// Derive one tab per worker, run every worker's loop to completion, and
    /// wait for all of them.
    ///
    /// Tab derivation failures abort immediately. Once the loops are running,
    /// the join is all-or-nothing: every worker is awaited, then the first
    /// worker error (if any) is returned. The caller decides fatality.
    pub async fn run(&self, root: &RootSession) -> Result<PoolSummary, BrowserError> {
        info!("spawning {} worker tabs", self.config.workers);

        let mut handles = Vec::with_capacity(self.config.workers);
        for worker in 0..self.config.workers {
            // Worker tabs derive only from a live, warmed-up root session.
            let tab = root.new_tab().await?;
            let config = self.config.clone();
            let stats = self.stats.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker, tab, config, stats).await
            }));
        }

        let results = join_all(handles).await;

        for (worker, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("worker {} failed: {}", worker, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("worker {} panicked: {}", worker, e);
                    return Err(BrowserError::PoolError(format!("worker {worker} panicked: {e}")));
                }
            }
        }

        Ok(PoolSummary {
            workers: self.config.workers,
            navigations: self.stats.navigation_count(),
        })
    }
}

/// One worker's navigation loop: iterate, show the page, sleep a random slice.
async fn worker_loop(
    worker: usize,
    tab: Arc<TabSession>,
    config: PoolConfig,
    stats: Arc<NavStats>,
) -> Result<(), BrowserError> {
    info!(
        "worker {} starting {} iterations on {}",
        worker,
        config.iterations,
        tab.id()
    );

    for iteration in 0..config.iterations {
        let task = NavigationTask::new(worker_image_url(worker, iteration), IMAGE_SELECTOR);

        if let Err(e) = show_page(&tab, &task, config.page_timeout()).await {
            stats.record_error();
            return Err(e);
        }
        stats.record_navigation();

        let delay = random_delay(config.max_delay_ms);
        debug!(
            "worker {} iteration {} done, sleeping {}ms",
            worker,
            iteration,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }

    debug!("worker {} done", worker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.iterations, 10);
        assert_eq!(config.max_delay_ms, 1000);
    }

    #[test]
    fn test_worker_image_url_encodes_both_indices() {
        let url = worker_image_url(1, 42);
        assert!(url.ends_with("text=Worker:1+Image:42"), "unexpected url: {url}");
    }

    #[test]
    fn test_worker_image_urls_distinct_per_pair() {
        let config = PoolConfig::default();
        let mut seen = HashSet::new();
        for w in 0..config.workers {
            for i in 0..config.iterations {
                assert!(seen.insert(worker_image_url(w, i)), "duplicate url for ({w}, {i})");
            }
        }
        assert_eq!(seen.len(), 30);
    }

    #[test]
    fn test_worker_image_url_parses_as_absolute_url() {
        let url = url::Url::parse(&worker_image_url(2, 7)).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("via.placeholder.com"));
        assert_eq!(url.query(), Some("text=Worker:2+Image:7"));
    }

    #[test]
    fn test_main_window_url_is_distinct_from_workers() {
        let main = main_window_url();
        for w in 0..3 {
            for i in 0..10 {
                assert_ne!(main, worker_image_url(w, i));
            }
        }
    }

    #[test]
    fn test_random_delay_within_bound() {
        for _ in 0..1000 {
            let delay = random_delay(1000);
            assert!(delay < Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_random_delay_zero_bound() {
        assert_eq!(random_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_random_delay_unit_bound_is_always_zero() {
        for _ in 0..100 {
            assert_eq!(random_delay(1), Duration::ZERO);
        }
    }

    #[test]
    fn test_pool_summary_serde_round_trip() {
        let summary = PoolSummary {
            workers: 3,
            navigations: 30,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: PoolSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workers, 3);
        assert_eq!(back.navigations, 30);
    }
}
