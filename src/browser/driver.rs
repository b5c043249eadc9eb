//! Page driver
//!
//! The one operation every tab performs: navigate to a URL, then block until a
//! target element is present and visible. The visibility wait always carries an
//! explicit deadline; there is no unbounded variant.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::session::{ElementState, TabSession};
use super::BrowserError;

/// Interval between visibility probes.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One unit of page-loading work: a target URL and the selector whose
/// visibility marks the load complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTask {
    pub url: String,
    pub selector: String,
}

impl NavigationTask {
    pub fn new(url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector: selector.into(),
        }
    }
}

/// Navigate the tab and wait until the task's selector is visible.
///
/// On success the page has fully navigated and the element is confirmed
/// visible. No retry is attempted here; errors surface to the caller.
pub async fn show_page(
    tab: &TabSession,
    task: &NavigationTask,
    timeout: Duration,
) -> Result<(), BrowserError> {
    tab.navigate(&task.url).await?;
    tab.wait_for_navigation(timeout).await?;
    wait_visible(tab, &task.selector, timeout).await
}

/// Poll the selector until it is visible or the deadline expires.
///
/// Expiry distinguishes a selector that never matched
/// ([`BrowserError::ElementNotFound`]) from one that matched but never became
/// visible ([`BrowserError::WaitTimeout`]).
pub async fn wait_visible(
    tab: &TabSession,
    selector: &str,
    timeout: Duration,
) -> Result<(), BrowserError> {
    let deadline = Instant::now() + timeout;
    let mut last;

    loop {
        last = tab.element_state(selector).await?;
        if last == ElementState::Visible {
            debug!("session {} element visible: {}", tab.id(), selector);
            tab.record_navigation();
            return Ok(());
        }
        if Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    tab.record_error();
    Err(match last {
        ElementState::Missing => BrowserError::ElementNotFound(format!(
            "{selector} (no match after {}ms)",
            timeout.as_millis()
        )),
        _ => BrowserError::WaitTimeout(format!(
            "element {selector} never became visible within {}ms",
            timeout.as_millis()
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_task_fields() {
        let task = NavigationTask::new("https://example.com/a", "img");
        assert_eq!(task.url, "https://example.com/a");
        assert_eq!(task.selector, "img");
    }

    #[test]
    fn test_navigation_task_equality() {
        let a = NavigationTask::new("https://example.com", "img");
        let b = NavigationTask::new("https://example.com", "img");
        let c = NavigationTask::new("https://example.com", "div");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
