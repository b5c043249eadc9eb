//! Browser session management
//!
//! Launches one Chrome/Chromium process and hands out tab sessions derived from
//! it. The root session owns the browser handle and every derived tab; closing
//! the root closes the children first, then the process.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::BrowserError;

/// Global counter for sequential tab naming (Tab-1, Tab-2, ...)
static TAB_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Reset the tab counter back to 1 (call when the root session is closed)
pub fn reset_tab_counter() {
    TAB_COUNTER.store(1, Ordering::Relaxed);
}

/// Find Chrome/Chromium executable on the system
fn find_chrome() -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        vec![
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/google-chrome-stable"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Launch options for the root browser session
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<String>,
    /// Run in headless mode
    pub headless: bool,
    /// User data directory (the scratch profile dir)
    pub user_data_dir: Option<PathBuf>,
    /// Deadline for page navigation and visibility waits, in seconds
    pub page_timeout_secs: u64,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
    /// Additional browser flags, passed through verbatim
    pub extra_args: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            user_data_dir: None,
            page_timeout_secs: 60,
            window_width: 1280,
            window_height: 800,
            extra_args: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the user data directory
    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    /// Set Chrome path
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.chrome_path = path;
        self
    }

    /// Set the page timeout
    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.page_timeout_secs = secs;
        self
    }

    /// Append an extra browser flag
    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Page timeout as a [`Duration`]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/// Result of probing a selector on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// No element matches the selector
    Missing,
    /// An element matches but is not rendered visible
    Hidden,
    /// An element matches and is visible
    Visible,
}

/// A single browser tab under automation.
///
/// Derived from a [`RootSession`]; independent navigation state, shared
/// browser process.
pub struct TabSession {
    /// Display name (Main, Tab-1, Tab-2, ...)
    id: String,
    /// The underlying CDP page
    page: Page,
    /// Shared liveness flag, cleared when Chrome disconnects
    alive: Arc<AtomicBool>,
    /// Completed navigations on this tab
    navigations: AtomicU64,
    /// Failed operations on this tab
    errors: AtomicU64,
}

impl TabSession {
    fn new(page: Page, alive: Arc<AtomicBool>) -> Self {
        let id = format!("Tab-{}", TAB_COUNTER.fetch_add(1, Ordering::Relaxed));
        Self::adopt(id, page, alive)
    }

    fn adopt(id: impl Into<String>, page: Page, alive: Arc<AtomicBool>) -> Self {
        Self {
            id: id.into(),
            page,
            alive,
            navigations: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Get session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Check if the underlying browser connection is still up
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Get completed navigation count
    pub fn navigation_count(&self) -> u64 {
        self.navigations.load(Ordering::Relaxed)
    }

    /// Get error count
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub(crate) fn record_navigation(&self) {
        self.navigations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// No-op round-trip forcing the tab to materialize before real work begins.
    pub(crate) async fn warm_up(&self) -> Result<(), BrowserError> {
        self.page
            .url()
            .await
            .map_err(|e| BrowserError::ConnectionLost(e.to_string()))?;
        debug!("session {} warmed up", self.id);
        Ok(())
    }

    /// Navigate the tab to a URL
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        if !self.is_alive() {
            return Err(BrowserError::ConnectionLost("chrome disconnected".into()));
        }

        debug!("session {} navigating to: {}", self.id, url);
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    /// Wait for the current navigation to settle
    pub async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), BrowserError> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| BrowserError::WaitTimeout("navigation".into()))?
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    /// Probe whether the selector currently matches a visible element.
    pub async fn element_state(&self, selector: &str) -> Result<ElementState, BrowserError> {
        if !self.is_alive() {
            return Err(BrowserError::ConnectionLost("chrome disconnected".into()));
        }

        let sel = serde_json::to_string(selector)
            .map_err(|e| BrowserError::ScriptFailed(e.to_string()))?;
        let expr = format!(
            "(() => {{ \
                const el = document.querySelector({sel}); \
                if (!el) return 'missing'; \
                const style = window.getComputedStyle(el); \
                const visible = style.display !== 'none' \
                    && style.visibility !== 'hidden' \
                    && el.getClientRects().length > 0; \
                return visible ? 'visible' : 'hidden'; \
            }})()"
        );

        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| BrowserError::ScriptFailed(e.to_string()))?;

        Ok(match result.value().and_then(|v| v.as_str()) {
            Some("visible") => ElementState::Visible,
            Some("hidden") => ElementState::Hidden,
            _ => ElementState::Missing,
        })
    }

    /// Close the tab. Errors are ignored; the browser teardown catches stragglers.
    pub async fn close(&self) {
        let _ = self.page.clone().close().await;
        debug!("session {} closed", self.id);
    }
}

/// The root browser session.
///
/// Owns the Chrome process, the CDP event-handler task, the adopted first tab,
/// and every tab derived via [`RootSession::new_tab`].
pub struct RootSession {
    /// The browser instance
    browser: RwLock<Option<Browser>>,
    /// The browser's first tab, adopted at launch
    root_tab: Arc<TabSession>,
    /// Tabs derived from this session, closed before the browser on shutdown
    tabs: RwLock<Vec<Arc<TabSession>>>,
    /// Cleared when the CDP event handler ends (Chrome gone)
    alive: Arc<AtomicBool>,
}

impl RootSession {
    /// Launch the browser and return a live root session.
    ///
    /// The first tab is adopted and warmed up before this returns, so callers
    /// can rely on the browser process actually being up.
    pub async fn launch(config: SessionConfig) -> Result<Self, BrowserError> {
        info!("launching root session (headless: {})", config.headless);

        if config.chrome_path.is_none() && find_chrome().is_none() {
            return Err(BrowserError::LaunchFailed(
                "Chrome/Chromium not found; install Chrome or set chrome_path".to_string(),
            ));
        }

        let mut builder = BrowserConfig::builder();

        if config.headless {
            // Modern Chrome requires --headless=new for proper headless
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        } else if let Some(chrome_path) = find_chrome() {
            info!("auto-detected Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        if let Some(ref dir) = config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        builder = builder
            .window_size(config.window_width, config.window_height)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            // Required when running as root (e.g., in Docker or on a VPS)
            .no_sandbox()
            .args(config.extra_args.clone());

        let browser_config = builder
            .build()
            .map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Drain CDP events in the background; when the handler ends, Chrome has
        // disconnected.
        let alive = Arc::new(AtomicBool::new(true));
        let alive_for_handler = alive.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser event error: {e}");
                }
            }
            warn!("chrome disconnected (event handler ended)");
            alive_for_handler.store(false, Ordering::Relaxed);
        });

        // Chrome opens with one blank tab; adopt it as the root tab and drop
        // any surplus.
        let page = {
            let mut pages = browser
                .pages()
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

            let main_page = if !pages.is_empty() {
                pages.remove(0)
            } else {
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
            };

            for extra_page in pages {
                debug!("closing surplus blank tab");
                let _ = extra_page.close().await;
            }

            main_page
        };

        let root_tab = Arc::new(TabSession::adopt("Main", page, alive.clone()));
        root_tab.warm_up().await?;

        info!("root session live");

        Ok(Self {
            browser: RwLock::new(Some(browser)),
            root_tab,
            tabs: RwLock::new(Vec::new()),
            alive,
        })
    }

    /// The tab adopted at launch.
    pub fn root_tab(&self) -> &Arc<TabSession> {
        &self.root_tab
    }

    /// Check if the browser connection is still up
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Number of tabs derived from this session so far
    pub async fn tab_count(&self) -> usize {
        self.tabs.read().await.len()
    }

    /// Derive a new tab session, warmed up and ready for navigation.
    pub async fn new_tab(&self) -> Result<Arc<TabSession>, BrowserError> {
        if !self.is_alive() {
            return Err(BrowserError::ConnectionLost("chrome disconnected".into()));
        }

        let page = {
            let browser = self.browser.read().await;
            let browser = browser
                .as_ref()
                .ok_or_else(|| BrowserError::ConnectionLost("browser already closed".into()))?;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
        };

        let tab = Arc::new(TabSession::new(page, self.alive.clone()));
        tab.warm_up().await?;

        info!("tab session {} created", tab.id());
        self.tabs.write().await.push(tab.clone());

        Ok(tab)
    }

    /// Close every derived tab, then the browser process.
    pub async fn close(&self) -> Result<(), BrowserError> {
        self.alive.store(false, Ordering::Relaxed);

        // 1. Children first: they must stop issuing operations before the
        //    browser goes away.
        let tabs: Vec<Arc<TabSession>> = self.tabs.write().await.drain(..).collect();
        for tab in tabs {
            tab.close().await;
        }
        self.root_tab.close().await;

        // 2. Browser: graceful close, brief grace period for child processes,
        //    then force kill.
        {
            let mut browser = self.browser.write().await;
            if let Some(mut b) = browser.take() {
                let _ = b.close().await;
                tokio::time::sleep(Duration::from_millis(500)).await;
                let _ = b.kill().await;
            }
        }

        reset_tab_counter();
        info!("root session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert!(!config.headless);
        assert!(config.chrome_path.is_none());
        assert!(config.user_data_dir.is_none());
        assert_eq!(config.page_timeout_secs, 60);
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn test_session_config_builders() {
        let config = SessionConfig::default()
            .headless(true)
            .user_data_dir("/tmp/profile")
            .page_timeout_secs(5)
            .extra_arg("--disable-gpu");
        assert!(config.headless);
        assert_eq!(config.user_data_dir, Some(PathBuf::from("/tmp/profile")));
        assert_eq!(config.page_timeout(), Duration::from_secs(5));
        assert_eq!(config.extra_args, vec!["--disable-gpu".to_string()]);
    }

    #[test]
    fn test_session_config_serde_camel_case() {
        let json = serde_json::to_string(&SessionConfig::default()).unwrap();
        assert!(json.contains("pageTimeoutSecs"));
        assert!(json.contains("userDataDir"));
    }
}
