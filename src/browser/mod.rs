//! Browser automation module
//!
//! Owns the Chrome process for the run: the scratch profile directory, the
//! root session, the tab sessions derived from it, and the navigate-and-wait
//! page driver they all share.

mod driver;
mod errors;
mod scratch;
mod session;

pub use driver::{show_page, wait_visible, NavigationTask};
pub use errors::BrowserError;
pub use scratch::{ScratchDir, SCRATCH_PREFIX};
pub use session::{reset_tab_counter, ElementState, RootSession, SessionConfig, TabSession};
