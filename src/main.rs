//! manytabs - multi-tab browser automation demo
//!
//! Opens one main tab plus a fixed pool of worker tabs in a single Chrome
//! process, navigates each through a sequence of placeholder-image pages, and
//! waits for every worker to finish. Any failure is fatal: it is logged here
//! and mapped to a non-zero exit code.

use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};

use manytabs::browser::{show_page, NavigationTask, RootSession, ScratchDir, SessionConfig};
use manytabs::pool::{main_window_url, PoolConfig, WorkerPool, IMAGE_SELECTOR};

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = manytabs::init_logging();

    // Single fatality decision point: every stage below reports a typed
    // result, only here does an error end the process. Returning an ExitCode
    // (instead of process::exit) lets the scratch guard drop first.
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let scratch = ScratchDir::new().context("allocating scratch profile dir")?;
    info!("Using temp {} for chrome's user-data-dir", scratch.path().display());

    let config = SessionConfig::default()
        .headless(false)
        .user_data_dir(scratch.path());
    let page_timeout = config.page_timeout();

    let root = RootSession::launch(config).await?;

    // Main window navigates first; workers derive only after this succeeds.
    let main_task = NavigationTask::new(main_window_url(), IMAGE_SELECTOR);
    let main_result = show_page(root.root_tab(), &main_task, page_timeout).await;

    let pool_result = match main_result {
        Ok(()) => {
            let pool = WorkerPool::new(PoolConfig::default());
            pool.run(&root).await
        }
        Err(e) => Err(e),
    };

    // Close the browser before the scratch guard drops, whatever the outcome.
    root.close().await?;

    let summary = pool_result?;
    info!("Done waiting for {} workers", summary.workers);

    Ok(())
}
