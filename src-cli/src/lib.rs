//! SimpleChat - terminal application
//!
//! The terminal is the page. Following a redirect unloads the page, hands the
//! provider's response to the identity client and loads a fresh page.

mod commands;
mod shell;
mod state;

use anyhow::Context;
use simplechat_core::Config;

use shell::Shell;
use state::AppState;

pub async fn run() -> anyhow::Result<()> {
    // Logs go to stderr, below warnings only unless RUST_LOG says otherwise
    simplechat_core::init_logging("warn");

    let config = Config::from_env();
    let state = AppState::new(config).context("failed to open the credential cache")?;

    tracing::info!("SimpleChat started");

    Shell::new(state).run().await
}
