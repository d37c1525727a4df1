//! The PMF dashboard's data core: every entity the dashboard tracks, the reducer that
//! changes them, and the [`Dashboard`] that wires the store to local snapshots and
//! (optionally) a Supabase mirror.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pmf_core::{Action, Dashboard, DashboardConfig};
//!
//! let config = DashboardConfig::from_env()?;
//! let mut dashboard = Dashboard::open(&config)?;
//! dashboard.dispatch(Action::ResetState);
//! println!("{}", dashboard.leads_csv());
//! dashboard.close();
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod model;
mod reducer;
pub mod remote;
pub mod scoring;
pub mod seed;
pub mod state;

use std::sync::LazyLock;

pub use action::{Action, ActionError};
pub use config::{ConfigError, DashboardConfig};
pub use dashboard::Dashboard;
pub use state::PmfState;
pub use tether::Outcome;
pub use tether::snapshot::SnapshotError;
pub use tether::sync::{SyncOutcome, SyncStatus};

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
static LOGGER: LazyLock<()> = LazyLock::new(|| {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::info!("Logging initialized");
    }
});

/// Install the `env_logger` logger (filtered by `RUST_LOG`, `info` by default) unless one is already set.
pub fn init_logging() {
    LazyLock::force(&LOGGER);
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
