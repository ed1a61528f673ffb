//! Command implementations

pub mod list;
pub mod run;
pub mod show;

use std::path::Path;
use std::sync::Arc;

use mirror_worker::{Launcher, SystemLauncher, WorkerConfig};

use crate::error::Result;

pub use list::run_list;
pub use run::run_sync;
pub use show::run_show_command;

fn load(config_path: &Path) -> Result<WorkerConfig> {
    Ok(WorkerConfig::load(config_path)?)
}

fn launcher() -> Arc<dyn Launcher> {
    Arc::new(SystemLauncher::new())
}
