//! Sync job providers for the mirror-sync worker
//!
//! A provider turns one mirror's configuration into an invocation of an
//! external transfer tool, makes sure only one run of that mirror is in
//! flight at a time, and reports the transferred data size once a run
//! completes.
//!
//! - [`RsyncProvider`] mirrors an rsync upstream
//! - [`CommandProvider`] runs an arbitrary sync command
//! - [`WorkerConfig`] loads mirrors from a TOML file

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod launcher;
pub mod log_size;
pub mod logging;
pub mod options;
pub mod provider;
pub mod rsync;
pub mod worker;

pub use command::{CommandConfig, CommandProvider};
pub use config::{Credentials, NetworkFamily, SyncConfig, SyncConfigBuilder};
pub use context::Context;
pub use error::{Error, Result};
pub use guard::RunGuard;
pub use launcher::{LaunchSpec, Launcher, LogTarget, ProcessHandle, SystemLauncher};
pub use log_size::extract_rsync_size;
pub use options::build_options;
pub use provider::{BaseProvider, Provider, ProviderKind};
pub use rsync::{RsyncProvider, describe_rsync_exit};
pub use worker::{GlobalConfig, MirrorConfig, WorkerConfig};
