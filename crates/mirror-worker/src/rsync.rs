//! rsync-based sync jobs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::log_size::extract_rsync_size;
use crate::options::build_options;
use crate::provider::{BaseProvider, BaseSettings, Provider, ProviderKind};

/// Environment variable carrying the rsync username
pub const ENV_USER: &str = "USER";
/// Environment variable rsync reads the daemon password from
pub const ENV_RSYNC_PASSWORD: &str = "RSYNC_PASSWORD";

/// Mirrors an rsync upstream into the job's working directory.
///
/// The option list is computed once in [`RsyncProvider::new`]. Credentials
/// are passed through the environment only, so they never show up in the
/// argument vector visible to `ps`.
#[derive(Debug)]
pub struct RsyncProvider {
    base: BaseProvider,
    config: SyncConfig,
    options: Vec<String>,
}

impl RsyncProvider {
    pub fn new(config: SyncConfig, launcher: Arc<dyn Launcher>) -> Self {
        let base = BaseProvider::new(
            BaseSettings {
                name: config.name().to_string(),
                working_dir: config.working_dir().to_path_buf(),
                log_dir: config.log_dir().to_path_buf(),
                log_file: config.log_file().to_path_buf(),
                interval: config.interval(),
                retry: config.retry(),
            },
            launcher,
        );
        let options = build_options(&config);

        Self {
            base,
            config,
            options,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Option list between the binary and the source URL
    pub fn options(&self) -> &[String] {
        &self.options
    }

    fn env(&self) -> BTreeMap<String, String> {
        let mut env = self.base.job_env(self.config.upstream_url());
        let credentials = self.config.credentials();
        if let Some(username) = &credentials.username {
            env.insert(ENV_USER.to_string(), username.clone());
        }
        if let Some(password) = &credentials.password {
            env.insert(ENV_RSYNC_PASSWORD.to_string(), password.clone());
        }
        env
    }
}

impl Provider for RsyncProvider {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Rsync
    }

    fn upstream(&self) -> &str {
        self.config.upstream_url()
    }

    fn data_size(&self) -> String {
        self.base.data_size()
    }

    fn interval(&self) -> Duration {
        self.base.interval()
    }

    fn retry(&self) -> usize {
        self.base.retry()
    }

    fn working_dir(&self) -> PathBuf {
        self.base.working_dir()
    }

    fn log_dir(&self) -> PathBuf {
        self.base.log_dir()
    }

    fn log_file(&self) -> PathBuf {
        self.base.log_file()
    }

    fn is_running(&self) -> bool {
        self.base.is_running()
    }

    /// `rsync <options...> <upstream> <working dir>`
    fn command(&self) -> Vec<String> {
        let mut command = Vec::with_capacity(self.options.len() + 3);
        command.push(self.config.rsync_cmd().to_string());
        command.extend(self.options.iter().cloned());
        command.push(self.config.upstream_url().to_string());
        command.push(self.working_dir().display().to_string());
        command
    }

    fn start(&self) -> Result<()> {
        self.base.start(self.command(), self.env())
    }

    fn wait(&self) -> Result<()> {
        self.base.wait()
    }

    fn run(&self) -> Result<()> {
        self.base.run_with(|| self.start(), extract_rsync_size)
    }
}

/// Meaning of an rsync exit code, as documented in rsync(1)
pub fn describe_rsync_exit(code: i32) -> Option<&'static str> {
    let description = match code {
        1 => "Syntax or usage error",
        2 => "Protocol incompatibility",
        3 => "Errors selecting input/output files, dirs",
        4 => "Requested action not supported",
        5 => "Error starting client-server protocol",
        6 => "Daemon unable to append to log-file",
        10 => "Error in socket I/O",
        11 => "Error in file I/O",
        12 => "Error in rsync protocol data stream",
        13 => "Errors with program diagnostics",
        14 => "Error in IPC code",
        20 => "Received SIGUSR1 or SIGINT",
        21 => "Some error returned by waitpid()",
        22 => "Error allocating core memory buffers",
        23 => "Partial transfer due to error",
        24 => "Partial transfer due to vanished source files",
        25 => "The --max-delete limit stopped deletions",
        30 => "Timeout in data send/receive",
        35 => "Timeout waiting for daemon connection",
        _ => return None,
    };
    Some(description)
}
