//! Provider trait and the state shared by every provider kind

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::{Context, LOG_DIR_KEY, LOG_FILE_KEY, WORKING_DIR_KEY};
use crate::error::{Error, Result};
use crate::guard::RunGuard;
use crate::launcher::{LaunchSpec, Launcher, LogTarget, ProcessHandle};

/// Environment variables describing the job, exported to every child
pub const ENV_MIRROR_NAME: &str = "MIRROR_NAME";
pub const ENV_WORKING_DIR: &str = "MIRROR_WORKING_DIR";
pub const ENV_UPSTREAM_URL: &str = "MIRROR_UPSTREAM_URL";
pub const ENV_LOG_DIR: &str = "MIRROR_LOG_DIR";
pub const ENV_LOG_FILE: &str = "MIRROR_LOG_FILE";

/// Kind of sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Rsync,
    Command,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rsync" => Ok(ProviderKind::Rsync),
            "command" | "cmd" => Ok(ProviderKind::Command),
            _ => Err(Error::validation(format!("unknown provider '{}'", s))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Rsync => write!(f, "rsync"),
            ProviderKind::Command => write!(f, "command"),
        }
    }
}

/// Interface a scheduler uses to drive any kind of sync job.
///
/// `run` is `start` + `wait` + metric extraction. At most one run of a
/// provider is in flight at a time; a second `start` fails with
/// [`Error::AlreadyRunning`].
pub trait Provider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn kind(&self) -> ProviderKind;
    fn upstream(&self) -> &str;

    /// Size reported by the last completed run, empty if unknown
    fn data_size(&self) -> String;

    fn interval(&self) -> Duration;
    fn retry(&self) -> usize;
    fn working_dir(&self) -> PathBuf;
    fn log_dir(&self) -> PathBuf;
    fn log_file(&self) -> PathBuf;
    fn is_running(&self) -> bool;

    /// Full command line a run executes
    fn command(&self) -> Vec<String>;

    fn start(&self) -> Result<()>;
    fn wait(&self) -> Result<()>;
    fn run(&self) -> Result<()>;
}

/// Parameters for [`BaseProvider::new`]
#[derive(Debug, Clone)]
pub struct BaseSettings {
    pub name: String,
    pub working_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
    pub retry: usize,
}

/// Shared half of every provider: identity, paths, run guard, the live
/// process handle and the last data size.
#[derive(Debug)]
pub struct BaseProvider {
    name: String,
    ctx: Context,
    interval: Duration,
    guard: RunGuard,
    launcher: Arc<dyn Launcher>,
    process: Mutex<Option<Box<dyn ProcessHandle>>>,
    data_size: Mutex<String>,
}

impl BaseProvider {
    pub fn new(settings: BaseSettings, launcher: Arc<dyn Launcher>) -> Self {
        let mut ctx = Context::new();
        ctx.set(WORKING_DIR_KEY, settings.working_dir.display().to_string());
        ctx.set(LOG_DIR_KEY, settings.log_dir.display().to_string());
        ctx.set(LOG_FILE_KEY, settings.log_file.display().to_string());

        Self {
            name: settings.name,
            ctx,
            interval: settings.interval,
            guard: RunGuard::new(settings.retry),
            launcher,
            process: Mutex::new(None),
            data_size: Mutex::new(String::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retry(&self) -> usize {
        self.guard.retry()
    }

    pub fn working_dir(&self) -> PathBuf {
        self.ctx.get_path(WORKING_DIR_KEY)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.ctx.get_path(LOG_DIR_KEY)
    }

    pub fn log_file(&self) -> PathBuf {
        self.ctx.get_path(LOG_FILE_KEY)
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub fn data_size(&self) -> String {
        self.data_size
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_data_size(&self, size: String) {
        *self.data_size.lock().unwrap_or_else(PoisonError::into_inner) = size;
    }

    /// Variables every child gets, regardless of provider kind
    pub fn job_env(&self, upstream: &str) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(ENV_MIRROR_NAME.to_string(), self.name.clone());
        env.insert(ENV_WORKING_DIR.to_string(), self.working_dir().display().to_string());
        env.insert(ENV_UPSTREAM_URL.to_string(), upstream.to_string());
        env.insert(ENV_LOG_DIR.to_string(), self.log_dir().display().to_string());
        env.insert(ENV_LOG_FILE.to_string(), self.log_file().display().to_string());
        env
    }

    /// Launch `command` unless a run is already in flight.
    ///
    /// The guard's lock is held for the running check, log preparation and
    /// the launch itself; `running` is only set once the launch succeeded.
    pub fn start(&self, command: Vec<String>, env: BTreeMap<String, String>) -> Result<()> {
        let held = self.guard.lock();

        if self.guard.is_running() {
            return Err(Error::AlreadyRunning {
                name: self.name.clone(),
            });
        }

        let log = LogTarget::prepare(&self.log_file())?;
        let spec = LaunchSpec {
            command,
            working_dir: self.working_dir(),
            env,
            log,
        };
        tracing::debug!(provider = %self.name, program = spec.program(), command = ?spec.command, "Launching");

        let handle = self.launcher.launch(spec)?;
        let pid = handle.id();
        *self.process.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        self.guard.set_running(&held, true);

        tracing::info!(provider = %self.name, pid = ?pid, "Sync started");
        Ok(())
    }

    /// Block until the launched process exits, then return to idle.
    ///
    /// No lock is held while blocked.
    pub fn wait(&self) -> Result<()> {
        self.wait_then(|_| ())
    }

    /// Like [`BaseProvider::wait`], but runs `finish` on the outcome before
    /// the provider goes idle.
    fn wait_then(&self, finish: impl FnOnce(&Result<()>)) -> Result<()> {
        let handle = self
            .process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut handle) = handle else {
            return Err(Error::NotRunning {
                name: self.name.clone(),
            });
        };

        let result = handle.wait();
        finish(&result);

        let held = self.guard.lock();
        self.guard.set_running(&held, false);
        drop(held);

        match &result {
            Ok(()) => tracing::info!(provider = %self.name, "Sync finished"),
            Err(e) => tracing::warn!(provider = %self.name, error = %e, "Sync failed"),
        }
        result
    }

    /// Read the finished run's log and store what `extract` finds in it.
    ///
    /// An unreadable log leaves the data size empty.
    pub fn record_data_size(&self, extract: impl FnOnce(&[u8]) -> String) {
        let log_file = self.log_file();
        match std::fs::read(&log_file) {
            Ok(content) => self.set_data_size(extract(&content)),
            Err(e) => {
                tracing::debug!(provider = %self.name, path = %log_file.display(), error = %e, "Log not readable, data size unknown");
            }
        }
    }

    /// The run sequence shared by every provider kind
    pub fn run_with(
        &self,
        start: impl FnOnce() -> Result<()>,
        extract: impl FnOnce(&[u8]) -> String,
    ) -> Result<()> {
        self.set_data_size(String::new());
        start()?;
        self.wait_then(|result| {
            if result.is_ok() {
                self.record_data_size(extract);
            }
        })
    }
}

/// Helper for providers that want their logs under `log_dir`
pub fn default_log_file(log_dir: &Path) -> PathBuf {
    log_dir.join("latest.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::SystemLauncher;

    fn base(name: &str) -> BaseProvider {
        BaseProvider::new(
            BaseSettings {
                name: name.to_string(),
                working_dir: PathBuf::from("/srv/mirrors/debian"),
                log_dir: PathBuf::from("/var/log/mirrors/debian"),
                log_file: PathBuf::from("/var/log/mirrors/debian/latest.log"),
                interval: Duration::from_secs(60),
                retry: 2,
            },
            Arc::new(SystemLauncher),
        )
    }

    #[test]
    fn test_paths_are_published_in_context() {
        let base = base("debian");
        assert_eq!(base.ctx.get(WORKING_DIR_KEY), Some("/srv/mirrors/debian"));
        assert_eq!(base.working_dir(), PathBuf::from("/srv/mirrors/debian"));
        assert_eq!(base.log_dir(), PathBuf::from("/var/log/mirrors/debian"));
        assert_eq!(
            base.log_file(),
            PathBuf::from("/var/log/mirrors/debian/latest.log")
        );
    }

    #[test]
    fn test_wait_without_start() {
        let base = base("debian");
        let err = base.wait().unwrap_err();
        assert!(matches!(err, Error::NotRunning { .. }));
    }

    #[test]
    fn test_job_env_has_no_credentials() {
        let base = base("debian");
        let env = base.job_env("rsync://host/debian/");
        assert_eq!(env.get(ENV_MIRROR_NAME).map(String::as_str), Some("debian"));
        assert_eq!(
            env.get(ENV_UPSTREAM_URL).map(String::as_str),
            Some("rsync://host/debian/")
        );
        assert!(!env.contains_key("RSYNC_PASSWORD"));
        assert!(!env.contains_key("USER"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reads_log_before_going_idle() {
        let temp = tempfile::TempDir::new().unwrap();
        let base = BaseProvider::new(
            BaseSettings {
                name: "debian".to_string(),
                working_dir: temp.path().join("work"),
                log_dir: temp.path().join("logs"),
                log_file: temp.path().join("logs/latest.log"),
                interval: Duration::from_secs(60),
                retry: 2,
            },
            Arc::new(SystemLauncher),
        );
        let command = |script: &str| {
            vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
        };

        let mut overlapping = None;
        base.run_with(
            || base.start(command("echo 'Total file size: 5G bytes'"), BTreeMap::new()),
            |log| {
                assert!(base.is_running());
                overlapping = Some(base.start(command("true"), BTreeMap::new()));
                crate::log_size::extract_rsync_size(log)
            },
        )
        .unwrap();

        assert!(matches!(overlapping, Some(Err(Error::AlreadyRunning { .. }))));
        assert_eq!(base.data_size(), "5G");
        assert!(!base.is_running());
    }

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(ProviderKind::Rsync.to_string(), "rsync");
        assert_eq!(ProviderKind::Command.to_string(), "command");
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("RSYNC".parse::<ProviderKind>().unwrap(), ProviderKind::Rsync);
        assert_eq!("cmd".parse::<ProviderKind>().unwrap(), ProviderKind::Command);
        assert!("two-stage-rsync".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_log_file() {
        assert_eq!(
            default_log_file(Path::new("/var/log/mirrors/debian")),
            PathBuf::from("/var/log/mirrors/debian/latest.log")
        );
    }
}
