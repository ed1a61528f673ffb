//! Worker configuration file
//!
//! A worker file has a `[global]` section with defaults and one
//! `[[mirrors]]` entry per job:
//!
//! ```toml
//! [global]
//! mirror_dir = "/srv/mirrors"
//! log_dir = "/var/log/mirrors"
//! interval = 120
//!
//! [[mirrors]]
//! name = "debian"
//! upstream = "rsync://ftp.debian.org/debian/"
//! rsync_options = ["--bwlimit=1000"]
//! ```
//!
//! Each mirror works in `<mirror_dir>/<name>` and logs to
//! `<log_dir>/<name>/latest.log`. Without a log directory output is
//! discarded.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::{CommandConfig, CommandProvider};
use crate::config::{DISCARD_LOG, NetworkFamily, SyncConfig};
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::provider::{Provider, ProviderKind, default_log_file};
use crate::rsync::RsyncProvider;

/// Defaults applied to every mirror
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Parent of every mirror's working directory
    #[serde(default)]
    pub mirror_dir: Option<PathBuf>,
    /// Parent of every mirror's log directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Sync interval in minutes
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub retry: Option<usize>,
}

/// One `[[mirrors]]` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub name: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub upstream: String,
    /// rsync: tool binary. command: the command line, split like a shell would.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub exclude_file: Option<PathBuf>,
    #[serde(default)]
    pub rsync_options: Vec<String>,
    #[serde(default)]
    pub use_ipv4: bool,
    #[serde(default)]
    pub use_ipv6: bool,
    /// Sync interval in minutes, overrides the global one
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub retry: Option<usize>,
    #[serde(default)]
    pub mirror_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// command provider only
    #[serde(default)]
    pub size_pattern: Option<String>,
    /// command provider only
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_provider() -> String {
    ProviderKind::Rsync.to_string()
}

/// Paths and schedule of a mirror after applying globals
#[derive(Debug, Clone, PartialEq)]
struct ResolvedPaths {
    working_dir: PathBuf,
    log_dir: PathBuf,
    log_file: PathBuf,
    interval: Option<Duration>,
    retry: usize,
}

impl MirrorConfig {
    pub fn kind(&self) -> Result<ProviderKind> {
        self.provider.parse()
    }

    fn resolve(&self, global: &GlobalConfig) -> Result<ResolvedPaths> {
        let mirror_dir = self
            .mirror_dir
            .as_ref()
            .or(global.mirror_dir.as_ref())
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));

        let (log_dir, log_file) = match self.log_dir.as_ref().or(global.log_dir.as_ref()) {
            Some(root) => {
                let dir = root.join(&self.name);
                let file = default_log_file(&dir);
                (dir, file)
            }
            None => (PathBuf::from("."), PathBuf::from(DISCARD_LOG)),
        };

        let interval = match self.interval.or(global.interval) {
            Some(minutes) => {
                let secs = minutes.checked_mul(60).ok_or_else(|| {
                    Error::validation(format!(
                        "mirror '{}': interval of {} minutes is too large",
                        self.name, minutes
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(ResolvedPaths {
            working_dir: mirror_dir.join(&self.name),
            log_dir,
            log_file,
            interval,
            retry: self.retry.or(global.retry).unwrap_or(0),
        })
    }

    /// Parse the `command` string with shell quoting rules
    fn command_line(&self) -> Result<Vec<String>> {
        let Some(line) = self.command.as_deref() else {
            return Ok(Vec::new());
        };
        shlex::split(line).ok_or_else(|| {
            Error::validation(format!(
                "mirror '{}': unbalanced quotes in command '{}'",
                self.name, line
            ))
        })
    }

    /// Build the [`SyncConfig`] of an rsync mirror
    pub fn sync_config(&self, global: &GlobalConfig) -> Result<SyncConfig> {
        let paths = self.resolve(global)?;

        let mut builder = SyncConfig::builder(&self.name, &self.upstream)
            .extra_options(self.rsync_options.iter().cloned())
            .working_dir(paths.working_dir)
            .log_dir(paths.log_dir)
            .log_file(paths.log_file)
            .network(NetworkFamily::from_flags(self.use_ipv4, self.use_ipv6))
            .retry(paths.retry);

        if let Some(cmd) = &self.command {
            builder = builder.rsync_cmd(cmd);
        }
        if let Some(username) = &self.username {
            builder = builder.username(username);
        }
        if let Some(password) = &self.password {
            builder = builder.password(password);
        }
        if let Some(exclude_file) = &self.exclude_file {
            builder = builder.exclude_file(exclude_file);
        }
        if let Some(interval) = paths.interval {
            builder = builder.interval(interval);
        }

        builder.build()
    }

    /// Build the [`CommandConfig`] of a command mirror
    pub fn command_config(&self, global: &GlobalConfig) -> Result<CommandConfig> {
        let paths = self.resolve(global)?;
        Ok(CommandConfig {
            name: self.name.clone(),
            command: self.command_line()?,
            upstream: self.upstream.clone(),
            env: self.env.clone(),
            size_pattern: self.size_pattern.clone(),
            working_dir: Some(paths.working_dir),
            log_dir: Some(paths.log_dir),
            log_file: Some(paths.log_file),
            interval: paths.interval,
            retry: paths.retry,
        })
    }

    /// Construct the provider for this mirror
    pub fn build(&self, global: &GlobalConfig, launcher: Arc<dyn Launcher>) -> Result<Box<dyn Provider>> {
        match self.kind()? {
            ProviderKind::Rsync => Ok(Box::new(RsyncProvider::new(
                self.sync_config(global)?,
                launcher,
            ))),
            ProviderKind::Command => Ok(Box::new(CommandProvider::new(
                self.command_config(global)?,
                launcher,
            )?)),
        }
    }
}

/// Parsed worker configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub mirrors: Vec<MirrorConfig>,
}

impl WorkerConfig {
    /// Load and validate a worker file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Parse and validate worker TOML; `path` is only used in errors
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: WorkerConfig = toml::from_str(content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), mirrors = config.mirrors.len(), "Loaded worker config");
        Ok(config)
    }

    /// Names must be unique plain directory names, providers known
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for mirror in &self.mirrors {
            if mirror.name.is_empty() {
                return Err(Error::validation("mirror with an empty name"));
            }
            if !is_plain_name(&mirror.name) {
                return Err(Error::validation(format!(
                    "mirror name '{}' must be a single directory name",
                    mirror.name
                )));
            }
            if !seen.insert(mirror.name.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate mirror name '{}'",
                    mirror.name
                )));
            }
            mirror.kind()?;
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&MirrorConfig> {
        self.mirrors.iter().find(|m| m.name == name)
    }

    /// Build one provider per mirror, in file order
    pub fn providers(&self, launcher: Arc<dyn Launcher>) -> Result<Vec<Box<dyn Provider>>> {
        self.mirrors
            .iter()
            .map(|m| m.build(&self.global, Arc::clone(&launcher)))
            .collect()
    }

    /// Build the provider of the mirror called `name`
    pub fn provider(&self, name: &str, launcher: Arc<dyn Launcher>) -> Result<Box<dyn Provider>> {
        let mirror = self
            .find(name)
            .ok_or_else(|| Error::validation(format!("no mirror named '{}'", name)))?;
        mirror.build(&self.global, launcher)
    }
}

/// A name joined onto a directory must stay inside it
fn is_plain_name(name: &str) -> bool {
    !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && !Path::new(name).is_absolute()
}
