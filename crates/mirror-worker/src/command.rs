//! Sync jobs driven by an arbitrary user command

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::config::{DEFAULT_INTERVAL, DEFAULT_MAX_RETRY, DISCARD_LOG};
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::log_size::extract_size;
use crate::provider::{BaseProvider, BaseSettings, Provider, ProviderKind};

/// Settings for a [`CommandProvider`]
#[derive(Debug, Clone, Default)]
pub struct CommandConfig {
    pub name: String,
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Informational upstream, exported to the command as `MIRROR_UPSTREAM_URL`
    pub upstream: String,
    pub env: BTreeMap<String, String>,
    /// Regex whose first capture group is the data size
    pub size_pattern: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub interval: Option<Duration>,
    pub retry: usize,
}

/// Runs a user-supplied command, e.g. a mirror-specific sync script.
#[derive(Debug)]
pub struct CommandProvider {
    base: BaseProvider,
    command: Vec<String>,
    upstream: String,
    env: BTreeMap<String, String>,
    size_pattern: Option<Regex>,
}

impl CommandProvider {
    pub fn new(config: CommandConfig, launcher: Arc<dyn Launcher>) -> Result<Self> {
        if config.command.is_empty() {
            return Err(Error::validation(format!(
                "command provider '{}' has an empty command",
                config.name
            )));
        }

        let size_pattern = config
            .size_pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::validation(format!("invalid size_pattern: {}", e)))?;

        let base = BaseProvider::new(
            BaseSettings {
                name: config.name,
                working_dir: config.working_dir.unwrap_or_else(|| PathBuf::from(".")),
                log_dir: config.log_dir.unwrap_or_else(|| PathBuf::from(".")),
                log_file: config.log_file.unwrap_or_else(|| PathBuf::from(DISCARD_LOG)),
                interval: config.interval.unwrap_or(DEFAULT_INTERVAL),
                retry: if config.retry == 0 {
                    DEFAULT_MAX_RETRY
                } else {
                    config.retry
                },
            },
            launcher,
        );

        Ok(Self {
            base,
            command: config.command,
            upstream: config.upstream,
            env: config.env,
            size_pattern,
        })
    }

    fn env(&self) -> BTreeMap<String, String> {
        let mut env = self.base.job_env(&self.upstream);
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

impl Provider for CommandProvider {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Command
    }

    fn upstream(&self) -> &str {
        &self.upstream
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

    fn command(&self) -> Vec<String> {
        self.command.clone()
    }

    fn start(&self) -> Result<()> {
        self.base.start(self.command(), self.env())
    }

    fn wait(&self) -> Result<()> {
        self.base.wait()
    }

    fn run(&self) -> Result<()> {
        self.base.run_with(
            || self.start(),
            |log| match &self.size_pattern {
                Some(pattern) => extract_size(log, pattern),
                None => String::new(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::SystemLauncher;

    fn config(command: &[&str]) -> CommandConfig {
        CommandConfig {
            name: "script".to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
            upstream: "https://example.org/pub/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = CommandProvider::new(config(&[]), Arc::new(SystemLauncher)).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_bad_size_pattern_is_rejected() {
        let mut cfg = config(&["/bin/true"]);
        cfg.size_pattern = Some("(unclosed".to_string());
        let err = CommandProvider::new(cfg, Arc::new(SystemLauncher)).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_defaults() {
        let p = CommandProvider::new(config(&["/bin/true"]), Arc::new(SystemLauncher)).unwrap();
        assert_eq!(p.kind(), ProviderKind::Command);
        assert_eq!(p.retry(), DEFAULT_MAX_RETRY);
        assert_eq!(p.interval(), DEFAULT_INTERVAL);
        assert_eq!(p.log_file(), PathBuf::from(DISCARD_LOG));
        assert_eq!(p.command(), vec!["/bin/true".to_string()]);
    }

    #[test]
    fn test_env_overrides_job_env() {
        let mut cfg = config(&["/bin/true"]);
        cfg.env.insert("MIRROR_NAME".to_string(), "custom".to_string());
        cfg.env.insert("TOKEN".to_string(), "abc".to_string());
        let p = CommandProvider::new(cfg, Arc::new(SystemLauncher)).unwrap();
        let env = p.env();
        assert_eq!(env.get("MIRROR_NAME").map(String::as_str), Some("custom"));
        assert_eq!(env.get("TOKEN").map(String::as_str), Some("abc"));
    }
}
