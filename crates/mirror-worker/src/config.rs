//! Sync job configuration
//!
//! [`SyncConfig`] is the validated, immutable description of one rsync
//! mirror. It is produced by [`SyncConfigBuilder::build`], which is the only
//! place upstream URLs are checked and defaults are filled in.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Retry count used when a job does not configure one
pub const DEFAULT_MAX_RETRY: usize = 2;

/// Tool binary used when a job does not configure one
pub const DEFAULT_RSYNC_CMD: &str = "rsync";

/// Log file path that means "discard output"
pub const DISCARD_LOG: &str = "/dev/null";

/// Interval used when neither the job nor the global section sets one
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120 * 60);

/// IP family the transfer tool should be forced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    /// Let the tool decide
    #[default]
    Auto,
    /// Force IPv4 (`-4`)
    Ipv4,
    /// Force IPv6 (`-6`)
    Ipv6,
}

impl NetworkFamily {
    /// Resolve a pair of boolean preferences. IPv6 wins when both are set.
    pub fn from_flags(use_ipv4: bool, use_ipv6: bool) -> Self {
        if use_ipv6 {
            NetworkFamily::Ipv6
        } else if use_ipv4 {
            NetworkFamily::Ipv4
        } else {
            NetworkFamily::Auto
        }
    }

    /// Command-line flag for this family, if any
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            NetworkFamily::Auto => None,
            NetworkFamily::Ipv4 => Some("-4"),
            NetworkFamily::Ipv6 => Some("-6"),
        }
    }
}

impl FromStr for NetworkFamily {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "" => Ok(NetworkFamily::Auto),
            "ipv4" | "v4" | "4" => Ok(NetworkFamily::Ipv4),
            "ipv6" | "v6" | "6" => Ok(NetworkFamily::Ipv6),
            _ => Err(Error::validation(format!("unknown network family '{}'", s))),
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFamily::Auto => write!(f, "auto"),
            NetworkFamily::Ipv4 => write!(f, "ipv4"),
            NetworkFamily::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// Username/password pair passed to the tool through its environment
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

// Keep the password out of debug output and logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Validated parameters of one rsync mirror job
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    name: String,
    rsync_cmd: String,
    upstream_url: String,
    credentials: Credentials,
    exclude_file: Option<PathBuf>,
    extra_options: Vec<String>,
    working_dir: PathBuf,
    log_dir: PathBuf,
    log_file: PathBuf,
    network: NetworkFamily,
    interval: Duration,
    retry: usize,
}

impl SyncConfig {
    /// Start building a config for `name` mirroring `upstream_url`
    pub fn builder(name: impl Into<String>, upstream_url: impl Into<String>) -> SyncConfigBuilder {
        SyncConfigBuilder::new(name, upstream_url)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path or name of the transfer tool binary
    pub fn rsync_cmd(&self) -> &str {
        &self.rsync_cmd
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn exclude_file(&self) -> Option<&Path> {
        self.exclude_file.as_deref()
    }

    pub fn extra_options(&self) -> &[String] {
        &self.extra_options
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn network(&self) -> NetworkFamily {
        self.network
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retry(&self) -> usize {
        self.retry
    }
}

/// Builder for [`SyncConfig`]
///
/// Every field except the name and upstream URL is optional.
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    name: String,
    upstream_url: String,
    rsync_cmd: Option<String>,
    credentials: Credentials,
    exclude_file: Option<PathBuf>,
    extra_options: Vec<String>,
    working_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    network: NetworkFamily,
    interval: Option<Duration>,
    retry: usize,
}

impl SyncConfigBuilder {
    pub fn new(name: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upstream_url: upstream_url.into(),
            rsync_cmd: None,
            credentials: Credentials::default(),
            exclude_file: None,
            extra_options: Vec::new(),
            working_dir: None,
            log_dir: None,
            log_file: None,
            network: NetworkFamily::Auto,
            interval: None,
            retry: 0,
        }
    }

    pub fn rsync_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.rsync_cmd = Some(cmd.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = Some(password.into());
        self
    }

    pub fn exclude_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude_file = Some(path.into());
        self
    }

    pub fn extra_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    pub fn log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn network(mut self, network: NetworkFamily) -> Self {
        self.network = network;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Retry count; zero selects [`DEFAULT_MAX_RETRY`]
    pub fn retry(mut self, retry: usize) -> Self {
        self.retry = retry;
        self
    }

    /// Validate and normalize into a [`SyncConfig`].
    ///
    /// The upstream URL must denote a directory, i.e. end with `/`.
    pub fn build(self) -> Result<SyncConfig> {
        if !self.upstream_url.ends_with('/') {
            return Err(Error::validation(format!(
                "rsync upstream URL '{}' should end with /",
                self.upstream_url
            )));
        }

        let credentials = Credentials {
            username: self.credentials.username.filter(|s| !s.is_empty()),
            password: self.credentials.password.filter(|s| !s.is_empty()),
        };

        Ok(SyncConfig {
            name: self.name,
            rsync_cmd: self
                .rsync_cmd
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_RSYNC_CMD.to_string()),
            upstream_url: self.upstream_url,
            credentials,
            exclude_file: self.exclude_file.filter(|p| !p.as_os_str().is_empty()),
            extra_options: self.extra_options,
            working_dir: self.working_dir.unwrap_or_else(|| PathBuf::from(".")),
            log_dir: self.log_dir.unwrap_or_else(|| PathBuf::from(".")),
            log_file: self.log_file.unwrap_or_else(|| PathBuf::from(DISCARD_LOG)),
            network: self.network,
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            retry: if self.retry == 0 {
                DEFAULT_MAX_RETRY
            } else {
                self.retry
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_upstream_without_trailing_slash() {
        let err = SyncConfig::builder("debian", "rsync://host/mod")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_build_rejects_empty_upstream() {
        assert!(SyncConfig::builder("debian", "").build().is_err());
    }

    #[test]
    fn test_build_applies_defaults() {
        let config = SyncConfig::builder("debian", "rsync://host/mod/")
            .build()
            .unwrap();
        assert_eq!(config.rsync_cmd(), DEFAULT_RSYNC_CMD);
        assert_eq!(config.retry(), DEFAULT_MAX_RETRY);
        assert_eq!(config.interval(), DEFAULT_INTERVAL);
        assert_eq!(config.log_file(), Path::new(DISCARD_LOG));
        assert_eq!(config.network(), NetworkFamily::Auto);
        assert!(config.exclude_file().is_none());
        assert!(config.extra_options().is_empty());
    }

    #[test]
    fn test_build_keeps_explicit_retry() {
        let config = SyncConfig::builder("debian", "rsync://host/mod/")
            .retry(5)
            .build()
            .unwrap();
        assert_eq!(config.retry(), 5);
    }

    #[test]
    fn test_empty_strings_are_treated_as_unset() {
        let config = SyncConfig::builder("debian", "rsync://host/mod/")
            .rsync_cmd("")
            .username("")
            .password("")
            .exclude_file("")
            .build()
            .unwrap();
        assert_eq!(config.rsync_cmd(), "rsync");
        assert_eq!(config.credentials(), &Credentials::default());
        assert!(config.exclude_file().is_none());
    }

    #[test]
    fn test_network_family_from_flags_prefers_ipv6() {
        assert_eq!(NetworkFamily::from_flags(true, true), NetworkFamily::Ipv6);
        assert_eq!(NetworkFamily::from_flags(false, true), NetworkFamily::Ipv6);
        assert_eq!(NetworkFamily::from_flags(true, false), NetworkFamily::Ipv4);
        assert_eq!(NetworkFamily::from_flags(false, false), NetworkFamily::Auto);
    }

    #[test]
    fn test_network_family_from_str() {
        assert_eq!("IPv6".parse::<NetworkFamily>().unwrap(), NetworkFamily::Ipv6);
        assert_eq!("v4".parse::<NetworkFamily>().unwrap(), NetworkFamily::Ipv4);
        assert!("ipx".parse::<NetworkFamily>().is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: Some("mirror".to_string()),
            password: Some("hunter2".to_string()),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("mirror"));
        assert!(!debug.contains("hunter2"));
    }
}
