//! External process launching
//!
//! Providers never touch `std::process` directly. They describe what to
//! run in a [`LaunchSpec`] and hand it to a [`Launcher`], which returns a
//! [`ProcessHandle`] to wait on. Tests substitute their own launcher.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::config::DISCARD_LOG;
use crate::error::{Error, Result};

/// Where the child's stdout and stderr go
#[derive(Debug)]
pub enum LogTarget {
    Discard,
    File(File),
}

impl LogTarget {
    /// Create (or truncate) the log file at `path`.
    ///
    /// `/dev/null` maps to [`LogTarget::Discard`]. The parent directory is
    /// created when missing.
    pub fn prepare(path: &Path) -> Result<Self> {
        if path == Path::new(DISCARD_LOG) {
            return Ok(LogTarget::Discard);
        }

        let log_prepare = |source| Error::LogPrepare {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(log_prepare)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(log_prepare)?;
        Ok(LogTarget::File(file))
    }

    fn stdio_pair(&self) -> std::io::Result<(Stdio, Stdio)> {
        match self {
            LogTarget::Discard => Ok((Stdio::null(), Stdio::null())),
            LogTarget::File(file) => Ok((Stdio::from(file.try_clone()?), Stdio::from(file.try_clone()?))),
        }
    }
}

/// Everything needed to start one external process
#[derive(Debug)]
pub struct LaunchSpec {
    /// Program followed by its arguments
    pub command: Vec<String>,
    pub working_dir: PathBuf,
    /// Added on top of the inherited environment
    pub env: BTreeMap<String, String>,
    pub log: LogTarget,
}

impl LaunchSpec {
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }
}

/// A started process
pub trait ProcessHandle: Send + fmt::Debug {
    /// OS process id, when there is one
    fn id(&self) -> Option<u32>;

    /// Block until the process exits. A non-zero exit is an error.
    fn wait(&mut self) -> Result<()>;
}

/// Starts processes for providers
pub trait Launcher: Send + Sync + fmt::Debug {
    fn launch(&self, spec: LaunchSpec) -> Result<Box<dyn ProcessHandle>>;
}

/// Launcher backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, spec: LaunchSpec) -> Result<Box<dyn ProcessHandle>> {
        let (program, args) = spec.command.split_first().ok_or(Error::EmptyCommand)?;
        let launch_err = |source| Error::Launch {
            program: program.clone(),
            source,
        };

        fs::create_dir_all(&spec.working_dir).map_err(launch_err)?;
        let (stdout, stderr) = spec.log.stdio_pair().map_err(launch_err)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);

        let child = cmd.spawn().map_err(launch_err)?;
        tracing::debug!(program = %program, pid = child.id(), "Process started");

        Ok(Box::new(SystemProcess {
            program: program.clone(),
            child,
        }))
    }
}

/// Child process started by [`SystemLauncher`]
#[derive(Debug)]
pub struct SystemProcess {
    program: String,
    child: Child,
}

impl ProcessHandle for SystemProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn wait(&mut self) -> Result<()> {
        let status = self.child.wait().map_err(|source| Error::Launch {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}
