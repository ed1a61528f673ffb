//! Error types for mirror-worker

use std::path::PathBuf;

/// Result type for mirror-worker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running a sync job
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Job configuration is malformed
    #[error("Invalid sync configuration: {message}")]
    Validation { message: String },

    /// A run of this job is already in flight
    #[error("Provider '{name}' is currently running")]
    AlreadyRunning { name: String },

    /// Wait was called with no launched process
    #[error("Provider '{name}' has no running process")]
    NotRunning { name: String },

    /// The log file could not be created or truncated
    #[error("Failed to prepare log file {path}: {source}")]
    LogPrepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command vector was empty
    #[error("Cannot launch an empty command")]
    EmptyCommand,

    /// The external process could not be spawned
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external process exited unsuccessfully
    #[error("{program} exited with {}", exit_label(.code))]
    CommandFailed {
        program: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Exit code carried by a `CommandFailed` error, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}
