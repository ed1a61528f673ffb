//! Key/value context shared between a provider and the code around it

use std::collections::HashMap;
use std::path::PathBuf;

/// Key for the job's working directory
pub const WORKING_DIR_KEY: &str = "working_dir";
/// Key for the job's log directory
pub const LOG_DIR_KEY: &str = "log_dir";
/// Key for the job's log file
pub const LOG_FILE_KEY: &str = "log_file";

/// String map through which providers publish their paths
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Read a value as a path; missing keys yield an empty path
    pub fn get_path(&self, key: &str) -> PathBuf {
        self.get(key).map(PathBuf::from).unwrap_or_default()
    }
}
