//! Shared test fixtures for mirror-worker integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};

use mirror_worker::launcher::{LaunchSpec, Launcher, LogTarget, ProcessHandle};
use mirror_worker::provider::ENV_LOG_FILE;
use mirror_worker::{Error, Result};

/// What a [`FakeLauncher`] saw for one launch
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    pub command: Vec<String>,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Latch that fake processes block on until it is opened
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

#[derive(Debug, Default)]
struct Behaviour {
    log_output: String,
    exit_code: Option<i32>,
    fail_launch: bool,
    delete_log_on_exit: bool,
    gate: Option<Arc<Gate>>,
}

/// Launcher that records launches instead of spawning processes
#[derive(Debug, Default)]
pub struct FakeLauncher {
    behaviour: Mutex<Behaviour>,
    launches: Mutex<Vec<RecordedLaunch>>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Text the fake process writes to its log
    pub fn set_log_output(&self, output: &str) {
        self.behaviour.lock().unwrap().log_output = output.to_string();
    }

    /// Exit code reported by later processes; `None` is success
    pub fn set_exit_code(&self, code: Option<i32>) {
        self.behaviour.lock().unwrap().exit_code = code;
    }

    pub fn set_fail_launch(&self, fail: bool) {
        self.behaviour.lock().unwrap().fail_launch = fail;
    }

    pub fn set_delete_log_on_exit(&self, delete: bool) {
        self.behaviour.lock().unwrap().delete_log_on_exit = delete;
    }

    /// Make later processes block in `wait` until `gate` opens
    pub fn set_gate(&self, gate: Arc<Gate>) {
        self.behaviour.lock().unwrap().gate = Some(gate);
    }

    pub fn launches(&self) -> Vec<RecordedLaunch> {
        self.launches.lock().unwrap().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, spec: LaunchSpec) -> Result<Box<dyn ProcessHandle>> {
        let behaviour = self.behaviour.lock().unwrap();
        if behaviour.fail_launch {
            return Err(Error::Launch {
                program: spec.program().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary"),
            });
        }

        if let LogTarget::File(mut file) = spec.log {
            file.write_all(behaviour.log_output.as_bytes()).unwrap();
        }

        self.launches.lock().unwrap().push(RecordedLaunch {
            command: spec.command.clone(),
            working_dir: spec.working_dir.clone(),
            env: spec.env.clone(),
        });

        Ok(Box::new(FakeProcess {
            program: spec.command.first().cloned().unwrap_or_default(),
            exit_code: behaviour.exit_code,
            gate: behaviour.gate.clone(),
            delete_on_exit: behaviour
                .delete_log_on_exit
                .then(|| spec.env.get(ENV_LOG_FILE).map(PathBuf::from))
                .flatten(),
        }))
    }
}

#[derive(Debug)]
struct FakeProcess {
    program: String,
    exit_code: Option<i32>,
    gate: Option<Arc<Gate>>,
    delete_on_exit: Option<PathBuf>,
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn wait(&mut self) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if let Some(path) = &self.delete_on_exit {
            let _ = std::fs::remove_file(path);
        }
        match self.exit_code {
            None => Ok(()),
            Some(code) => Err(Error::CommandFailed {
                program: self.program.clone(),
                code: Some(code),
            }),
        }
    }
}

/// rsync `--stats` tail reporting `size` as the total file size
pub fn stats_log(size: &str) -> String {
    format!(
        "sending incremental file list\n\nNumber of files: 3\nTotal file size: {} bytes\nTotal transferred file size: 0 bytes\n",
        size
    )
}
