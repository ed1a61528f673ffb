//! Single-flight guard shared by every provider kind

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock plus `running` flag plus retry budget for one job.
///
/// `running` may be read at any time but is only changed while the lock
/// returned by [`RunGuard::lock`] is held.
#[derive(Debug)]
pub struct RunGuard {
    lock: Mutex<()>,
    running: AtomicBool,
    retry: usize,
}

impl RunGuard {
    pub fn new(retry: usize) -> Self {
        Self {
            lock: Mutex::new(()),
            running: AtomicBool::new(false),
            retry,
        }
    }

    /// Acquire the guard's lock. A poisoned lock is recovered since it
    /// protects no data of its own.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Change the running flag. Requires the caller to hold the lock.
    pub fn set_running(&self, _held: &MutexGuard<'_, ()>, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Number of attempts a scheduler may make for this job
    pub fn retry(&self) -> usize {
        self.retry
    }
}
