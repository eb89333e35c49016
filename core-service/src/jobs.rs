//! Single-active-job lock per (job kind, destination).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use core_sync::SyncError;
use tracing::debug;

/// Keys of the runs currently in flight.
#[derive(Debug, Clone, Default)]
pub struct ActiveJobs {
    running: Arc<Mutex<HashSet<String>>>,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `job` on `destination`, or fail with `SyncInProgress`.
    ///
    /// The claim is released when the returned guard is dropped.
    pub fn acquire(&self, job: &str, destination: &str) -> Result<JobGuard, SyncError> {
        let key = format!("{}@{}", job, destination);
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(key.clone()) {
            return Err(SyncError::SyncInProgress {
                kind: job.to_string(),
            });
        }
        debug!(job = %key, "Job claimed");
        Ok(JobGuard {
            running: Arc::clone(&self.running),
            key,
        })
    }

    pub fn is_running(&self, job: &str, destination: &str) -> bool {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.contains(&format!("{}@{}", job, destination))
    }
}

/// Releases its job claim on drop.
#[derive(Debug)]
pub struct JobGuard {
    running: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.key);
        debug!(job = %self.key, "Job released");
    }
}
