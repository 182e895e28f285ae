//! Persisted records of detached processes
//!
//! Each detached process gets one `<pid>.json` file. Later invocations find
//! running tasks by reading these files back; nothing else is shared
//! between invocations.

use crate::error::Result;
use chrono::{DateTime, Local};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// A task running in the background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedProcess {
    pub pid: u32,
    pub task_name: String,
    /// The rendered command that was spawned
    pub command: String,
    pub started_at: DateTime<Local>,
    pub log_file: PathBuf,
}

impl DetachedProcess {
    /// Time since the process was started
    pub fn running_for(&self) -> Duration {
        (Local::now() - self.started_at).to_std().unwrap_or_default()
    }
}

/// Directory of `<pid>.json` process records
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: PathBuf) -> Self {
        RecordStore { dir }
    }

    fn path_for(&self, pid: u32) -> PathBuf {
        self.dir.join(format!("{}.json", pid))
    }

    /// Write a record, replacing any previous record for the same pid
    pub fn save(&self, record: &DetachedProcess) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let data = serde_json::to_string_pretty(record)?;
        // Write then rename so a concurrent reader never sees half a record
        let staging = self.dir.join(format!("{}.json.tmp", record.pid));
        fs::write(&staging, data)?;
        fs::rename(&staging, self.path_for(record.pid))?;

        debug!(pid = record.pid, task = %record.task_name, "saved process record");
        Ok(())
    }

    /// Delete the record for `pid`. Returns false if there was none.
    pub fn remove(&self, pid: u32) -> io::Result<bool> {
        match fs::remove_file(self.path_for(pid)) {
            Ok(()) => {
                debug!(pid, "removed process record");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read every record, skipping files that cannot be read or parsed
    pub fn load_all(&self) -> Result<Vec<DetachedProcess>> {
        let pattern = format!(
            "{}/*.json",
            Pattern::escape(&self.dir.to_string_lossy())
        );
        let paths = glob::glob(&pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let mut records = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable record path");
                    continue;
                }
            };

            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|data| {
                    serde_json::from_str::<DetachedProcess>(&data).map_err(|e| e.to_string())
                });

            match parsed {
                Ok(record) => records.push(record),
                Err(error) => debug!(path = %path.display(), %error, "skipping invalid record"),
            }
        }

        Ok(records)
    }
}
