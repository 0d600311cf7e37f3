//! procfs thread table
//!
//! Reads `<task_dir>/<tid>/status` for every numeric entry of the task
//! directory. The default task directory is `/proc/self/task`; tests point it
//! at a fixture tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ThreadLister;
use crate::config::DEFAULT_TASK_DIR;
use crate::core::types::Tid;

/// Thread lister backed by a procfs-style task directory
#[derive(Debug, Clone)]
pub struct ProcThreadLister {
    task_dir: PathBuf,
}

impl ProcThreadLister {
    /// Lister over the given task directory
    pub fn new(task_dir: impl Into<PathBuf>) -> Self {
        Self {
            task_dir: task_dir.into(),
        }
    }

    /// Lister over `/proc/self/task`
    pub fn current_process() -> Self {
        Self::new(DEFAULT_TASK_DIR)
    }

    pub fn task_dir(&self) -> &Path {
        &self.task_dir
    }

    fn status_path(&self, tid: Tid) -> PathBuf {
        self.task_dir.join(tid.to_string()).join("status")
    }
}

impl Default for ProcThreadLister {
    fn default() -> Self {
        Self::current_process()
    }
}

impl ThreadLister for ProcThreadLister {
    fn thread_ids(&self) -> io::Result<Vec<Tid>> {
        let mut tids: Vec<Tid> = fs::read_dir(&self.task_dir)?
            // an entry that errors out mid-listing belongs to an exiting thread
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<Tid>().ok())
            .collect();
        tids.sort_unstable();
        Ok(tids)
    }

    fn thread_name(&self, tid: Tid) -> io::Result<String> {
        let status = fs::read_to_string(self.status_path(tid))?;
        parse_status_name(&status).map(str::to_string).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no Name field in status of thread {}", tid),
            )
        })
    }
}

/// Extract the `Name:` field of a procfs status record
///
/// The value is returned byte for byte; thread names may carry leading or
/// trailing spaces and those must not be lost.
pub fn parse_status_name(status: &str) -> Option<&str> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Name:\t"))
        .map(|name| name.strip_suffix('\r').unwrap_or(name))
}
