use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-job error accumulator shared by the sequential phase invocations of
/// one backup job. Lives in the system temp directory, keyed by the task
/// identifier; created lazily on first append and deleted on a clean
/// `job-end`.
#[derive(Debug, Clone)]
pub struct PendingErrorLog {
    path: PathBuf,
}

impl PendingErrorLog {
    pub fn for_task(task_id: &str) -> Self {
        Self {
            path: std::env::temp_dir().join(format!("{task_id}.errlog")),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one line, creating the file on first use.
    pub fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open error log {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to append to error log {}", self.path.display()))?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read error log {}", self.path.display()))
    }

    pub fn remove(&self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove error log {}", self.path.display()))
    }
}
