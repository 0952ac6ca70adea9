//! Single-instance guard for a results directory.
//!
//! Fetch commands append to shared logs, so two runs against the same
//! results directory would interleave records and cursors. The guard is an
//! exclusive `.repograph.lock` file created with `create_new` and removed
//! when the guard is dropped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub(crate) const LOCK_FILE: &str = ".repograph.lock";

#[derive(Debug)]
pub(crate) struct ResultsLock {
    path: PathBuf,
}

impl ResultsLock {
    /// Take the lock, creating the results directory if needed.
    pub(crate) fn acquire(results_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(results_dir)?;
        let path = results_dir.join(LOCK_FILE);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "another fetch is using {} (pid {}). If no other repograph process \
                         is running, delete {}",
                        results_dir.display(),
                        holder.trim(),
                        path.display()
                    ),
                ));
            }
            Err(e) => return Err(e),
        };
        writeln!(file, "{}", std::process::id())?;

        tracing::debug!(path = %path.display(), "Acquired results lock");
        Ok(Self { path })
    }
}

impl Drop for ResultsLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
    }
}
