//! Per-pool run lock
//!
//! Runs are driven by a scheduler with no knowledge of each other; two
//! concurrent runs against one pool would race on the same snapshots. The
//! lock is an flock-held file per pool, so a crashed run never wedges the
//! next one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held for the duration of one run against one pool
pub struct RunLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: u64,
}

impl RunLock {
    /// Try to acquire the run lock for `pool`
    ///
    /// Returns `Ok(None)` when another live run holds the lock (the caller
    /// skips this run). A lock left behind by a dead process is removed and
    /// acquisition retried.
    pub fn acquire(state_dir: &Path, pool: &str) -> Result<Option<Self>> {
        let lock_path = state_dir.join("locks").join(format!("{pool}.lock"));

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create locks directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .context("failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            if Self::is_stale_lock(&mut file)? {
                tracing::warn!(pool, "removing stale run lock");
                drop(file);
                std::fs::remove_file(&lock_path)?;
                return Self::acquire(state_dir, pool); // Retry
            }
            return Ok(None);
        }

        Self::write_lock_content(&mut file)?;

        Ok(Some(Self {
            path: lock_path,
            file,
        }))
    }

    /// Does the lock file belong to a process that is no longer alive?
    fn is_stale_lock(file: &mut File) -> Result<bool> {
        match Self::read_lock_content(file) {
            Ok(content) => Ok(!is_process_alive(content.pid)),
            // Unreadable content: assume stale
            Err(_) => Ok(true),
        }
    }

    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: current_timestamp_ms(),
        };

        let serialized =
            serde_json::to_string(&content).context("failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent =
            serde_json::from_str(&contents).context("failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check if process is alive
#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal checks existence without delivering anything
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false, // No such process
        Err(_) => true,                         // Permission denied or other - assume alive
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("System time before UNIX epoch")
        .as_millis() as u64
}
