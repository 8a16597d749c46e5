//! Log file initialization
//!
//! Every gauge reading, creation, deletion, and warning of a run lands as
//! a timestamped line in `snapkeep.log`. Initialization never fails the
//! run: if no directory is writable the subscriber falls back to stderr.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

/// Preferred log directory: `$SNAPKEEP_LOG_DIR`, else `/var/log/snapkeep`
pub fn log_dir() -> PathBuf {
    match std::env::var_os("SNAPKEEP_LOG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("/var/log/snapkeep"),
    }
}

/// Install the file-backed subscriber
///
/// Returns the directory actually used (also home to the run lock) and the
/// appender guard, which the caller must hold until exit so buffered lines
/// flush.
pub fn init() -> (PathBuf, Option<WorkerGuard>) {
    let dir = pick_writable_dir();
    let Some(dir) = dir else {
        tracing_subscriber::fmt().with_ansi(false).init();
        return (std::env::temp_dir(), None);
    };

    let appender = tracing_appender::rolling::never(&dir, "snapkeep.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(writer)
        .init();
    (dir, Some(guard))
}

fn pick_writable_dir() -> Option<PathBuf> {
    let preferred = log_dir();
    if std::fs::create_dir_all(&preferred).is_ok() {
        return Some(preferred);
    }

    let fallback = std::env::temp_dir().join("snapkeep");
    std::fs::create_dir_all(&fallback).ok()?;
    Some(fallback)
}
