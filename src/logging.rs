//! Log setup for the `plus` binary.
//!
//! Logs go to a daily-rotated file so that command output on the terminal
//! stays clean. The filter comes from `RUST_LOG`, defaulting to `info`.
//!
//! Logging is best-effort: when no log directory is writable the binary runs
//! without a file subscriber.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::db;

pub const LOG_FILE_PREFIX: &str = "plus.log";

/// Candidate log directories, most preferred first: the data directory, then
/// the session directory.
pub fn default_dirs() -> Vec<PathBuf> {
  let mut dirs = Vec::new();
  if let Ok(data_dir) = db::data_dir() {
    dirs.push(data_dir.join("logs"));
  }
  dirs.push(db::session_dir().join("logs"));
  dirs
}

/// Install the global subscriber, writing under the first usable directory.
///
/// Returns `None` when no directory works or a subscriber is already set; a
/// warning goes to stderr and the caller carries on without file logs. Keep
/// the returned guard alive for the whole run; dropping it flushes and stops
/// the background writer.
pub fn init(log_dirs: &[PathBuf]) -> Option<WorkerGuard> {
  let Some((log_dir, appender)) = first_usable_appender(log_dirs) else {
    eprintln!("warning: no writable log directory, logging disabled");
    return None;
  };

  let (writer, guard) = tracing_appender::non_blocking(appender);
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  match tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
  {
    Ok(()) => {
      tracing::debug!(dir = %log_dir.display(), "logging initialized");
      Some(guard)
    }
    Err(e) => {
      eprintln!("warning: failed to initialize logging: {}", e);
      None
    }
  }
}

fn first_usable_appender(log_dirs: &[PathBuf]) -> Option<(PathBuf, RollingFileAppender)> {
  for dir in log_dirs {
    match open_appender(dir) {
      Ok(appender) => return Some((dir.clone(), appender)),
      Err(e) => eprintln!("warning: {}", e),
    }
  }
  None
}

fn open_appender(log_dir: &Path) -> Result<RollingFileAppender> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix(LOG_FILE_PREFIX)
    .build(log_dir)
    .map_err(|e| eyre!("Failed to open log file in {}: {}", log_dir.display(), e))
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A regular file, so nothing can be created beneath it.
  fn blocker(dir: &Path) -> PathBuf {
    let path = dir.join("blocker");
    std::fs::write(&path, b"not a directory").unwrap();
    path
  }

  #[test]
  fn test_skips_unusable_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let unusable = blocker(dir.path()).join("logs");
    let usable = dir.path().join("session").join("logs");

    let (chosen, _appender) =
      first_usable_appender(&[unusable, usable.clone()]).unwrap();
    assert_eq!(chosen, usable);
    assert!(usable.is_dir());
  }

  #[test]
  fn test_no_usable_directory_disables_logging() {
    let dir = tempfile::TempDir::new().unwrap();
    let unusable = blocker(dir.path()).join("logs");

    assert!(first_usable_appender(&[unusable.clone()]).is_none());
    assert!(init(&[unusable]).is_none());
    assert!(init(&[]).is_none());
  }

  #[test]
  fn test_default_dirs_end_with_session_dir() {
    let dirs = default_dirs();
    assert_eq!(dirs.last(), Some(&db::session_dir().join("logs")));
  }
}
