//! Buffered run logger.
//!
//! Detail lines are buffered in memory and written in one go on
//! [`flush`](ScrubLogger::flush), so per-image failures never pay file I/O
//! inside the processing loop. The buffer append is safe under concurrent
//! callers, which the parallel batch path relies on.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Local;

use crate::error::Result;

/// How much detail a run records. `None` disables buffering entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Record nothing.
    None,
    /// Failures only.
    Minimum,
    /// Failures and per-run summaries.
    #[default]
    Default,
    /// Everything.
    High,
}

/// Divider separating runs that share one log file.
const ENTRY_DIVIDER: &str = "#NEW_ENTRY";

/// Default log path used when no explicit path is configured.
const PERMA_LOG_PATH: &str = "scrub_log.txt";

/// Append-only diagnostic logger for scrub runs.
///
/// The core only ever hands it already-normalized error strings; raw backend
/// failures never reach the log un-normalized.
#[derive(Debug)]
pub struct ScrubLogger {
    level: LogLevel,
    perma_path: PathBuf,
    alternate_path: Option<PathBuf>,
    details: Mutex<Vec<String>>,
}

impl ScrubLogger {
    /// Create a logger at the given level.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            perma_path: PathBuf::from(PERMA_LOG_PATH),
            alternate_path: None,
            details: Mutex::new(Vec::new()),
        }
    }

    /// Override the default log file location.
    #[must_use]
    pub fn with_perma_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.perma_path = path.into();
        self
    }

    /// Duplicate [`flush`](Self::flush) calls without an explicit path to
    /// this file in addition to the default log.
    #[must_use]
    pub fn with_alternate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.alternate_path = Some(path.into());
        self
    }

    /// Buffer one detail line, timestamped. Safe under concurrent callers.
    pub fn add_detail(&self, detail: impl Into<String>) {
        if self.level == LogLevel::None {
            return;
        }
        let line = format!(
            "{}, {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            detail.into()
        );
        self.lock_details().push(line);
    }

    /// Number of buffered lines not yet written.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock_details().len()
    }

    /// Write all buffered details to `path` when one is given; otherwise to
    /// the default log file, and additionally to the alternate path when one
    /// is configured. The buffer drains only when every write succeeds.
    pub fn flush(&self, path: Option<&Path>) -> Result<()> {
        let mut details = self.lock_details();
        if details.is_empty() {
            return Ok(());
        }

        match path {
            Some(p) => write_run(p, &details)?,
            None => {
                write_run(&self.perma_path, &details)?;
                if let Some(alt) = &self.alternate_path {
                    write_run(alt, &details)?;
                }
            }
        }
        details.clear();
        Ok(())
    }

    fn lock_details(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.details.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_run(path: &Path, details: &[String]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{ENTRY_DIVIDER}")?;
    for line in details {
        writeln!(file, "{line}")?;
    }
    Ok(())
}
