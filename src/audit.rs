//! Append-only audit trail.
//!
//! Each decision and each section summary becomes one timestamped line. Lines
//! are written with a single `write_all` so a tailing reader never sees half a
//! line. When no log file is configured, or the file stops accepting writes,
//! lines still reach the console.

use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{QuotaError, Result};
use crate::logging::Logger;
use crate::quota::{ActionRecord, SectionSummary};
use crate::timestamp::{log_timestamp, now};

/// Writer for the audit log.
#[derive(Debug)]
pub struct AuditLog {
    sink: Option<(PathBuf, File)>,
    log: Logger,
    write_failed: bool,
}

impl AuditLog {
    /// Open (or create) the log file at `path` for appending.
    ///
    /// The parent directory is created if it does not exist.
    pub fn open(path: &Path, log: Logger) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| QuotaError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| QuotaError::IoError {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            sink: Some((path.to_path_buf(), file)),
            log,
            write_failed: false,
        })
    }

    /// Audit lines go to the console only.
    pub fn console(log: Logger) -> Self {
        Self {
            sink: None,
            log,
            write_failed: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|(path, _)| path.as_path())
    }

    /// One directory decision.
    pub fn record(&mut self, record: &ActionRecord) {
        if record.is_failure() {
            self.log.error(record);
        } else {
            self.log.verbose(1, record);
        }
        self.append(record);
    }

    /// One section summary.
    pub fn summary(&mut self, summary: &SectionSummary) {
        self.log.info(summary);
        self.append(summary);
    }

    /// A free-form run event (start, stop, lock conflict).
    pub fn event(&mut self, message: impl Display) {
        self.log.verbose(1, &message);
        self.append(message);
    }

    fn append(&mut self, message: impl Display) {
        if self.write_failed {
            return;
        }
        let Some((path, file)) = self.sink.as_mut() else {
            return;
        };

        let line = format!("{} {message}\n", log_timestamp(&now()));
        if let Err(err) = file.write_all(line.as_bytes()) {
            // Keep the run going; the console still has everything.
            self.log
                .error(format!("cannot write audit log {}: {err}", path.display()));
            self.write_failed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::quota::{Action, SectionOutcome};

    #[test]
    fn test_lines_are_appended_with_timestamps() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/dirquota.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "earlier line\n").unwrap();

        let mut audit = AuditLog::open(&path, Logger::new(0, true)).unwrap();
        audit.record(&ActionRecord::new("s", "/srv/s/d1", Action::Cleaned));
        let mut summary = SectionSummary::new("s", "/srv/s", 1);
        summary.outcome = SectionOutcome::Enforced;
        audit.summary(&summary);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "earlier line");
        assert!(lines[1].ends_with("[s] CLEANED /srv/s/d1"));
        assert!(lines[2].contains("[s] SUMMARY"));
        // "YYYY-MM-DD HH:MM:SS " prefix
        assert_eq!(lines[1].as_bytes()[4], b'-');
        assert_eq!(lines[1].as_bytes()[19], b' ');
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("var/log/dirquota/run.log");

        let audit = AuditLog::open(&path, Logger::new(0, true)).unwrap();
        assert_eq!(audit.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn test_console_log_has_no_path() {
        let mut audit = AuditLog::console(Logger::new(0, true));
        audit.event("run started");
        assert!(audit.path().is_none());
    }
}
