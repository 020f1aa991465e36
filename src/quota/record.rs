//! Audit records: one per directory decision, one summary per section.

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to a single directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Skip,
    WouldClean,
    WouldArchive,
    Cleaned,
    Archived,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Skip => "SKIP",
            Action::WouldClean => "WOULD-CLEAN",
            Action::WouldArchive => "WOULD-ARCHIVE",
            Action::Cleaned => "CLEANED",
            Action::Archived => "ARCHIVED",
        }
    }

    /// Whether the filesystem was changed.
    pub fn is_mutation(self) -> bool {
        matches!(self, Action::Cleaned | Action::Archived)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The decision taken for one directory of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub section: String,
    pub source: PathBuf,
    pub action: Action,
    pub target: Option<PathBuf>,
    /// Why a directory was skipped.
    pub reason: Option<String>,
    /// Failure that left the directory untouched.
    pub error: Option<String>,
}

impl ActionRecord {
    pub fn new(section: impl Into<String>, source: impl Into<PathBuf>, action: Action) -> Self {
        Self {
            section: section.into(),
            source: source.into(),
            action,
            target: None,
            reason: None,
            error: None,
        }
    }

    pub fn skipped(
        section: impl Into<String>,
        source: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(section, source, Action::Skip).with_reason(reason)
    }

    /// A live action that could not be carried out.
    pub fn failed(
        section: impl Into<String>,
        source: impl Into<PathBuf>,
        target: Option<&Path>,
        error: impl Into<String>,
    ) -> Self {
        let mut record = Self::new(section, source, Action::Skip);
        record.target = target.map(Path::to_path_buf);
        record.error = Some(error.into());
        record
    }

    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.is_failure() {
            "FAILED"
        } else {
            self.action.label()
        };
        write!(f, "[{}] {label} {}", self.section, self.source.display())?;
        if let Some(target) = &self.target {
            write!(f, " -> {}", target.display())?;
        }
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        if let Some(error) = &self.error {
            write!(f, " (error: {error})")?;
        }
        Ok(())
    }
}

/// How a section's turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// At or under quota; nothing to do.
    NoOp,
    /// Excess directories were handed to the executor.
    Enforced,
    /// The whole section was skipped before scanning or during the scan.
    Skipped(String),
    /// A stop was requested while the section was being processed.
    Interrupted,
}

/// Summary line emitted once per section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSummary {
    pub section: String,
    pub root: PathBuf,
    pub quota: u32,
    /// Immediate subdirectories found by the scan.
    pub found: usize,
    /// Directories selected by the retention policy.
    pub excess: usize,
    /// Directories actually cleaned, archived, or (simulated) would be.
    pub processed: usize,
    /// Selected directories skipped as protected.
    pub skipped: usize,
    /// Selected directories whose action failed.
    pub failed: usize,
    pub outcome: SectionOutcome,
}

impl SectionSummary {
    pub fn new(section: impl Into<String>, root: impl Into<PathBuf>, quota: u32) -> Self {
        Self {
            section: section.into(),
            root: root.into(),
            quota,
            found: 0,
            excess: 0,
            processed: 0,
            skipped: 0,
            failed: 0,
            outcome: SectionOutcome::NoOp,
        }
    }

    pub(crate) fn count(&mut self, record: &ActionRecord) {
        if record.is_failure() {
            self.failed += 1;
        } else if record.action == Action::Skip {
            self.skipped += 1;
        } else {
            self.processed += 1;
        }
    }
}

impl fmt::Display for SectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] SUMMARY ", self.section)?;
        match &self.outcome {
            SectionOutcome::NoOp => write!(
                f,
                "no-op: {} directories, quota {}",
                self.found, self.quota
            ),
            SectionOutcome::Skipped(reason) => {
                write!(f, "section skipped: {} ({reason})", self.root.display())
            }
            SectionOutcome::Enforced | SectionOutcome::Interrupted => {
                write!(
                    f,
                    "{} directories, quota {}, excess {}, processed {}, skipped {}, failed {}",
                    self.found, self.quota, self.excess, self.processed, self.skipped, self.failed
                )?;
                if self.outcome == SectionOutcome::Interrupted {
                    f.write_str(" (interrupted)")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let record = ActionRecord::new("builds", "/srv/builds/d1", Action::WouldArchive)
            .with_target("/srv/archive/d1");
        assert_eq!(
            record.to_string(),
            "[builds] WOULD-ARCHIVE /srv/builds/d1 -> /srv/archive/d1"
        );

        let record = ActionRecord::skipped("builds", "/srv/builds/keep", "excluded path");
        assert_eq!(
            record.to_string(),
            "[builds] SKIP /srv/builds/keep (excluded path)"
        );

        let record = ActionRecord::failed("builds", "/srv/builds/d2", None, "permission denied");
        assert!(record.is_failure());
        assert_eq!(
            record.to_string(),
            "[builds] FAILED /srv/builds/d2 (error: permission denied)"
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = SectionSummary::new("logs", "/srv/logs", 2);
        summary.count(&ActionRecord::new("logs", "/srv/logs/a", Action::Cleaned));
        summary.count(&ActionRecord::skipped("logs", "/srv/logs/b", "anchor"));
        summary.count(&ActionRecord::failed("logs", "/srv/logs/c", None, "busy"));
        assert_eq!(
            (summary.processed, summary.skipped, summary.failed),
            (1, 1, 1)
        );
    }

    #[test]
    fn test_noop_summary_display() {
        let mut summary = SectionSummary::new("logs", "/srv/logs", 4);
        summary.found = 3;
        assert_eq!(
            summary.to_string(),
            "[logs] SUMMARY no-op: 3 directories, quota 4"
        );
    }

    #[test]
    fn test_mutation_actions() {
        assert!(Action::Cleaned.is_mutation());
        assert!(Action::Archived.is_mutation());
        assert!(!Action::WouldClean.is_mutation());
        assert!(!Action::Skip.is_mutation());
    }
}
