//! Check command: validate the configuration and show what a run would face.
//!
//! Nothing here takes the lock or touches the filesystem beyond reading the
//! section roots.

use std::fmt;

use crate::config::{Mode, RunConfig, SectionConfig};
use crate::error::Result;
use crate::logging::Logger;
use crate::quota::retention::quota_as_count;
use crate::quota::{SafetyGuard, excess_count, section_directories};

/// Current state of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionStatus {
    /// Root readable; `excess` directories over the quota.
    Counted { found: usize, excess: usize },
    /// A run would skip this section.
    Skipped(String),
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionStatus::Counted { found, excess: 0 } => {
                write!(f, "{found} directories, within quota")
            }
            SectionStatus::Counted { found, excess } => {
                write!(f, "{found} directories, {excess} over quota")
            }
            SectionStatus::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// What a run would find in `section` right now.
pub fn section_status(section: &SectionConfig, guard: &SafetyGuard) -> SectionStatus {
    if let Some(protection) = guard.protection(section.root()) {
        return SectionStatus::Skipped(format!("root is protected: {protection}"));
    }

    match section_directories(section.root(), section.archive(), guard) {
        Ok(entries) => SectionStatus::Counted {
            found: entries.len(),
            excess: excess_count(entries.len(), quota_as_count(section.max_directories())),
        },
        Err(err) => SectionStatus::Skipped(err.to_string()),
    }
}

/// Print the configuration and each section's status to stdout.
pub fn check(config: &RunConfig, log: Logger) -> Result<()> {
    let guard = config.safety_guard()?;

    let mode = match config.mode() {
        Mode::Remove => "remove",
        Mode::Relocate => "relocate",
    };
    println!(
        "action: {mode}{}",
        if config.simulate() { " (simulated)" } else { "" }
    );
    println!("lock: {}", config.lock_path().display());
    match config.log_file() {
        Some(path) => println!("audit log: {}", path.display()),
        None => println!("audit log: console"),
    }
    if log.enabled(1) {
        let anchors: Vec<_> = guard
            .anchors()
            .iter()
            .map(|anchor| anchor.display().to_string())
            .collect();
        println!("anchors: {}", anchors.join(", "));
        println!("excluded entries: {}", guard.excluded().len());
    }

    if config.sections().is_empty() {
        println!("no sections configured");
        return Ok(());
    }

    for section in config.sections() {
        let status = section_status(section, &guard);
        print!(
            "[{}] {} quota {}: {status}",
            section.name(),
            section.root().display(),
            section.max_directories()
        );
        match (config.mode(), section.archive()) {
            (Mode::Relocate, Some(archive)) => println!(" -> {}", archive.display()),
            _ => println!(),
        }
    }

    Ok(())
}
