use std::fmt;

use super::executor::{ActionMode, Executor};
use super::inventory::section_directories;
use super::record::{ActionRecord, SectionOutcome, SectionSummary};
use super::retention::{quota_as_count, select_excess};
use super::safety::SafetyGuard;
use crate::audit::AuditLog;
use crate::config::{Mode, RunConfig, SectionConfig};
use crate::error::Result;
use crate::lock::RunLock;
use crate::logging::Logger;
use crate::signals::StopSignal;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Acquiring,
    Running,
    Releasing,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Acquiring => "acquiring",
            RunState::Running => "running",
            RunState::Releasing => "releasing",
        };
        f.write_str(name)
    }
}

/// Everything a run decided, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sections: Vec<SectionSummary>,
    pub records: Vec<ActionRecord>,
    pub simulated: bool,
    pub interrupted: bool,
}

impl RunReport {
    /// Records for one section.
    pub fn records_for<'a>(
        &'a self,
        section: &'a str,
    ) -> impl Iterator<Item = &'a ActionRecord> {
        self.records.iter().filter(move |r| r.section == section)
    }

    pub fn processed(&self) -> usize {
        self.sections.iter().map(|s| s.processed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.sections.iter().map(|s| s.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.sections.iter().map(|s| s.failed).sum()
    }
}

/// Drives one run: lock, then every section in configuration order, then
/// release.
pub struct RunCoordinator<'a> {
    config: &'a RunConfig,
    guard: &'a SafetyGuard,
    executor: Executor,
    audit: &'a mut AuditLog,
    stop: StopSignal,
    log: Logger,
    state: RunState,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(
        config: &'a RunConfig,
        guard: &'a SafetyGuard,
        executor: Executor,
        audit: &'a mut AuditLog,
    ) -> Self {
        Self {
            config,
            guard,
            executor,
            audit,
            stop: StopSignal::new(),
            log: Logger::default(),
            state: RunState::Idle,
        }
    }

    /// Stop flag checked before every section and every directory.
    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn logger(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Acquire the run lock, process every section, release the lock.
    ///
    /// # Errors
    ///
    /// Only lock acquisition can fail the run. Every section and directory
    /// problem ends up in the report and the audit log instead.
    pub fn run(&mut self) -> Result<RunReport> {
        self.transition(RunState::Acquiring);
        let lock = match RunLock::acquire(self.config.lock_path()) {
            Ok(lock) => lock,
            Err(err) => {
                self.audit.event(format!("run refused: {err}"));
                self.transition(RunState::Idle);
                return Err(err);
            }
        };

        self.transition(RunState::Running);
        self.audit.event(format!(
            "run started (pid {}, mode {}, {})",
            std::process::id(),
            mode_name(self.config.mode()),
            if self.executor.simulate() {
                "simulated"
            } else {
                "live"
            }
        ));

        let report = self.run_sections();

        self.audit.event(if report.interrupted {
            "run stopped early on request"
        } else {
            "run finished"
        });

        self.transition(RunState::Releasing);
        drop(lock);
        self.transition(RunState::Idle);

        Ok(report)
    }

    fn run_sections(&mut self) -> RunReport {
        let mut report = RunReport {
            simulated: self.executor.simulate(),
            ..RunReport::default()
        };

        let config = self.config;
        for section in config.sections() {
            if self.stop.requested() {
                report.interrupted = true;
                break;
            }

            let summary = self.run_section(section, &mut report.records);
            self.audit.summary(&summary);
            let interrupted = summary.outcome == SectionOutcome::Interrupted;
            report.sections.push(summary);
            if interrupted {
                report.interrupted = true;
                break;
            }
        }

        report
    }

    fn run_section(
        &mut self,
        section: &'a SectionConfig,
        records: &mut Vec<ActionRecord>,
    ) -> SectionSummary {
        let name = section.name();
        let root = section.root();
        let mut summary = SectionSummary::new(name, root, section.max_directories());

        if let Some(protection) = self.guard.protection(root) {
            summary.outcome =
                SectionOutcome::Skipped(format!("root is protected: {protection}"));
            return summary;
        }

        let mode = match self.action_mode(section) {
            Some(mode) => mode,
            None => {
                summary.outcome =
                    SectionOutcome::Skipped("no archive configured for relocation".to_string());
                return summary;
            }
        };

        let inventory = match section_directories(root, section.archive(), self.guard) {
            Ok(inventory) => inventory,
            Err(err) => {
                summary.outcome = SectionOutcome::Skipped(err.to_string());
                return summary;
            }
        };
        summary.found = inventory.len();

        let excess = select_excess(&inventory, quota_as_count(section.max_directories()));
        summary.excess = excess.len();
        if excess.is_empty() {
            summary.outcome = SectionOutcome::NoOp;
            return summary;
        }

        self.log.verbose(
            2,
            format!(
                "[{name}] {} directories, quota {}, {} over",
                inventory.len(),
                section.max_directories(),
                excess.len()
            ),
        );

        summary.outcome = SectionOutcome::Enforced;
        for entry in excess {
            if self.stop.requested() {
                summary.outcome = SectionOutcome::Interrupted;
                break;
            }

            let record = match self.guard.protection(&entry.path) {
                Some(protection) => {
                    ActionRecord::skipped(name, &entry.path, protection.to_string())
                }
                None => self.executor.apply(name, entry, mode),
            };

            summary.count(&record);
            self.audit.record(&record);
            records.push(record);
        }

        summary
    }

    fn action_mode(&self, section: &'a SectionConfig) -> Option<ActionMode<'a>> {
        match self.config.mode() {
            Mode::Remove => Some(ActionMode::Remove),
            Mode::Relocate => section.archive().map(ActionMode::Relocate),
        }
    }

    fn transition(&mut self, next: RunState) {
        self.log
            .verbose(2, format!("run state: {} -> {next}", self.state));
        self.state = next;
    }
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Remove => "remove",
        Mode::Relocate => "relocate",
    }
}
