//! Directory quota enforcement.
//!
//! A section is a directory whose immediate subdirectories are counted. When a
//! section holds more subdirectories than its quota allows, the oldest ones
//! (by modification time) are removed or relocated into the section's archive
//! until the count is back at the quota.
//!
//! The pieces, in the order a run uses them:
//!
//! - [`SafetyGuard`]: paths that must never be touched
//! - [`section_directories`]: snapshot of a section, oldest first, without
//!   its archive
//! - [`select_excess`]: which entries are over the quota
//! - [`Executor`]: performs (or simulates) one removal or relocation
//! - [`RunCoordinator`]: lock, sections in order, audit, release
//!
//! # Example
//!
//! ```no_run
//! use dirquota::audit::AuditLog;
//! use dirquota::config::{RunConfig, SectionConfig};
//! use dirquota::logging::Logger;
//! use dirquota::quota::{Executor, RunCoordinator};
//!
//! let config = RunConfig::builder()
//!     .lock_path("/tmp/dirquota.lock")
//!     .section(SectionConfig::new("builds", "/srv/www/builds", 5))
//!     .simulate(true)
//!     .build()?;
//! let guard = config.safety_guard()?;
//! let mut audit = AuditLog::console(Logger::default());
//! let executor = Executor::new(config.simulate(), &chrono::Local::now());
//!
//! let report = RunCoordinator::new(&config, &guard, executor, &mut audit).run()?;
//! println!("{} directories over quota", report.processed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod coordinator;
pub mod executor;
pub mod inventory;
pub mod record;
pub mod retention;
pub mod safety;

pub use coordinator::{RunCoordinator, RunReport, RunState};
pub use executor::{ActionMode, Executor};
pub use inventory::{DirectoryEntry, list_directories, section_directories};
pub use record::{Action, ActionRecord, SectionOutcome, SectionSummary};
pub use retention::{excess_count, select_excess};
pub use safety::{ExcludedPathSet, Protection, SafetyGuard};
