//! Error types for dirquota.
//!
//! This module defines all error types used throughout dirquota, using a
//! combination of `thiserror` for ergonomic error definitions and `miette`
//! for rich diagnostic output.
//!
//! # Error Handling Strategy
//!
//! - All errors derive from [`QuotaError`]
//! - Only configuration failures and a held run lock ever reach `main`; every
//!   per-section and per-directory failure is absorbed into the audit log
//! - Errors are automatically converted to `miette::Result` for CLI output
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use dirquota::error::{QuotaError, Result};
//!
//! fn check_root(path: &Path) -> Result<()> {
//!     if !path.is_dir() {
//!         return Err(QuotaError::NotADirectory(path.to_path_buf()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error types that can occur in dirquota operations
#[derive(Error, Debug, Diagnostic)]
pub enum QuotaError {
    /// File system I/O error.
    ///
    /// Used for scans, deletions, renames and archive-root creation. Inside a
    /// run these are attached to the affected section or directory instead of
    /// aborting.
    #[error("I/O error accessing '{path}'")]
    #[diagnostic(code(dirquota::io_error))]
    IoError {
        /// The path that caused the I/O error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A section root (or other path that must be a directory) is not one.
    #[error("'{0}' does not exist or is not a directory")]
    #[diagnostic(
        code(dirquota::path::not_a_directory),
        help("Check the section's `root` setting in the configuration file.")
    )]
    NotADirectory(
        /// The offending path
        PathBuf,
    ),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file '{path}'")]
    #[diagnostic(
        code(dirquota::config::read_error),
        help("Pass an existing file with --config or DIRQUOTA_CONFIG.")
    )]
    ConfigRead {
        /// The configuration path that was requested
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected layout.
    #[error("Failed to parse configuration file '{path}'")]
    #[diagnostic(code(dirquota::config::parse_error))]
    ConfigParse {
        /// The configuration path that was parsed
        path: PathBuf,
        /// The underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// The configuration parsed but violates a rule (relative path, missing
    /// archive for relocation, duplicate section name, ...).
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(dirquota::config::error),
        help("Check the required configuration parameters.")
    )]
    ConfigError(
        /// Description of the configuration error
        String,
    ),

    /// An excluded-path glob pattern could not be compiled.
    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    #[diagnostic(
        code(dirquota::safety::invalid_pattern),
        help("Patterns support `*`, `**` and `?` wildcards over absolute paths.")
    )]
    InvalidPattern {
        /// The pattern as written in the configuration
        pattern: String,
        /// Why it failed to compile
        message: String,
    },

    /// Another instance holds the run lock.
    ///
    /// The lock is never removed by the instance that detects it; it is
    /// assumed to belong to a live run.
    #[error("Another run is in progress: lock file '{path}' exists{}", holder_suffix(.holder))]
    #[diagnostic(
        code(dirquota::lock::held),
        help(
            "Wait for the other run to finish. If no dirquota process is alive, remove the lock \
             file manually."
        )
    )]
    LockHeld {
        /// Location of the existing lock file
        path: PathBuf,
        /// PID recorded in the lock file, when it could be read
        holder: Option<u32>,
    },

    /// The run lock could not be created for a reason other than contention.
    #[error("Failed to create lock file '{path}'")]
    #[diagnostic(
        code(dirquota::lock::error),
        help("Ensure the lock directory exists or can be created, and is writable.")
    )]
    LockError {
        /// Location of the lock file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

fn holder_suffix(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!(" (held by pid {pid})"),
        None => String::new(),
    }
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, QuotaError>;
