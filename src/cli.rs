//! Command-line interface definitions for dirquota.
//!
//! This module defines the CLI structure using clap. The main entry point is
//! the [`Cli`] struct.
//!
//! # Example
//!
//! ```no_run
//! use dirquota::cli::{Cli, Commands};
//!
//! let cli = Cli::parse_args();
//!
//! match cli.command() {
//!     Commands::Run { dry_run } => println!("run, dry run: {dry_run}"),
//!     Commands::Check => println!("checking configuration"),
//! }
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::{QuotaError, Result};
use crate::paths::normalize_path_from;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dirquota.toml";

/// Main command-line interface for dirquota.
///
/// Global options apply to every subcommand; the subcommand picks what to do
/// with the loaded configuration.
#[derive(Debug, Parser)]
#[command(
    name = "dirquota",
    bin_name = "dirquota",
    author,
    version,
    about = "Keep directory sections under a fixed number of subdirectories",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Global options that apply to all dirquota commands.
#[derive(Debug, Parser)]
pub struct GlobalOpts {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        default_value = DEFAULT_CONFIG_PATH,
        env = "DIRQUOTA_CONFIG"
    )]
    config: PathBuf,

    /// Override the lock file location from the configuration
    #[arg(long, global = true, env = "DIRQUOTA_LOCK_PATH")]
    lock_path: Option<PathBuf>,

    /// Override the audit log location from the configuration
    #[arg(long, global = true, env = "DIRQUOTA_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Enable verbose output (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, env = "DIRQUOTA_VERBOSE")]
    verbose: u8,

    /// Silence all output except for errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        env = "DIRQUOTA_QUIET"
    )]
    quiet: bool,
}

impl GlobalOpts {
    /// Get the configuration file path as given
    pub fn config(&self) -> &Path {
        &self.config
    }

    /// Configuration path resolved against `base` when relative
    pub fn config_path_from(&self, base: &Path) -> PathBuf {
        normalize_path_from(&self.config, base)
    }

    /// Get the lock path override
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    /// Get the log file override
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Get the verbose level
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

impl Cli {
    /// Get the global options
    pub fn global_opts(&self) -> &GlobalOpts {
        &self.global_opts
    }

    /// Get the command
    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Create a builder for programmatic construction
    pub fn builder() -> CliBuilder {
        CliBuilder::default()
    }

    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Builder for [`Cli`]
#[derive(Debug, Default)]
pub struct CliBuilder {
    config: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    verbose: u8,
    quiet: bool,
    command: Option<Commands>,
}

impl CliBuilder {
    /// Set the configuration file
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// Set the lock path override
    pub fn lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Set the log file override
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set the verbose level
    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Enable quiet mode
    pub fn quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    /// Set the command
    pub fn command(mut self, command: Commands) -> Self {
        self.command = Some(command);
        self
    }

    /// Build the Cli instance
    pub fn build(self) -> Result<Cli> {
        let command = self
            .command
            .ok_or_else(|| QuotaError::ConfigError("Command is required".to_string()))?;

        Ok(Cli {
            global_opts: GlobalOpts {
                config: self
                    .config
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
                lock_path: self.lock_path,
                log_file: self.log_file,
                verbose: self.verbose,
                quiet: self.quiet,
            },
            command,
        })
    }
}

/// Available dirquota subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Enforce every section's quota
    ///
    /// Takes the run lock, walks the sections in configuration order and
    /// removes or relocates the oldest subdirectories of any section above
    /// its quota. Every decision is written to the audit log.
    Run {
        /// Report what would happen without touching the filesystem
        #[arg(long, env = "DIRQUOTA_DRY_RUN")]
        dry_run: bool,
    },

    /// Validate the configuration and show each section's state
    ///
    /// Does not take the lock and never changes anything.
    Check,
}
