//! Implementation of dirquota subcommands.
//!
//! The main entry point is the [`execute`] function which loads the
//! configuration, applies command-line overrides and dispatches to the
//! appropriate command handler.
//!
//! # Commands
//!
//! - [`Run`]: enforce every section's quota under the run lock
//! - [`check`]: validate the configuration and print each section's state
//!
//! # Example
//!
//! ```no_run
//! use dirquota::cli::{Cli, Commands};
//! use dirquota::commands;
//!
//! let cli = Cli::builder()
//!     .config("/etc/dirquota.toml")
//!     .command(Commands::Run { dry_run: true })
//!     .build()?;
//!
//! commands::execute(&cli)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};

use crate::cli::{Cli, Commands};
use crate::config::RunConfig;
use crate::error::{QuotaError, Result};
use crate::logging::Logger;
use crate::paths::normalize_path_from;

mod check;
mod run;

pub use check::{SectionStatus, check, section_status};
pub use run::{Run, RunBuilder};


/// Execute commands based on the parsed CLI arguments.
pub fn execute(cli: &Cli) -> Result<()> {
    execute_with_dir(cli, None)
}

/// Execute commands with an explicit working directory.
///
/// Relative paths given on the command line are resolved against
/// `working_dir` (the process's current directory when `None`).
pub fn execute_with_dir(cli: &Cli, working_dir: Option<&Path>) -> Result<()> {
    let opts = cli.global_opts();
    let quiet = opts.quiet();
    let verbose = if quiet { 0 } else { opts.verbose() };
    let log = Logger::new(verbose, quiet);

    let current_dir = if let Some(dir) = working_dir {
        dir.to_path_buf()
    } else {
        std::env::current_dir().map_err(|source| QuotaError::IoError {
            path: PathBuf::from("."),
            source,
        })?
    };

    let config = load_config(cli, &current_dir)?;
    log.verbose(
        2,
        format!(
            "loaded {} section(s) from {}",
            config.sections().len(),
            opts.config_path_from(&current_dir).display()
        ),
    );

    match cli.command() {
        Commands::Run { dry_run } => Run::builder()
            .config(&config)
            .dry_run(*dry_run)
            .logger(log)
            .build()?
            .run()
            .map(|_| ()),
        Commands::Check => check(&config, log),
    }
}

/// Load the configuration file named on the command line and apply the
/// lock and log overrides.
pub fn load_config(cli: &Cli, current_dir: &Path) -> Result<RunConfig> {
    let opts = cli.global_opts();
    let mut config = RunConfig::load(&opts.config_path_from(current_dir))?;

    if let Some(lock_path) = opts.lock_path() {
        config = config.with_lock_path(normalize_path_from(lock_path, current_dir));
    }
    if let Some(log_file) = opts.log_file() {
        config = config.with_log_file(normalize_path_from(log_file, current_dir));
    }

    Ok(config)
}
