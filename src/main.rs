//! # dirquota CLI
//!
//! Keeps directory sections under a fixed number of subdirectories by
//! removing or archiving the oldest ones.
//!
//! ## Commands
//!
//! - **run**: Enforce every section's quota (`--dry-run` to simulate)
//! - **check**: Validate the configuration and show each section's state
//!
//! ## Quick Start
//!
//! ```bash
//! dirquota --config /etc/dirquota.toml check
//! dirquota --config /etc/dirquota.toml run --dry-run -v
//! dirquota --config /etc/dirquota.toml run
//! ```
//!
//! ## Environment Variables
//!
//! - `DIRQUOTA_CONFIG`: Configuration file (default: /etc/dirquota.toml)
//! - `DIRQUOTA_LOCK_PATH`: Override the lock file location
//! - `DIRQUOTA_LOG_FILE`: Override the audit log location
//! - `DIRQUOTA_VERBOSE`: Enable verbose output
//! - `DIRQUOTA_QUIET`: Silence all output except errors
//! - `DIRQUOTA_DRY_RUN`: Simulate `run`

use std::io::IsTerminal;

use dirquota::cli::Cli;

fn main() -> miette::Result<()> {
    miette::set_panic_hook();

    if std::io::stderr().is_terminal() {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::unicode_nocolor())
                    .with_context_lines(3),
            )
        }))?;
    } else {
        // cron mail and journald get plain text
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::none())
                    .with_context_lines(0),
            )
        }))?;
    }

    let cli = Cli::parse_args();

    dirquota::commands::execute(&cli).map_err(Into::into)
}
