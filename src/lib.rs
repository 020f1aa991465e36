//! # dirquota
//!
//! Keeps directory "sections" under a fixed number of immediate
//! subdirectories. When a section holds more than its quota, the oldest
//! subdirectories are removed or moved into the section's archive.
//!
//! ## Overview
//!
//! dirquota is meant to run from cron or a systemd timer over directories that
//! accumulate dated subdirectories (build outputs, report drops, uploads). A
//! single run takes a system-wide lock, walks the configured sections in
//! order, and writes every decision to an append-only audit log.
//!
//! ## Key Features
//!
//! - **Oldest first**: excess is always the oldest directories by mtime
//! - **Protected paths**: anchors, excluded paths, glob patterns and the
//!   archive directory itself are never touched
//! - **Simulation**: dry runs report the exact targets a live run would use
//! - **Single instance**: a PID lock file refuses concurrent runs and is
//!   released on every exit path, including termination signals
//!
//! ## Architecture
//!
//! - [`cli`]: Command-line interface definitions using clap
//! - [`commands`]: Implementation of the `run` and `check` subcommands
//! - [`config`]: TOML run configuration and validation
//! - [`quota`]: Inventory, retention, safety and execution of a run
//! - [`audit`]: Append-only audit log
//! - [`lock`]: Single-instance run lock
//! - [`signals`]: Termination signals as a stop request
//! - [`error`]: Error types and handling with thiserror + miette
//!
//! Internal modules (not part of the public API):
//! - `paths`: Lexical path normalization
//! - `timestamp`: Log and archive-name timestamps
//!
//! ## Usage
//!
//! ```bash
//! # See what would happen
//! dirquota --config /etc/dirquota.toml run --dry-run
//! # Enforce
//! dirquota --config /etc/dirquota.toml run
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use dirquota::cli::{Cli, Commands};
//! use dirquota::commands;
//!
//! let cli = Cli::builder()
//!     .config("/etc/dirquota.toml")
//!     .verbose(1)
//!     .command(Commands::Check)
//!     .build()?;
//!
//! commands::execute(&cli)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! The crate uses a combination of:
//! - `thiserror` for strongly-typed errors
//! - `miette` for rich diagnostic output in CLI
//!
//! Only configuration and lock errors fail a run; everything that goes wrong
//! for a single section or directory is reported and the run moves on.

// Re-export public modules for library usage
pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod quota;
pub mod signals;

// Internal modules
mod paths;
mod timestamp;
