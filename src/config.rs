//! Run configuration.
//!
//! The configuration is a TOML file describing the action mode, where the lock
//! and audit log live, which paths are off-limits, and the ordered list of
//! sections:
//!
//! ```toml
//! action = "relocate"          # or "remove"
//! simulate = false
//! lock_path = "/var/lock/dirquota.lock"
//! log_file = "/var/log/dirquota/dirquota.log"
//! excluded = ["/var/www/html/keep", "/var/www/**/cgi-bin"]
//!
//! [[section]]
//! name = "builds"
//! root = "/var/www/html/builds"
//! max_directories = 5
//! archive = "/var/www/html/builds/archive"
//! ```
//!
//! It is loaded once, validated, and then only read.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{QuotaError, Result};
use crate::quota::safety::{DEFAULT_ANCHORS, DEFAULT_ARCHIVE_DIR_NAME, ExcludedPathSet};
use crate::quota::SafetyGuard;


/// Lock location used when neither the file nor the CLI names one.
pub const DEFAULT_LOCK_PATH: &str = "/var/lock/dirquota.lock";

/// What happens to directories above a section's quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Delete them.
    #[default]
    Remove,
    /// Move them into the section's archive.
    Relocate,
}

/// One section: a directory whose immediate subdirectories are counted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    name: String,
    root: PathBuf,
    max_directories: u32,
    #[serde(default)]
    archive: Option<PathBuf>,
}

impl SectionConfig {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, max_directories: u32) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            max_directories,
            archive: None,
        }
    }

    /// Set the archive root (only used in relocate mode).
    pub fn with_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_directories(&self) -> u32 {
        self.max_directories
    }

    pub fn archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    action: Mode,
    #[serde(default)]
    simulate: bool,
    lock_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    archive_dir_name: Option<String>,
    anchors: Option<Vec<PathBuf>>,
    #[serde(default)]
    excluded: Vec<String>,
    #[serde(default, rename = "section")]
    sections: Vec<SectionConfig>,
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    mode: Mode,
    simulate: bool,
    lock_path: PathBuf,
    log_file: Option<PathBuf>,
    archive_dir_name: String,
    anchors: Vec<PathBuf>,
    excluded: Vec<String>,
    sections: Vec<SectionConfig>,
}

impl RunConfig {
    /// Creates a new builder for [`RunConfig`]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Read, parse and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| QuotaError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Parse and validate configuration text; `origin` is only used in errors.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self> {
        let parsed: RawConfig = toml::from_str(raw).map_err(|source| QuotaError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;

        let config = Self {
            mode: parsed.action,
            simulate: parsed.simulate,
            lock_path: parsed
                .lock_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_PATH)),
            log_file: parsed.log_file,
            archive_dir_name: parsed
                .archive_dir_name
                .unwrap_or_else(|| DEFAULT_ARCHIVE_DIR_NAME.to_string()),
            anchors: parsed
                .anchors
                .unwrap_or_else(|| DEFAULT_ANCHORS.iter().map(PathBuf::from).collect()),
            excluded: parsed.excluded,
            sections: parsed.sections,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn simulate(&self) -> bool {
        self.simulate
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn archive_dir_name(&self) -> &str {
        &self.archive_dir_name
    }

    pub fn anchors(&self) -> &[PathBuf] {
        &self.anchors
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn sections(&self) -> &[SectionConfig] {
        &self.sections
    }

    /// Override the lock location (from the command line).
    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    /// Override the audit log location (from the command line).
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Force simulation on; a dry run can never be turned back into a live
    /// one from the command line.
    pub fn force_simulate(mut self) -> Self {
        self.simulate = true;
        self
    }

    /// Build the [`SafetyGuard`] described by this configuration.
    pub fn safety_guard(&self) -> Result<SafetyGuard> {
        let excluded = ExcludedPathSet::new(&self.excluded)?;
        Ok(SafetyGuard::new(excluded)
            .with_anchors(&self.anchors)
            .with_archive_dir_name(&self.archive_dir_name))
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for section in &self.sections {
            let name = section.name.trim();
            if name.is_empty() {
                return Err(QuotaError::ConfigError(format!(
                    "section with root '{}' has an empty name",
                    section.root.display()
                )));
            }
            if !names.insert(name) {
                return Err(QuotaError::ConfigError(format!(
                    "section '{name}' is defined more than once"
                )));
            }
            require_absolute(&section.root, &format!("section '{name}' root"))?;

            if self.mode == Mode::Relocate {
                let archive = section.archive.as_deref().ok_or_else(|| {
                    QuotaError::ConfigError(format!(
                        "section '{name}' needs an `archive` path because action is \"relocate\""
                    ))
                })?;
                require_absolute(archive, &format!("section '{name}' archive"))?;
            }
        }

        require_absolute(&self.lock_path, "lock_path")?;
        if let Some(log_file) = &self.log_file {
            require_absolute(log_file, "log_file")?;
        }
        for anchor in &self.anchors {
            require_absolute(anchor, "anchor")?;
        }

        let name = self.archive_dir_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(QuotaError::ConfigError(format!(
                "archive_dir_name '{name}' must be a single path component"
            )));
        }

        // Compile patterns now so a bad glob fails before the lock is taken.
        ExcludedPathSet::new(&self.excluded)?;

        Ok(())
    }
}

fn require_absolute(path: &Path, what: &str) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(QuotaError::ConfigError(format!(
            "{what} '{}' must be an absolute path",
            path.display()
        )))
    }
}

/// Builder for [`RunConfig`], for programmatic use and tests.
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    mode: Mode,
    simulate: bool,
    lock_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    archive_dir_name: Option<String>,
    anchors: Option<Vec<PathBuf>>,
    excluded: Vec<String>,
    sections: Vec<SectionConfig>,
}

impl RunConfigBuilder {
    /// Set the action mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable simulation
    pub fn simulate(mut self, enabled: bool) -> Self {
        self.simulate = enabled;
        self
    }

    /// Set the lock file location
    pub fn lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Set the audit log location
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set the archive directory name
    pub fn archive_dir_name(mut self, name: impl Into<String>) -> Self {
        self.archive_dir_name = Some(name.into());
        self
    }

    /// Replace the protected anchors
    pub fn anchors<I, P>(mut self, anchors: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.anchors = Some(anchors.into_iter().map(Into::into).collect());
        self
    }

    /// Add an excluded path or pattern
    pub fn exclude(mut self, entry: impl Into<String>) -> Self {
        self.excluded.push(entry.into());
        self
    }

    /// Append a section
    pub fn section(mut self, section: SectionConfig) -> Self {
        self.sections.push(section);
        self
    }

    /// Build and validate the [`RunConfig`]
    pub fn build(self) -> Result<RunConfig> {
        let config = RunConfig {
            mode: self.mode,
            simulate: self.simulate,
            lock_path: self
                .lock_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_PATH)),
            log_file: self.log_file,
            archive_dir_name: self
                .archive_dir_name
                .unwrap_or_else(|| DEFAULT_ARCHIVE_DIR_NAME.to_string()),
            anchors: self
                .anchors
                .unwrap_or_else(|| DEFAULT_ANCHORS.iter().map(PathBuf::from).collect()),
            excluded: self.excluded,
            sections: self.sections,
        };
        config.validate()?;
        Ok(config)
    }
}
