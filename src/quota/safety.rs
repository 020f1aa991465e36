//! Decides which absolute paths may ever be mutated.
//!
//! A path is protected when any of the following holds:
//! - it is one of the root-level anchors (by default `/`, `/var/www` and
//!   `/var/www/html`)
//! - it equals a literal entry of the [`ExcludedPathSet`]
//! - it matches one of the set's glob patterns
//! - its final component is the archive directory name
//!
//! Paths are normalized lexically before comparison; symlinks are never
//! resolved here.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{QuotaError, Result};
use crate::paths::normalize_path;

/// Anchors protected when the configuration does not name its own.
pub const DEFAULT_ANCHORS: [&str; 3] = ["/", "/var/www", "/var/www/html"];

/// Directory name that marks a section archive.
pub const DEFAULT_ARCHIVE_DIR_NAME: &str = "archive";

/// Why a path is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protection {
    /// One of the unconditional root-level anchors.
    Anchor(PathBuf),
    /// A literal entry of the excluded set.
    Excluded(PathBuf),
    /// A glob pattern of the excluded set.
    Pattern(String),
    /// The final component is the archive directory name.
    ArchiveDir(String),
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protection::Anchor(path) => write!(f, "protected anchor {}", path.display()),
            Protection::Excluded(path) => write!(f, "excluded path {}", path.display()),
            Protection::Pattern(pattern) => write!(f, "excluded by pattern {pattern}"),
            Protection::ArchiveDir(name) => write!(f, "archive directory '{name}'"),
        }
    }
}

#[derive(Debug, Clone)]
struct GlobPattern {
    original: String,
    compiled: Regex,
}

/// Absolute path literals and glob patterns that must never be mutated.
///
/// Entries containing `*`, `?` or `[` are compiled as globs: `*` and `?`
/// stay within one path component, `**` spans components. Everything else is
/// an exact path.
#[derive(Debug, Clone, Default)]
pub struct ExcludedPathSet {
    literals: BTreeSet<PathBuf>,
    patterns: Vec<GlobPattern>,
}

impl ExcludedPathSet {
    /// Build the set from configuration entries.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }

            if is_glob(entry) {
                set.patterns.push(GlobPattern {
                    original: entry.to_string(),
                    compiled: glob_to_regex(entry)?,
                });
            } else {
                set.literals.insert(normalize_path(entry));
            }
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.literals.len() + self.patterns.len()
    }

    fn matches(&self, normalized: &Path) -> Option<Protection> {
        if self.literals.contains(normalized) {
            return Some(Protection::Excluded(normalized.to_path_buf()));
        }

        let haystack = normalized.to_string_lossy();
        self.patterns
            .iter()
            .find(|pattern| pattern.compiled.is_match(&haystack))
            .map(|pattern| Protection::Pattern(pattern.original.clone()))
    }
}

/// Pure predicate over absolute paths; see the module docs for the rules.
#[derive(Debug, Clone)]
pub struct SafetyGuard {
    excluded: ExcludedPathSet,
    anchors: Vec<PathBuf>,
    archive_dir_name: OsString,
}

impl SafetyGuard {
    /// Guard with the default anchors and archive directory name.
    pub fn new(excluded: ExcludedPathSet) -> Self {
        Self {
            excluded,
            anchors: DEFAULT_ANCHORS.iter().map(PathBuf::from).collect(),
            archive_dir_name: OsString::from(DEFAULT_ARCHIVE_DIR_NAME),
        }
    }

    /// Replace the anchor set.
    ///
    /// The filesystem root is always kept, whatever the caller passes.
    pub fn with_anchors<I, P>(mut self, anchors: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut anchors: Vec<PathBuf> = anchors.into_iter().map(normalize_path).collect();
        let root = PathBuf::from("/");
        if !anchors.contains(&root) {
            anchors.push(root);
        }
        self.anchors = anchors;
        self
    }

    /// Replace the archive directory name.
    pub fn with_archive_dir_name(mut self, name: impl Into<OsString>) -> Self {
        self.archive_dir_name = name.into();
        self
    }

    pub fn anchors(&self) -> &[PathBuf] {
        &self.anchors
    }

    pub fn excluded(&self) -> &ExcludedPathSet {
        &self.excluded
    }

    /// Returns `true` if the final component of `path` is the archive
    /// directory name.
    pub fn is_archive_dir(&self, path: &Path) -> bool {
        normalize_path(path).file_name() == Some(self.archive_dir_name.as_os_str())
    }

    /// Returns `true` if `path` must never be mutated.
    pub fn is_protected(&self, path: &Path) -> bool {
        self.protection(path).is_some()
    }

    /// The first rule that protects `path`, if any.
    pub fn protection(&self, path: &Path) -> Option<Protection> {
        let normalized = normalize_path(path);

        if let Some(anchor) = self.anchors.iter().find(|anchor| **anchor == normalized) {
            return Some(Protection::Anchor(anchor.clone()));
        }

        if let Some(protection) = self.excluded.matches(&normalized) {
            return Some(protection);
        }

        match normalized.file_name() {
            Some(name) if name == self.archive_dir_name.as_os_str() => Some(
                Protection::ArchiveDir(self.archive_dir_name.to_string_lossy().into_owned()),
            ),
            // Only the root has no final component and it is always an anchor,
            // but stay closed if that ever changes.
            None => Some(Protection::Anchor(normalized)),
            _ => None,
        }
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new(ExcludedPathSet::default())
    }
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

/// Translate a shell-style glob into an anchored regex over `/`-separated
/// paths.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex_str = String::with_capacity(pattern.len() * 2);
    regex_str.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            '[' => {
                // Character class: copy through to the closing bracket.
                let close = chars[i + 1..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| QuotaError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: "unclosed '['".to_string(),
                    })?;
                regex_str.push('[');
                let mut class = &chars[i + 1..close];
                if let Some(('!', rest)) = class.split_first().map(|(c, rest)| (*c, rest)) {
                    regex_str.push('^');
                    class = rest;
                }
                for c in class {
                    if *c == '\\' || *c == '[' {
                        regex_str.push('\\');
                    }
                    regex_str.push(*c);
                }
                regex_str.push(']');
                i = close + 1;
            }
            c => {
                regex_str.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    // A trailing separator in the pattern should not make it unmatchable
    // against normalized paths.
    if regex_str.ends_with('/') && regex_str.len() > 2 {
        regex_str.pop();
    }
    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| QuotaError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}
