#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::TempDir;
use assert_fs::prelude::*;
use dirquota::cli::{Cli, Commands};
use dirquota::commands::execute_with_dir;
use dirquota::error::Result;
use filetime::FileTime;

/// Base mtime for generated directories; `d1` gets this plus one minute.
const BASE_MTIME: i64 = 1_700_000_000;

/// A sandbox holding section trees, a config file, lock and log locations.
pub struct Sandbox {
    dir: TempDir,
    sections: Vec<String>,
    settings: Vec<String>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            sections: Vec::new(),
            settings: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn child(&self, rel: &str) -> PathBuf {
        self.dir.child(rel).path().to_path_buf()
    }

    pub fn lock_path(&self) -> PathBuf {
        self.child("run/dirquota.lock")
    }

    pub fn log_path(&self) -> PathBuf {
        self.child("log/dirquota.log")
    }

    /// Create `d1..=dN` under `rel`, each with a file inside, `d1` the oldest.
    pub fn populate(&self, rel: &str, count: usize) -> PathBuf {
        let root = self.dir.child(rel);
        root.create_dir_all().unwrap();
        for i in 1..=count {
            let dir = root.child(format!("d{i}"));
            dir.child("payload.txt").write_str(&format!("d{i}")).unwrap();
            set_age_rank(dir.path(), i);
        }
        root.path().to_path_buf()
    }

    /// Add a top-level setting line, e.g. `action = "relocate"`.
    pub fn setting(mut self, line: impl Into<String>) -> Self {
        self.settings.push(line.into());
        self
    }

    pub fn section(mut self, name: &str, root: &Path, max: u32, archive: Option<&Path>) -> Self {
        let mut block = format!(
            "[[section]]\nname = \"{name}\"\nroot = \"{}\"\nmax_directories = {max}\n",
            root.display()
        );
        if let Some(archive) = archive {
            block.push_str(&format!("archive = \"{}\"\n", archive.display()));
        }
        self.sections.push(block);
        self
    }

    /// Write `dirquota.toml` with the lock and log inside the sandbox.
    pub fn write_config(&self) -> PathBuf {
        let mut body = format!(
            "lock_path = \"{}\"\nlog_file = \"{}\"\n",
            self.lock_path().display(),
            self.log_path().display()
        );
        for line in &self.settings {
            body.push_str(line);
            body.push('\n');
        }
        for block in &self.sections {
            body.push('\n');
            body.push_str(block);
        }
        let config = self.dir.child("dirquota.toml");
        config.write_str(&body).unwrap();
        config.path().to_path_buf()
    }

    /// Write the config and execute `command` from inside the sandbox.
    pub fn execute(&self, command: Commands) -> Result<()> {
        self.write_config();
        let cli = Cli::builder()
            .config("dirquota.toml")
            .quiet(true)
            .command(command)
            .build()?;
        execute_with_dir(&cli, Some(self.path()))
    }

    pub fn audit_log(&self) -> String {
        fs::read_to_string(self.log_path()).unwrap_or_default()
    }
}

/// Set an mtime so that lower ranks are older.
pub fn set_age_rank(path: &Path, rank: usize) {
    let mtime = FileTime::from_unix_time(BASE_MTIME + rank as i64 * 60, 0);
    filetime::set_file_mtime(path, mtime).unwrap();
}

/// Sorted names of the entries directly under `dir`.
pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
