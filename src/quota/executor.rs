//! Performs the configured action on a single directory.
//!
//! Every call touches exactly one directory and turns every failure into an
//! [`ActionRecord`] carrying the error, so one bad entry never stops the run.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use super::inventory::DirectoryEntry;
use super::record::{Action, ActionRecord};
use crate::timestamp::collision_suffix;

/// Counter suffixes tried after the timestamped name is taken.
const MAX_COUNTER_SUFFIX: u32 = 999;

/// What to do with an excess directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode<'a> {
    /// Delete the directory tree.
    Remove,
    /// Move the directory into the given archive root.
    Relocate(&'a Path),
}

/// Applies an [`ActionMode`] to directory entries, live or simulated.
#[derive(Debug, Clone)]
pub struct Executor {
    simulate: bool,
    suffix: String,
    /// Targets handed out by simulated relocations; a live move occupies
    /// them on disk instead.
    planned: HashSet<PathBuf>,
}

impl Executor {
    /// `started_at` stamps archive names that collide; it is fixed for the
    /// whole run so simulated and live targets agree.
    pub fn new<Tz: TimeZone>(simulate: bool, started_at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            simulate,
            suffix: collision_suffix(started_at),
            planned: HashSet::new(),
        }
    }

    pub fn simulate(&self) -> bool {
        self.simulate
    }

    /// Apply `mode` to `entry` and describe what happened.
    pub fn apply(
        &mut self,
        section: &str,
        entry: &DirectoryEntry,
        mode: ActionMode<'_>,
    ) -> ActionRecord {
        match mode {
            ActionMode::Remove => self.remove(section, &entry.path),
            ActionMode::Relocate(archive) => self.relocate(section, &entry.path, archive),
        }
    }

    /// Where `source` would land inside `archive`.
    ///
    /// The plain base name is used when free. Otherwise the run's
    /// `_YYYYMMDD-HHMMSS` suffix is appended, and if that is taken too, a
    /// `-N` counter. Names already planned by earlier simulated relocations
    /// of this run count as taken. Returns `None` for a path without a final
    /// component or when every candidate name is taken.
    pub fn relocation_target(&self, archive: &Path, source: &Path) -> Option<PathBuf> {
        let name = source.file_name()?;
        let taken =
            |candidate: &PathBuf| self.planned.contains(candidate) || occupied(candidate);

        let plain = archive.join(name);
        if !taken(&plain) {
            return Some(plain);
        }

        let mut stamped = name.to_os_string();
        stamped.push(&self.suffix);
        let candidate = archive.join(&stamped);
        if !taken(&candidate) {
            return Some(candidate);
        }

        (1..=MAX_COUNTER_SUFFIX)
            .map(|n| {
                let mut numbered: OsString = stamped.clone();
                numbered.push(format!("-{n}"));
                archive.join(numbered)
            })
            .find(|candidate| !taken(candidate))
    }

    fn remove(&self, section: &str, source: &Path) -> ActionRecord {
        if self.simulate {
            return ActionRecord::new(section, source, Action::WouldClean);
        }

        if let Err(error) = ensure_real_directory(source) {
            return ActionRecord::failed(section, source, None, error);
        }

        match fs::remove_dir_all(source) {
            Ok(()) => ActionRecord::new(section, source, Action::Cleaned),
            Err(err) => {
                ActionRecord::failed(section, source, None, format!("remove failed: {err}"))
            }
        }
    }

    fn relocate(&mut self, section: &str, source: &Path, archive: &Path) -> ActionRecord {
        let Some(target) = self.relocation_target(archive, source) else {
            return ActionRecord::failed(
                section,
                source,
                None,
                format!("no free target name in {}", archive.display()),
            );
        };

        if self.simulate {
            self.planned.insert(target.clone());
            return ActionRecord::new(section, source, Action::WouldArchive).with_target(target);
        }

        if let Err(error) = ensure_real_directory(source) {
            return ActionRecord::failed(section, source, Some(&target), error);
        }

        if let Err(err) = fs::create_dir_all(archive) {
            return ActionRecord::failed(
                section,
                source,
                Some(&target),
                format!("cannot create archive root {}: {err}", archive.display()),
            );
        }

        // A plain rename: it either moves the whole tree or leaves it where it
        // was. Cross-device moves fail here instead of degrading to a copy.
        match fs::rename(source, &target) {
            Ok(()) => ActionRecord::new(section, source, Action::Archived).with_target(target),
            Err(err) => ActionRecord::failed(
                section,
                source,
                Some(&target),
                format!("move failed: {err}"),
            ),
        }
    }
}

/// True when anything (including a dangling symlink) sits at `path`.
///
/// A missing parent also means free: creating the archive root will then
/// succeed or fail on its own. Any other error counts as occupied so a target
/// is never picked blindly.
fn occupied(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(err) => !matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory),
    }
}

/// The scan and the action are separate steps; refuse to act if the entry was
/// swapped for something else in between.
fn ensure_real_directory(path: &Path) -> Result<(), String> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err("no longer a directory".to_string()),
        Err(err) => Err(format!("cannot inspect directory: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 9).unwrap()
    }

    fn entry(path: PathBuf) -> DirectoryEntry {
        DirectoryEntry::new(path, SystemTime::now())
    }

    fn make_dir(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        fs::create_dir_all(path.join("inner")).unwrap();
        fs::write(path.join("inner/file.txt"), name).unwrap();
        path
    }

    #[test]
    fn test_simulated_remove_leaves_directory() {
        let temp = TempDir::new().unwrap();
        let dir = make_dir(temp.path(), "d1");

        let mut executor = Executor::new(true, &fixed_time());
        let record = executor.apply("s", &entry(dir.clone()), ActionMode::Remove);

        assert_eq!(record.action, Action::WouldClean);
        assert!(record.target.is_none());
        assert!(dir.exists());
    }

    #[test]
    fn test_live_remove_deletes_tree() {
        let temp = TempDir::new().unwrap();
        let dir = make_dir(temp.path(), "d1");

        let mut executor = Executor::new(false, &fixed_time());
        let record = executor.apply("s", &entry(dir.clone()), ActionMode::Remove);

        assert_eq!(record.action, Action::Cleaned);
        assert!(!record.is_failure());
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_of_vanished_directory_is_reported() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("gone");

        let mut executor = Executor::new(false, &fixed_time());
        let record = executor.apply("s", &entry(gone), ActionMode::Remove);

        assert!(record.is_failure());
        assert_eq!(record.action, Action::Skip);
    }

    #[test]
    fn test_relocation_target_without_collision() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        let executor = Executor::new(true, &fixed_time());

        let target = executor.relocation_target(&archive, Path::new("/srv/builds/d1"));
        assert_eq!(target, Some(archive.join("d1")));
    }

    #[test]
    fn test_relocation_target_with_collision_gets_timestamp() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        fs::create_dir_all(archive.join("d1")).unwrap();
        let executor = Executor::new(true, &fixed_time());

        let target = executor.relocation_target(&archive, Path::new("/srv/builds/d1"));
        assert_eq!(target, Some(archive.join("d1_20240517-134509")));
    }

    #[test]
    fn test_relocation_target_with_stamped_collision_gets_counter() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        fs::create_dir_all(archive.join("d1")).unwrap();
        fs::create_dir_all(archive.join("d1_20240517-134509")).unwrap();
        fs::write(archive.join("d1_20240517-134509-1"), b"file in the way").unwrap();
        let executor = Executor::new(true, &fixed_time());

        let target = executor.relocation_target(&archive, Path::new("/srv/builds/d1"));
        assert_eq!(target, Some(archive.join("d1_20240517-134509-2")));
    }

    #[test]
    fn test_simulated_and_live_relocation_agree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("section");
        let archive = temp.path().join("archive");
        let dir = make_dir(&root, "d1");
        fs::create_dir_all(archive.join("d1")).unwrap();

        let simulated = Executor::new(true, &fixed_time()).apply(
            "s",
            &entry(dir.clone()),
            ActionMode::Relocate(&archive),
        );
        let live = Executor::new(false, &fixed_time()).apply(
            "s",
            &entry(dir.clone()),
            ActionMode::Relocate(&archive),
        );

        assert_eq!(simulated.action, Action::WouldArchive);
        assert_eq!(live.action, Action::Archived);
        assert_eq!(simulated.target, live.target);
        assert!(!dir.exists());
        assert!(archive.join("d1_20240517-134509/inner/file.txt").exists());
        assert!(archive.join("d1").exists());
    }

    #[test]
    fn test_live_relocation_creates_archive_root() {
        let temp = TempDir::new().unwrap();
        let dir = make_dir(temp.path(), "d1");
        let archive = temp.path().join("nested/archive");

        let record = Executor::new(false, &fixed_time()).apply(
            "s",
            &entry(dir.clone()),
            ActionMode::Relocate(&archive),
        );

        assert_eq!(record.action, Action::Archived);
        assert_eq!(record.target, Some(archive.join("d1")));
        assert!(archive.join("d1/inner/file.txt").exists());
    }

    #[test]
    fn test_uncreatable_archive_root_leaves_directory() {
        let temp = TempDir::new().unwrap();
        let dir = make_dir(temp.path(), "d1");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"a file where the archive parent should be").unwrap();
        let archive = blocker.join("archive");

        let record = Executor::new(false, &fixed_time()).apply(
            "s",
            &entry(dir.clone()),
            ActionMode::Relocate(&archive),
        );

        assert!(record.is_failure());
        assert!(record.error.as_deref().unwrap().contains("cannot create archive root"));
        assert!(dir.join("inner/file.txt").exists());
    }

    #[test]
    fn test_simulation_reserves_planned_targets() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        let first = make_dir(&temp.path().join("a"), "build");
        let second = make_dir(&temp.path().join("b"), "build");

        let mut simulated = Executor::new(true, &fixed_time());
        let planned: Vec<_> = [&first, &second]
            .into_iter()
            .map(|dir| {
                simulated
                    .apply("s", &entry(dir.clone()), ActionMode::Relocate(&archive))
                    .target
            })
            .collect();

        let mut live = Executor::new(false, &fixed_time());
        let done: Vec<_> = [&first, &second]
            .into_iter()
            .map(|dir| {
                live.apply("s", &entry(dir.clone()), ActionMode::Relocate(&archive))
                    .target
            })
            .collect();

        assert_eq!(
            planned,
            [
                Some(archive.join("build")),
                Some(archive.join("build_20240517-134509"))
            ]
        );
        assert_eq!(planned, done);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_swapped_in_is_not_followed() {
        let temp = TempDir::new().unwrap();
        let outside = make_dir(temp.path(), "outside");
        let link = temp.path().join("d1");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let record = Executor::new(false, &fixed_time()).apply(
            "s",
            &entry(link.clone()),
            ActionMode::Remove,
        );

        assert!(record.is_failure());
        assert!(outside.join("inner/file.txt").exists());
    }
}
