use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use super::safety::SafetyGuard;
use crate::error::{QuotaError, Result};
use crate::paths::normalize_path;

/// One immediate child directory of a section root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub modified_at: SystemTime,
}

impl DirectoryEntry {
    pub fn new(path: impl Into<PathBuf>, modified_at: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified_at,
        }
    }

    /// Oldest first, ties broken by path so the order is deterministic.
    pub fn age_order(&self, other: &Self) -> Ordering {
        self.modified_at
            .cmp(&other.modified_at)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// List the immediate subdirectories of `root`, oldest first.
///
/// Regular files, symlinks (whatever they point at) and anything deeper than
/// one level are left out. Each call takes a fresh snapshot.
///
/// # Errors
///
/// [`QuotaError::NotADirectory`] when `root` is missing or not a directory,
/// [`QuotaError::IoError`] when it cannot be read.
pub fn list_directories(root: &Path) -> Result<Vec<DirectoryEntry>> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Err(QuotaError::NotADirectory(root.to_path_buf())),
        Err(source) if source.kind() == ErrorKind::NotFound => {
            return Err(QuotaError::NotADirectory(root.to_path_buf()));
        }
        Err(source) => {
            return Err(QuotaError::IoError {
                path: root.to_path_buf(),
                source,
            });
        }
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(|err| walk_error(root, err))?;

        // With `follow_links(false)` a symlink reports its own type.
        if !entry.file_type().is_dir() {
            continue;
        }

        let modified_at = entry
            .metadata()
            .map_err(|err| walk_error(entry.path(), err))?
            .modified()
            .map_err(|source| QuotaError::IoError {
                path: entry.path().to_path_buf(),
                source,
            })?;

        entries.push(DirectoryEntry::new(entry.into_path(), modified_at));
    }

    entries.sort_by(DirectoryEntry::age_order);
    Ok(entries)
}

/// The subdirectories of a section that count toward its quota, oldest first.
///
/// An archive kept inside the section holds earlier runs' output and is not
/// part of the section's content: the configured `archive` path and any entry
/// carrying the guard's archive directory name are left out.
///
/// # Errors
///
/// Same as [`list_directories`].
pub fn section_directories(
    root: &Path,
    archive: Option<&Path>,
    guard: &SafetyGuard,
) -> Result<Vec<DirectoryEntry>> {
    let archive = archive.map(normalize_path);
    let mut entries = list_directories(root)?;
    entries.retain(|entry| {
        !guard.is_archive_dir(&entry.path)
            && archive
                .as_deref()
                .is_none_or(|archive| normalize_path(&entry.path) != archive)
    });
    Ok(entries)
}

fn walk_error(path: &Path, err: walkdir::Error) -> QuotaError {
    let path = err.path().unwrap_or(path).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    QuotaError::IoError { path, source }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use filetime::FileTime;
    use tempfile::TempDir;

    use super::*;

    fn dir_with_age(root: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = root.join(name);
        fs::create_dir(&path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        filetime::set_file_mtime(&path, FileTime::from_system_time(mtime)).unwrap();
        path
    }

    #[test]
    fn test_lists_directories_oldest_first() {
        let temp = TempDir::new().unwrap();
        dir_with_age(temp.path(), "newest", 10);
        dir_with_age(temp.path(), "oldest", 3000);
        dir_with_age(temp.path(), "middle", 600);

        let entries = list_directories(temp.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["oldest", "middle", "newest"]);
    }

    #[test]
    fn test_ties_are_broken_by_path() {
        let temp = TempDir::new().unwrap();
        let mtime = FileTime::from_unix_time(1_700_000_000, 0);
        for name in ["b", "c", "a"] {
            let path = temp.path().join(name);
            fs::create_dir(&path).unwrap();
            filetime::set_file_mtime(&path, mtime).unwrap();
        }

        let entries = list_directories(temp.path()).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                temp.path().join("a"),
                temp.path().join("b"),
                temp.path().join("c")
            ]
        );
    }

    #[test]
    fn test_skips_files_and_nested_directories() {
        let temp = TempDir::new().unwrap();
        let top = dir_with_age(temp.path(), "top", 100);
        fs::create_dir(top.join("nested")).unwrap();
        fs::write(temp.path().join("file.txt"), b"not a directory").unwrap();

        let entries = list_directories(temp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, top);
    }

    #[cfg(unix)]
    #[test]
    fn test_skips_symlinks() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("file"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link-to-dir")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("file"), temp.path().join("link-to-file"))
            .unwrap();
        dir_with_age(temp.path(), "real", 5);

        let entries = list_directories(temp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.ends_with("real"));
    }

    #[test]
    fn test_missing_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(
            list_directories(&missing),
            Err(QuotaError::NotADirectory(path)) if path == missing
        ));
    }

    #[test]
    fn test_file_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            list_directories(&file),
            Err(QuotaError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_section_directories_leave_out_archives() {
        let temp = TempDir::new().unwrap();
        dir_with_age(temp.path(), "archive", 9000);
        let stash = dir_with_age(temp.path(), "_stash", 8000);
        let kept = dir_with_age(temp.path(), "d1", 100);
        let guard = SafetyGuard::default();

        assert_eq!(list_directories(temp.path()).unwrap().len(), 3);

        let entries = section_directories(temp.path(), Some(&stash), &guard).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![kept.clone()]);

        // Without a configured archive only the archive name is left out.
        let entries = section_directories(temp.path(), None, &guard).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![stash, kept]);
    }

    #[test]
    fn test_each_call_is_a_fresh_snapshot() {
        let temp = TempDir::new().unwrap();
        dir_with_age(temp.path(), "one", 100);
        let first = list_directories(temp.path()).unwrap();
        dir_with_age(temp.path(), "two", 50);
        let second = list_directories(temp.path()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }
}
