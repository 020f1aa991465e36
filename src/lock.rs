//! Single-instance run lock.
//!
//! The lock is a file created with `O_EXCL` semantics that holds the owner's
//! PID. Its existence alone is the interlock: a second instance that finds it
//! refuses to start and never removes it. The owning instance removes it when
//! the [`RunLock`] guard is dropped, which covers normal returns, `?` early
//! exits and panics that unwind.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{QuotaError, Result};

/// Permissions for the lock file: owner-writable, readable by everyone so
/// operators can see which PID holds it.
#[cfg(unix)]
const LOCK_FILE_MODE: u32 = 0o644;

/// Guard for a held run lock.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create the lock file at `path`, creating its parent directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// [`QuotaError::LockHeld`] if the file already exists,
    /// [`QuotaError::LockError`] for any other failure.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| QuotaError::LockError {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut file = match open_exclusive(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(QuotaError::LockHeld {
                    path: path.to_path_buf(),
                    holder: Self::holder(path),
                });
            }
            Err(source) => {
                return Err(QuotaError::LockError {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        // From here on the file is ours; the guard removes it on any exit.
        let lock = Self {
            path: path.to_path_buf(),
        };

        set_lock_permissions(&file).map_err(|source| QuotaError::LockError {
            path: path.to_path_buf(),
            source,
        })?;
        writeln!(file, "{}", std::process::id())
            .and_then(|()| file.sync_all())
            .map_err(|source| QuotaError::LockError {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(lock)
    }

    /// PID recorded in an existing lock file, if it can be read.
    pub fn holder(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != ErrorKind::NotFound
        {
            eprintln!(
                "Warning: failed to remove lock file {}: {err}",
                self.path.display()
            );
        }
    }
}

#[cfg(unix)]
fn open_exclusive(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(LOCK_FILE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_exclusive(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// `mode()` at creation is filtered by the umask; set it explicitly.
#[cfg(unix)]
fn set_lock_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(LOCK_FILE_MODE))
}

#[cfg(not(unix))]
fn set_lock_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}
