use std::path::{Component, Path, PathBuf};

/// Normalize a path to be absolute and clean, without requiring it to exist.
///
/// This function:
/// - Converts relative paths to absolute using `base`
/// - Removes `.` and `..` components (`..` never climbs above the root)
/// - Drops trailing separators
/// - Does NOT resolve symlinks
pub(crate) fn normalize_path_from(path: impl AsRef<Path>, base: &Path) -> PathBuf {
    let path = path.as_ref();

    let absolute = if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    };

    let mut components: Vec<Component<'_>> = Vec::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else if components.is_empty() {
                    components.push(component);
                }
                // `/..` is `/`
            }
            Component::CurDir => continue,
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// [`normalize_path_from`] relative to the current directory.
pub(crate) fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    normalize_path_from(path, &base)
}
