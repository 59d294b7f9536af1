//! Workspace root discovery.

use log::{debug, trace};
use std::path::{Path, PathBuf};

/// Absolute form of `cwd` so the ancestor walk reaches the filesystem root.
pub(super) fn normalize_path(cwd: &Path) -> PathBuf {
    match cwd.canonicalize() {
        Ok(path) => path,
        Err(err) => {
            debug!("cannot canonicalize {}: {err}", cwd.display());
            std::path::absolute(cwd).unwrap_or_else(|_| cwd.to_path_buf())
        }
    }
}

/// Nearest directory at or above `cwd` holding one of `markers` as a file.
///
/// A directory that merely shares a marker's name does not count.
pub(super) fn find_workspace_root<S: AsRef<str>>(cwd: &Path, markers: &[S]) -> Option<PathBuf> {
    let mut dir = Some(cwd);
    while let Some(current) = dir {
        let found = markers
            .iter()
            .map(<S as AsRef<str>>::as_ref)
            .find(|marker| current.join(marker).is_file());
        if let Some(marker) = found {
            debug!("workspace marker {marker} found in {}", current.display());
            return Some(current.to_path_buf());
        }
        trace!("no workspace marker in {}", current.display());
        dir = current.parent();
    }
    None
}
