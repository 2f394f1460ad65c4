//! Filesystem helpers: lexical path normalization and directory cloning.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::CoreResult;

/// How a dedup hit materializes the duplicate directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStrategy {
    /// Byte-for-byte file copies.
    Copy,
    /// Hard links, falling back to copies where linking fails (for example
    /// across filesystems).
    #[default]
    Hardlink,
    /// Absolute symbolic links.
    Symlink,
    /// Symbolic links relative to the new file's parent, so the pair of
    /// directories can move together.
    RelativeSymlink,
}

/// Make a path absolute and lexically normalized, without touching the
/// filesystem beyond reading the working directory.
///
/// `.` components drop out and `..` pops the previous component. Symlinks
/// are deliberately not resolved; dedup wants the path as the caller spelled
/// it, anchored.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize(&joined))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, as the kernel treats it.
                let popped = out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `target` relative to `base` (both absolute and normalized).
pub fn relative_to(base: &Path, target: &Path) -> PathBuf {
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let shared = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in shared..base_parts.len() {
        out.push("..");
    }
    for part in &target_parts[shared..] {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Reproduce one file at `to` according to the strategy.
pub fn clone_file(from: &Path, to: &Path, strategy: CloneStrategy) -> CoreResult<()> {
    match strategy {
        CloneStrategy::Copy => {
            fs::copy(from, to)?;
        }
        CloneStrategy::Hardlink => {
            if fs::hard_link(from, to).is_err() {
                warn!(
                    from = %from.display(),
                    to = %to.display(),
                    "hard link failed, copying instead"
                );
                fs::copy(from, to)?;
            }
        }
        CloneStrategy::Symlink => {
            let target = absolutize(from)?;
            std::os::unix::fs::symlink(target, to)?;
        }
        CloneStrategy::RelativeSymlink => {
            let target = absolutize(from)?;
            let parent = to.parent().unwrap_or_else(|| Path::new(""));
            let base = absolutize(parent)?;
            std::os::unix::fs::symlink(relative_to(&base, &target), to)?;
        }
    }
    Ok(())
}

/// Reproduce a whole directory tree at `to`, file by file.
///
/// Directories are always real directories; only regular files are linked or
/// copied per the strategy.
pub fn clone_directory(from: &Path, to: &Path, strategy: CloneStrategy) -> CoreResult<()> {
    fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            clone_file(entry.path(), &dest, strategy)?;
        }
    }
    Ok(())
}
