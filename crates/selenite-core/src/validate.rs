//! Integrity checking for object directories.
//!
//! Single objects are checked by their registered validate handler, which
//! recurses through [`ValidateContext::validate_child`]. Whole staging
//! directories are swept by [`validate_directory`], which finds every
//! descriptor-bearing directory, keeps only the top-level ones (children
//! are their parents' business), and checks each.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::CoreResult;
use crate::object::{is_object_dir, read_object_type};
use crate::read::{read_object_with, ReadOptions};
use crate::registry::resolve_validate;

/// Options threaded through one validation pass.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Additionally load each top-level object after its structural check,
    /// which catches payload corruption the cheap checks miss.
    pub attempt_load: bool,
    /// Read options used by those loads.
    pub read: ReadOptions,
}

/// Per-call state handed to validate handlers.
pub struct ValidateContext {
    options: ValidateOptions,
}

impl ValidateContext {
    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// Validate a nested child object by its own descriptor.
    pub fn validate_child(&self, path: &Path) -> CoreResult<()> {
        dispatch_validate(path, self)
    }
}

/// Validate one object directory with default options.
pub fn validate_object(path: &Path) -> CoreResult<()> {
    validate_object_with(path, ValidateOptions::default())
}

/// Validate one object directory.
pub fn validate_object_with(path: &Path, options: ValidateOptions) -> CoreResult<()> {
    let ctx = ValidateContext { options };
    dispatch_validate(path, &ctx)
}

fn dispatch_validate(path: &Path, ctx: &ValidateContext) -> CoreResult<()> {
    let type_name = read_object_type(path)?;
    let handler = resolve_validate(&type_name)?;
    handler(path, &type_name, ctx).map_err(|err| {
        err.context(format!(
            "invalid '{type_name}' object at {}",
            path.display()
        ))
    })
}

/// Validate every top-level object under `root`.
///
/// Returns the absolute paths of the objects validated, in walk order. The
/// first failing object aborts the sweep with its error.
pub fn validate_directory(root: &Path) -> CoreResult<Vec<PathBuf>> {
    validate_directory_with(root, ValidateOptions::default())
}

/// Validate every top-level object under `root` with explicit options.
pub fn validate_directory_with(root: &Path, options: ValidateOptions) -> CoreResult<Vec<PathBuf>> {
    let mut object_dirs = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_dir() && is_object_dir(entry.path()) {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                object_dirs.push(rel.to_path_buf());
            }
        }
    }
    let tops = top_level_dirs(object_dirs);

    let ctx = ValidateContext {
        options: options.clone(),
    };
    let mut validated = Vec::with_capacity(tops.len());
    for rel in tops {
        let path = root.join(&rel);
        dispatch_validate(&path, &ctx)?;
        if options.attempt_load {
            read_object_with(&path, options.read.clone())
                .map_err(|err| err.context(format!("failed to load {}", path.display())))?;
        }
        validated.push(path);
    }
    debug!(root = %root.display(), count = validated.len(), "validated directory");
    Ok(validated)
}

/// Keep only the directories not nested inside an earlier one.
///
/// Sorting by path components (not by the joined string) guarantees every
/// descendant sorts directly after its ancestor, so a single
/// last-seen-top prefix test suffices. A plain string sort would not: with
/// bytes below `/` in play, `a!b` lands between `a` and `a/b`.
fn top_level_dirs(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.sort_by(|a, b| a.components().cmp(b.components()));
    let mut tops: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if let Some(last) = tops.last() {
            if dir.starts_with(last) {
                continue;
            }
        }
        tops.push(dir);
    }
    tops
}
