//! Era-aware validation of whole directory trees.
//!
//! Current-era stores mark every object directory with an `OBJECT`
//! descriptor file; the legacy staging layout has none and is audited
//! through its sidecar metadata documents instead. [`validate_any`] sniffs
//! which era a tree belongs to and runs the matching sweep.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use selenite_core::{is_object_dir, validate_directory_with, ValidateOptions};
use selenite_stage::{audit_directory, AuditOptions};

use crate::error::{SdkError, SdkResult};

/// Validate a directory tree of either era, without loading payloads.
pub fn validate_any(root: &Path) -> SdkResult<Vec<PathBuf>> {
    validate_any_with(root, false)
}

/// Validate a directory tree of either era.
///
/// With `attempt_load` set, every top-level object is also read back in
/// full after the structural checks, which catches payload corruption the
/// cheap checks miss.
///
/// Returns the locations that passed: object directories for the current
/// era, metadata document files for the legacy one.
pub fn validate_any_with(root: &Path, attempt_load: bool) -> SdkResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SdkError::MissingRoot(root.to_path_buf()));
    }
    if contains_descriptor(root)? {
        debug!(root = %root.display(), "validating current-era tree");
        let options = ValidateOptions {
            attempt_load,
            ..ValidateOptions::default()
        };
        Ok(validate_directory_with(root, options)?)
    } else {
        debug!(root = %root.display(), "auditing legacy staging tree");
        Ok(audit_directory(root, AuditOptions { attempt_load })?)
    }
}

/// Whether any directory under `root` carries an `OBJECT` descriptor.
fn contains_descriptor(root: &Path) -> SdkResult<bool> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_dir() && is_object_dir(entry.path()) {
            return Ok(true);
        }
    }
    Ok(false)
}
