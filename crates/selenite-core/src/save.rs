//! Saving values into object directories.
//!
//! [`save_object`] is the front door: it refuses to clobber an existing
//! path, consults the dedup session, dispatches through the save registry
//! (or the installed override), writes the provenance snapshot for
//! top-level objects, and finishes with a validation pass over the tree it
//! just produced. Handlers recurse through [`SaveContext::save_child`] so
//! overrides and options follow the whole call tree.

use std::path::Path;
use std::sync::{Arc, Mutex};

use selenite_types::Value;
use tracing::debug;

use crate::dedup::DedupSession;
use crate::env::EnvironmentSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::fsutil::{clone_directory, CloneStrategy};
use crate::object::ENVIRONMENT_FILE;
use crate::registry::{resolve_save, save_override};
use crate::validate::validate_object;

/// Options threaded through one save call tree.
#[derive(Clone, Default)]
pub struct SaveOptions {
    /// Keep NaN payloads distinct from missing values in float payloads.
    /// Off by default: every NaN then reads back as missing.
    pub preserve_nan_payloads: bool,
    /// Write an `_environment.json` provenance snapshot beside the
    /// top-level object.
    pub record_environment: bool,
    /// Deduplication scope; repeated values within one session are cloned
    /// from their first directory instead of re-serialized.
    pub dedup: Option<Arc<Mutex<DedupSession>>>,
    /// How dedup hits materialize their directory.
    pub clone_strategy: CloneStrategy,
}

/// Per-call state handed to save handlers.
///
/// Carries the options, the provenance snapshot captured once at the top
/// level, and whether this call is nested inside another object.
pub struct SaveContext {
    options: SaveOptions,
    environment: Option<Arc<EnvironmentSnapshot>>,
    nested: bool,
}

impl SaveContext {
    fn top_level(options: SaveOptions) -> Self {
        let environment = options
            .record_environment
            .then(|| Arc::new(EnvironmentSnapshot::capture()));
        Self {
            options,
            environment,
            nested: false,
        }
    }

    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    /// Whether this save sits inside another object directory.
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// The snapshot captured for this call tree, when provenance recording
    /// is on.
    pub fn environment(&self) -> Option<&EnvironmentSnapshot> {
        self.environment.as_deref()
    }

    /// Save a nested child under the parent's directory.
    ///
    /// Goes back through the override-aware dispatch, so an installed save
    /// override sees every child too.
    pub fn save_child(&self, value: &Value, path: &Path) -> CoreResult<()> {
        let child = SaveContext {
            options: self.options.clone(),
            environment: self.environment.clone(),
            nested: true,
        };
        dispatch_save(value, path, &child)
    }
}

/// Save a value as a new object directory with default options.
pub fn save_object(value: &Value, path: &Path) -> CoreResult<()> {
    save_object_with(value, path, SaveOptions::default())
}

/// Save a value as a new object directory.
///
/// After the handler finishes, the produced tree is validated; a save whose
/// output would not pass validation reports the validation error.
pub fn save_object_with(value: &Value, path: &Path, options: SaveOptions) -> CoreResult<()> {
    let ctx = SaveContext::top_level(options);
    dispatch_save(value, path, &ctx)?;
    validate_object(path)
        .map_err(|err| err.context(format!("post-save validation of {}", path.display())))
}

fn dispatch_save(value: &Value, path: &Path, ctx: &SaveContext) -> CoreResult<()> {
    if let Some(hook) = save_override() {
        return hook(value, path, ctx);
    }
    base_save_object(value, path, ctx)
}

/// The bare save pipeline, bypassing any installed override.
///
/// Overrides delegate here once they decide a value is not theirs to
/// intercept.
pub fn base_save_object(value: &Value, path: &Path, ctx: &SaveContext) -> CoreResult<()> {
    if path.exists() {
        return Err(CoreError::PathExists {
            path: path.to_path_buf(),
        });
    }

    if let Some(shared) = &ctx.options.dedup {
        let hit = {
            let session = shared.lock().expect("dedup session mutex poisoned");
            session.check(value).map(Path::to_path_buf)
        };
        if let Some(existing) = hit {
            debug!(
                from = %existing.display(),
                to = %path.display(),
                "duplicate value, cloning earlier directory"
            );
            return clone_directory(&existing, path, ctx.options.clone_strategy);
        }
    }

    let handler = resolve_save(value)?;
    std::fs::create_dir_all(path)?;
    handler(value, path, ctx)?;

    if !ctx.nested {
        if let Some(env) = &ctx.environment {
            env.write(&path.join(ENVIRONMENT_FILE))?;
        }
    }

    if let Some(shared) = &ctx.options.dedup {
        shared
            .lock()
            .expect("dedup session mutex poisoned")
            .record(value, path)?;
    }

    debug!(path = %path.display(), type_tag = value.type_tag(), "saved object");
    Ok(())
}
