//! Reading values back from object directories.

use std::path::Path;

use selenite_types::Value;
use tracing::debug;

use crate::error::CoreResult;
use crate::object::read_object_type;
use crate::registry::{read_override, resolve_read};

/// Options threaded through one read call tree.
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Treat the directory as this type instead of consulting its
    /// descriptor. Applies to the root of the call only; children are read
    /// by their own descriptors.
    pub type_override: Option<String>,
    /// Honor placeholder-meaning markers so stored NaN payloads come back
    /// as NaN instead of missing.
    pub preserve_nan_payloads: bool,
}

/// Per-call state handed to read handlers.
pub struct ReadContext {
    options: ReadOptions,
}

impl ReadContext {
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Read a nested child by its own descriptor.
    ///
    /// The type injection, if any, never propagates: it names the root the
    /// caller asked about, not whatever sits below it.
    pub fn read_child(&self, path: &Path) -> CoreResult<Value> {
        let mut options = self.options.clone();
        options.type_override = None;
        dispatch_read(path, &ReadContext { options })
    }
}

/// Load the object at `path` with default options.
pub fn read_object(path: &Path) -> CoreResult<Value> {
    read_object_with(path, ReadOptions::default())
}

/// Load the object at `path`.
pub fn read_object_with(path: &Path, options: ReadOptions) -> CoreResult<Value> {
    dispatch_read(path, &ReadContext { options })
}

fn dispatch_read(path: &Path, ctx: &ReadContext) -> CoreResult<Value> {
    let type_name = match &ctx.options.type_override {
        Some(name) => name.clone(),
        None => read_object_type(path)?,
    };
    if let Some(hook) = read_override() {
        return hook(path, &type_name, ctx);
    }
    base_read_object(path, &type_name, ctx)
}

/// The bare read pipeline, bypassing any installed override.
pub fn base_read_object(path: &Path, type_name: &str, ctx: &ReadContext) -> CoreResult<Value> {
    let handler = resolve_read(type_name)?;
    let value = handler(path, type_name, ctx)
        .map_err(|err| err.context(format!("failed to read object at {}", path.display())))?;
    debug!(path = %path.display(), type_name, "read object");
    Ok(value)
}
