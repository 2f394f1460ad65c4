//! Process-wide dispatch registries.
//!
//! Three registries share one shape: a name (runtime type tag for saves, the
//! stored type string for reads and validation) mapped to a handler. Read
//! and validate entries may start as deferred providers that are resolved on
//! first use and cached in place. Registration conflicts follow the
//! configured [`DuplicatePolicy`]; save dispatch misses fall through to
//! extension probes in the configured order.
//!
//! Every map sits behind a mutex so concurrent callers stay safe; the
//! single-threaded fast path only ever takes uncontended locks.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex};

use selenite_types::Value;
use tracing::debug;

use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::error::{CoreError, CoreResult};
use crate::read::ReadContext;
use crate::save::SaveContext;
use crate::validate::ValidateContext;

/// Saves one value into an (already created) object directory.
pub type SaveHandler = Arc<dyn Fn(&Value, &Path, &SaveContext) -> CoreResult<()> + Send + Sync>;

/// Reconstructs a value from an object directory.
pub type ReadHandler = Arc<dyn Fn(&Path, &str, &ReadContext) -> CoreResult<Value> + Send + Sync>;

/// Checks an object directory's integrity without necessarily loading it.
pub type ValidateHandler = Arc<dyn Fn(&Path, &str, &ValidateContext) -> CoreResult<()> + Send + Sync>;

/// Lazily produces a read handler; resolved once, then cached.
pub type DeferredReadHandler = Arc<dyn Fn() -> CoreResult<ReadHandler> + Send + Sync>;

/// Lazily produces a validate handler; resolved once, then cached.
pub type DeferredValidateHandler = Arc<dyn Fn() -> CoreResult<ValidateHandler> + Send + Sync>;

/// Extension probe: given a concrete type tag, optionally supplies a save
/// handler for it.
pub type SaveProbe = Arc<dyn Fn(&str) -> Option<SaveHandler> + Send + Sync>;

enum ReadEntry {
    Ready(ReadHandler),
    Deferred(DeferredReadHandler),
}

enum ValidateEntry {
    Ready(ValidateHandler),
    Deferred(DeferredValidateHandler),
}

static CONFIG: LazyLock<Mutex<RegistryConfig>> =
    LazyLock::new(|| Mutex::new(RegistryConfig::default()));
static SAVE: LazyLock<Mutex<HashMap<String, SaveHandler>>> = LazyLock::new(Default::default);
static SAVE_PROBES: LazyLock<Mutex<HashMap<String, SaveProbe>>> = LazyLock::new(Default::default);
static READ: LazyLock<Mutex<HashMap<String, ReadEntry>>> = LazyLock::new(Default::default);
static VALIDATE: LazyLock<Mutex<HashMap<String, ValidateEntry>>> = LazyLock::new(Default::default);
static SAVE_OVERRIDE: LazyLock<Mutex<Option<SaveHandler>>> = LazyLock::new(Default::default);
static READ_OVERRIDE: LazyLock<Mutex<Option<ReadHandler>>> = LazyLock::new(Default::default);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Current registry configuration.
pub fn registry_config() -> RegistryConfig {
    CONFIG.lock().expect("registry config mutex poisoned").clone()
}

/// Replace the registry configuration, returning the previous one.
pub fn set_registry_config(config: RegistryConfig) -> RegistryConfig {
    std::mem::replace(
        &mut CONFIG.lock().expect("registry config mutex poisoned"),
        config,
    )
}

fn configured_policy() -> DuplicatePolicy {
    CONFIG
        .lock()
        .expect("registry config mutex poisoned")
        .duplicates
}

/// Insert under the conflict policy. Returns whether the new handler went in.
fn insert_with_policy<V>(
    map: &mut HashMap<String, V>,
    registry: &'static str,
    name: &str,
    value: V,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    if map.contains_key(name) {
        match policy {
            DuplicatePolicy::KeepExisting => {
                debug!(registry, name, "keeping existing handler");
                return Ok(false);
            }
            DuplicatePolicy::Overwrite => {
                debug!(registry, name, "overwriting existing handler");
            }
            DuplicatePolicy::Error => {
                return Err(CoreError::DuplicateHandler {
                    registry,
                    name: name.to_string(),
                })
            }
        }
    }
    map.insert(name.to_string(), value);
    Ok(true)
}

// ---------------------------------------------------------------------------
// Save registry
// ---------------------------------------------------------------------------

/// Register a save handler under a runtime type tag (configured policy).
pub fn register_save_handler(type_tag: &str, handler: SaveHandler) -> CoreResult<bool> {
    register_save_handler_with(type_tag, handler, configured_policy())
}

/// Register a save handler with an explicit conflict policy.
pub fn register_save_handler_with(
    type_tag: &str,
    handler: SaveHandler,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    let mut map = SAVE.lock().expect("save registry mutex poisoned");
    insert_with_policy(&mut map, "save", type_tag, handler, policy)
}

/// Remove a save handler; returns whether one was present.
pub fn unregister_save_handler(type_tag: &str) -> bool {
    SAVE.lock()
        .expect("save registry mutex poisoned")
        .remove(type_tag)
        .is_some()
}

/// Register an extension probe under a package name (configured policy).
pub fn register_save_probe(name: &str, probe: SaveProbe) -> CoreResult<bool> {
    register_save_probe_with(name, probe, configured_policy())
}

/// Register an extension probe with an explicit conflict policy.
pub fn register_save_probe_with(
    name: &str,
    probe: SaveProbe,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    let mut map = SAVE_PROBES.lock().expect("save probe mutex poisoned");
    insert_with_policy(&mut map, "save probe", name, probe, policy)
}

/// Remove an extension probe; returns whether one was present.
pub fn unregister_save_probe(name: &str) -> bool {
    SAVE_PROBES
        .lock()
        .expect("save probe mutex poisoned")
        .remove(name)
        .is_some()
}

/// Find the save handler for a value.
///
/// The value's class chain is tried most-specific-first; on a complete miss
/// the configured extension probes get one shot each, in order, at the
/// concrete tag. A probe's answer is cached under that tag.
pub fn resolve_save(value: &Value) -> CoreResult<SaveHandler> {
    let chain = value.class_chain();
    {
        let map = SAVE.lock().expect("save registry mutex poisoned");
        for tag in &chain {
            if let Some(handler) = map.get(tag) {
                return Ok(handler.clone());
            }
        }
    }

    // Probes run outside the lock: they are free to register handlers.
    let order = registry_config().probe_order;
    let type_tag = value.type_tag().to_string();
    for name in order {
        let probe = {
            let map = SAVE_PROBES.lock().expect("save probe mutex poisoned");
            map.get(&name).cloned()
        };
        let Some(probe) = probe else { continue };
        if let Some(handler) = probe(&type_tag) {
            debug!(probe = %name, type_tag = %type_tag, "extension probe supplied a save handler");
            let mut map = SAVE.lock().expect("save registry mutex poisoned");
            let cached = map
                .entry(type_tag.clone())
                .or_insert_with(|| handler.clone());
            return Ok(cached.clone());
        }
    }
    Err(CoreError::NoSaveHandler { type_tag })
}

// ---------------------------------------------------------------------------
// Read registry
// ---------------------------------------------------------------------------

/// Register a read handler under a stored type string (configured policy).
pub fn register_read_handler(name: &str, handler: ReadHandler) -> CoreResult<bool> {
    register_read_handler_with(name, handler, configured_policy())
}

/// Register a read handler with an explicit conflict policy.
pub fn register_read_handler_with(
    name: &str,
    handler: ReadHandler,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    let mut map = READ.lock().expect("read registry mutex poisoned");
    insert_with_policy(&mut map, "read", name, ReadEntry::Ready(handler), policy)
}

/// Register a deferred read provider (configured policy).
pub fn register_deferred_read_handler(
    name: &str,
    provider: DeferredReadHandler,
) -> CoreResult<bool> {
    register_deferred_read_handler_with(name, provider, configured_policy())
}

/// Register a deferred read provider with an explicit conflict policy.
pub fn register_deferred_read_handler_with(
    name: &str,
    provider: DeferredReadHandler,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    let mut map = READ.lock().expect("read registry mutex poisoned");
    insert_with_policy(&mut map, "read", name, ReadEntry::Deferred(provider), policy)
}

/// Remove a read handler; returns whether one was present.
pub fn unregister_read_handler(name: &str) -> bool {
    READ.lock()
        .expect("read registry mutex poisoned")
        .remove(name)
        .is_some()
}

/// Find the read handler for a stored type string, resolving and caching a
/// deferred provider on first use.
pub fn resolve_read(name: &str) -> CoreResult<ReadHandler> {
    let provider = {
        let map = READ.lock().expect("read registry mutex poisoned");
        match map.get(name) {
            None => {
                return Err(CoreError::UnknownType {
                    name: name.to_string(),
                })
            }
            Some(ReadEntry::Ready(handler)) => return Ok(handler.clone()),
            Some(ReadEntry::Deferred(provider)) => provider.clone(),
        }
    };

    // Resolve outside the lock; the provider may itself register handlers.
    let handler = provider().map_err(|err| CoreError::ResolveFailed {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    debug!(name, "resolved deferred read handler");

    let mut map = READ.lock().expect("read registry mutex poisoned");
    match map.get_mut(name) {
        // Another thread resolved first; its answer stays cached.
        Some(ReadEntry::Ready(cached)) => Ok(cached.clone()),
        Some(entry) => {
            *entry = ReadEntry::Ready(handler.clone());
            Ok(handler)
        }
        None => Ok(handler),
    }
}

// ---------------------------------------------------------------------------
// Validate registry
// ---------------------------------------------------------------------------

/// Register a validate handler under a stored type string (configured
/// policy).
pub fn register_validate_handler(name: &str, handler: ValidateHandler) -> CoreResult<bool> {
    register_validate_handler_with(name, handler, configured_policy())
}

/// Register a validate handler with an explicit conflict policy.
pub fn register_validate_handler_with(
    name: &str,
    handler: ValidateHandler,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    let mut map = VALIDATE.lock().expect("validate registry mutex poisoned");
    insert_with_policy(&mut map, "validate", name, ValidateEntry::Ready(handler), policy)
}

/// Register a deferred validate provider (configured policy).
pub fn register_deferred_validate_handler(
    name: &str,
    provider: DeferredValidateHandler,
) -> CoreResult<bool> {
    register_deferred_validate_handler_with(name, provider, configured_policy())
}

/// Register a deferred validate provider with an explicit conflict policy.
pub fn register_deferred_validate_handler_with(
    name: &str,
    provider: DeferredValidateHandler,
    policy: DuplicatePolicy,
) -> CoreResult<bool> {
    let mut map = VALIDATE.lock().expect("validate registry mutex poisoned");
    insert_with_policy(
        &mut map,
        "validate",
        name,
        ValidateEntry::Deferred(provider),
        policy,
    )
}

/// Remove a validate handler; returns whether one was present.
pub fn unregister_validate_handler(name: &str) -> bool {
    VALIDATE
        .lock()
        .expect("validate registry mutex poisoned")
        .remove(name)
        .is_some()
}

/// Find the validate handler for a stored type string, resolving and
/// caching a deferred provider on first use.
pub fn resolve_validate(name: &str) -> CoreResult<ValidateHandler> {
    let provider = {
        let map = VALIDATE.lock().expect("validate registry mutex poisoned");
        match map.get(name) {
            None => {
                return Err(CoreError::UnknownType {
                    name: name.to_string(),
                })
            }
            Some(ValidateEntry::Ready(handler)) => return Ok(handler.clone()),
            Some(ValidateEntry::Deferred(provider)) => provider.clone(),
        }
    };

    let handler = provider().map_err(|err| CoreError::ResolveFailed {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    debug!(name, "resolved deferred validate handler");

    let mut map = VALIDATE.lock().expect("validate registry mutex poisoned");
    match map.get_mut(name) {
        Some(ValidateEntry::Ready(cached)) => Ok(cached.clone()),
        Some(entry) => {
            *entry = ValidateEntry::Ready(handler.clone());
            Ok(handler)
        }
        None => Ok(handler),
    }
}

// ---------------------------------------------------------------------------
// Override slots
// ---------------------------------------------------------------------------

/// Install (or clear) the global save override, returning the previous one
/// so callers can restore it.
pub fn set_save_override(hook: Option<SaveHandler>) -> Option<SaveHandler> {
    std::mem::replace(
        &mut SAVE_OVERRIDE.lock().expect("save override mutex poisoned"),
        hook,
    )
}

/// The current save override, if any.
pub fn save_override() -> Option<SaveHandler> {
    SAVE_OVERRIDE
        .lock()
        .expect("save override mutex poisoned")
        .clone()
}

/// Install (or clear) the global read override, returning the previous one.
pub fn set_read_override(hook: Option<ReadHandler>) -> Option<ReadHandler> {
    std::mem::replace(
        &mut READ_OVERRIDE.lock().expect("read override mutex poisoned"),
        hook,
    )
}

/// The current read override, if any.
pub fn read_override() -> Option<ReadHandler> {
    READ_OVERRIDE
        .lock()
        .expect("read override mutex poisoned")
        .clone()
}
