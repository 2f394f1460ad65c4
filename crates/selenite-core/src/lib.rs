//! Core machinery of the selenite framework: object descriptors, dispatch
//! registries, and the save/read/validate pipelines.
//!
//! An *object* is a directory with a one-line `OBJECT` descriptor naming its
//! type. Handlers registered per type do the actual serialization; this
//! crate owns everything around them.
//!
//! # Architecture
//!
//! - [`object`]: the `OBJECT` descriptor file and reserved-name rules.
//! - [`registry`]: process-wide save/read/validate handler maps, extension
//!   probes, deferred resolution, and the global override slots.
//! - [`save`] / [`read`] / [`validate`]: the three pipelines, each built as
//!   a thin dispatcher over the registries with a context object handlers
//!   use to recurse into children.
//! - [`dedup`]: structural-equality sessions that let repeated values share
//!   one directory.
//! - [`fsutil`]: path normalization and the clone strategies dedup uses.
//! - [`env`]: provenance snapshots for top-level objects.
//!
//! Handlers for the built-in value shapes live in `selenite-formats`;
//! nothing here knows any concrete layout.

pub mod config;
pub mod dedup;
pub mod env;
pub mod error;
pub mod fsutil;
pub mod object;
pub mod read;
pub mod registry;
pub mod save;
pub mod validate;

pub use config::{DuplicatePolicy, RegistryConfig};
pub use dedup::DedupSession;
pub use env::EnvironmentSnapshot;
pub use error::{CoreError, CoreResult};
pub use fsutil::CloneStrategy;
pub use object::{
    is_object_dir, is_reserved_name, read_object_type, write_object_type, ENVIRONMENT_FILE,
    OBJECT_FILE,
};
pub use read::{base_read_object, read_object, read_object_with, ReadContext, ReadOptions};
pub use registry::{
    register_deferred_read_handler, register_deferred_read_handler_with,
    register_deferred_validate_handler, register_deferred_validate_handler_with,
    register_read_handler, register_read_handler_with, register_save_handler,
    register_save_handler_with, register_save_probe, register_save_probe_with,
    register_validate_handler, register_validate_handler_with, registry_config,
    set_read_override, set_registry_config, set_save_override, unregister_read_handler,
    unregister_save_handler, unregister_save_probe, unregister_validate_handler,
    DeferredReadHandler, DeferredValidateHandler, ReadHandler, SaveHandler, SaveProbe,
    ValidateHandler,
};
pub use save::{base_save_object, save_object, save_object_with, SaveContext, SaveOptions};
pub use validate::{
    validate_directory, validate_directory_with, validate_object, validate_object_with,
    ValidateContext, ValidateOptions,
};
