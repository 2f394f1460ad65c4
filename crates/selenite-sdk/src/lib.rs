//! High-level SDK for the selenite object store.
//!
//! Pulls the user-facing pieces of every subsystem crate into one place:
//! the in-memory value model, the save/read/validate pipelines with their
//! registry hooks, the built-in formats, and the legacy staging tools.
//! Most applications depend on this crate alone: call [`install`] once,
//! then save and read values through the re-exported entry points.

pub mod error;
pub mod setup;
pub mod validate;

pub use error::{SdkError, SdkResult};
pub use setup::install;
pub use validate::{validate_any, validate_any_with};

// Re-export key types
pub use selenite_types::{
    BooleanVector, CustomValue, DataFrame, Factor, IntegerVector, LogicalType, NumberVector,
    SimpleList, StringFormat, StringVector, Value,
};
pub use selenite_core::{
    read_object, read_object_with, register_deferred_read_handler,
    register_deferred_validate_handler, register_read_handler, register_save_handler,
    register_save_probe, register_validate_handler, save_object, save_object_with,
    set_read_override, set_save_override, validate_directory, validate_directory_with,
    validate_object, validate_object_with, CloneStrategy, CoreError, CoreResult, DedupSession,
    DuplicatePolicy, EnvironmentSnapshot, ReadContext, ReadHandler, ReadOptions, SaveContext,
    SaveHandler, SaveOptions, ValidateContext, ValidateHandler, ValidateOptions, OBJECT_FILE,
};
pub use selenite_stage::{
    acquire_metadata, audit_directory, create_redirection, move_object, remove_object,
    AuditOptions, LegacyReaders, MetadataDocument, MoveOptions, StageError, StageResult,
};
