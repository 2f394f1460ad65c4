//! Legacy staging-directory support.
//!
//! Before the directory-per-object layout, objects lived in a flat staging
//! area: each payload file `<path>` sits next to a JSON metadata document
//! at `<path>.json` carrying a `$schema` tag, the logical `path` itself,
//! a child flag, and `resource.path` references to other entries. This
//! crate keeps that era readable and maintainable:
//!
//! * [`acquire_metadata`] loads a document, following redirections;
//! * [`create_redirection`], [`move_object`], and [`remove_object`] edit
//!   the staging area while keeping every cross-reference consistent;
//! * [`audit_directory`] runs the full referential integrity audit;
//! * [`LegacyReaders`] turns documents back into values.
//!
//! Nothing here writes new objects in the legacy layout; that era is
//! closed.

pub mod acquire;
pub mod audit;
pub mod document;
pub mod error;
pub mod readers;
pub mod relocate;

pub use acquire::{acquire_metadata, create_redirection, metadata_file};
pub use audit::{audit_directory, audit_directory_with_readers, AuditOptions};
pub use document::{MetadataDocument, REDIRECTION_PREFIX};
pub use error::{StageError, StageResult};
pub use readers::{LegacyReader, LegacyReaders};
pub use relocate::{move_object, remove_object, MoveOptions};
