use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("destination already exists: {path}")]
    PathExists { path: PathBuf },

    #[error("no object descriptor at {path}")]
    MissingObject { path: PathBuf },

    #[error("bad type descriptor at {path}: {reason}")]
    BadTypeDescriptor { path: PathBuf, reason: String },

    #[error("no save handler for type {type_tag}")]
    NoSaveHandler { type_tag: String },

    #[error("unknown object type: {name}")]
    UnknownType { name: String },

    #[error("{registry} handler already registered for {name}")]
    DuplicateHandler {
        registry: &'static str,
        name: String,
    },

    #[error("failed to resolve deferred handler for {name}: {reason}")]
    ResolveFailed { name: String, reason: String },

    #[error("validation failed at {path}: {reason}")]
    Validation { path: PathBuf, reason: String },

    #[error("failed to load {what}\n - {reason}")]
    Payload { what: String, reason: String },

    #[error("{what}\n - {source}")]
    Context {
        what: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error(transparent)]
    Store(#[from] selenite_store::StoreError),

    #[error(transparent)]
    Types(#[from] selenite_types::TypesError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CoreError {
    /// Wrap an error with one line of calling-context ("failed to save
    /// column 'X'"), keeping the original as the source.
    pub fn context(self, what: impl Into<String>) -> Self {
        Self::Context {
            what: what.into(),
            source: Box::new(self),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
