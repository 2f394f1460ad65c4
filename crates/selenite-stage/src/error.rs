use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("no metadata document for {path}")]
    MissingMetadata { path: PathBuf },

    #[error("bad metadata document {path}: {reason}")]
    BadDocument { path: PathBuf, reason: String },

    #[error("redirection loop while resolving {path}")]
    RedirectionLoop { path: PathBuf },

    #[error("cannot create redirection at {path}: {reason}")]
    SourceOccupied { path: PathBuf, reason: String },

    #[error("cannot move or remove child object {path} without its parent")]
    IsChild { path: PathBuf },

    #[error("no legacy object at {path}")]
    MissingObjectDir { path: PathBuf },

    #[error("move destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("child {path} referenced by both {first_parent} and {second_parent}")]
    DuplicateChildReference {
        path: String,
        first_parent: String,
        second_parent: String,
    },

    #[error("missing child {path}, referenced by {parent}")]
    MissingChild { path: String, parent: String },

    #[error("orphaned child {path} is referenced by no parent")]
    OrphanChild { path: String },

    #[error("unknown file {path} belongs to no object")]
    UnknownFile { path: String },

    #[error("object {inner} is nested inside object {outer}")]
    IllegalNesting { outer: String, inner: String },

    #[error("redirection {path} targets unknown path {target}")]
    DanglingRedirect { path: String, target: String },

    #[error("no legacy reader for schema '{schema}' (document {path})")]
    UnknownSchema { path: PathBuf, schema: String },

    #[error("{what}\n - {source}")]
    Context {
        what: String,
        #[source]
        source: Box<StageError>,
    },

    #[error(transparent)]
    Csv(#[from] selenite_csv::CsvError),

    #[error(transparent)]
    Types(#[from] selenite_types::TypesError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl StageError {
    /// Wrap with one line of calling-context, keeping the original as the
    /// source.
    pub fn context(self, what: impl Into<String>) -> Self {
        Self::Context {
            what: what.into(),
            source: Box::new(self),
        }
    }
}

pub type StageResult<T> = Result<T, StageError>;
