use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("no such directory: {0}")]
    MissingRoot(PathBuf),

    #[error("object error: {0}")]
    Core(#[from] selenite_core::CoreError),

    #[error("staging error: {0}")]
    Stage(#[from] selenite_stage::StageError),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
