use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),
}
