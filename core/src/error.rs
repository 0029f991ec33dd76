use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::dispatch::Attempt;

/// Errors surfaced by a single `convert` call.
///
/// Source validation and destination preparation errors abort before any
/// backend runs. Backend errors never show up here individually; they are
/// folded into [`ConvertError::NoAvailableConverter`].
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("file or directory not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported file extension: {extension:?}")]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("failed creating folder {}: {reason}", path.display())]
    FolderCreation { path: PathBuf, reason: String },

    #[error("existing file cannot be removed: {}: {source}", path.display())]
    FileRemoval {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot overwrite {} - check file permissions", path.display())]
    Permission { path: PathBuf },

    #[error("no operational converters are available{}", summarize(.attempts))]
    NoAvailableConverter { attempts: Vec<Attempt> },
}

impl ConvertError {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::NotFound { .. } => "not_found",
            ConvertError::UnsupportedExtension { .. } => "unsupported_extension",
            ConvertError::FolderCreation { .. } => "folder_creation",
            ConvertError::FileRemoval { .. } => "file_removal",
            ConvertError::Permission { .. } => "permission",
            ConvertError::NoAvailableConverter { .. } => "no_available_converter",
        }
    }
}

fn summarize(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return " (no converters were tried)".to_string();
    }
    let mut out = String::from(":");
    for attempt in attempts {
        let _ = write!(out, "\n  {}: {}", attempt.converter, attempt.outcome);
    }
    out
}

/// Why a single backend could not produce output.
///
/// Recovered by the dispatcher, which moves on to the next candidate.
#[derive(Debug, Error)]
pub enum BackendFailure {
    /// The backend is not usable in this environment (binary missing,
    /// API key not configured, input kind disabled).
    #[error("{0}")]
    Unavailable(String),

    /// The backend ran but did not succeed.
    #[error("{0}")]
    Failed(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl BackendFailure {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackendFailure::Io {
            path: path.into(),
            source,
        }
    }
}
