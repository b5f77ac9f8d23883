use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the correction core.
///
/// `DocumentFormat` and `Packaging` are fatal for a run. `NoMatchFound` and
/// `Anchor` are per-suggestion and are turned into failure-report entries by
/// the pipeline; they never escape `process_document`.
#[derive(Debug, Error)]
pub enum CorrectorError {
    #[error("invalid document package {path}: {reason}")]
    DocumentFormat { path: PathBuf, reason: String },

    #[error("no text match found")]
    NoMatchFound,

    #[error("cannot anchor comment on paragraph {paragraph_index}: {reason}")]
    Anchor {
        paragraph_index: usize,
        reason: String,
    },

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("xml error in {part}: {reason}")]
    Xml { part: String, reason: String },
}

impl CorrectorError {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DocumentFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn xml(part: impl Into<String>, reason: impl ToString) -> Self {
        Self::Xml {
            part: part.into(),
            reason: reason.to_string(),
        }
    }

    /// Fatal errors abort the whole document run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoMatchFound | Self::Anchor { .. })
    }
}

pub type Result<T> = std::result::Result<T, CorrectorError>;
