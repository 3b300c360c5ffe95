use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cannot open archive {path}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("Invalid layout under {root}: {reason}")]
    InvalidLayout { root: PathBuf, reason: String },

    #[error("No archive files found under {root}")]
    NoArchives { root: PathBuf },

    #[error("Cannot remove existing database {path}: {source}")]
    Truncate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Process exit code for this failure class. Zero is never returned.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::InvalidLayout { .. } => 2,
            PipelineError::Truncate { .. } => 3,
            PipelineError::Database(_) => 4,
            PipelineError::NoArchives { .. } => 5,
            PipelineError::ArchiveOpen { .. } | PipelineError::ArchiveRead { .. } => 6,
            PipelineError::Other(_) => 1,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
