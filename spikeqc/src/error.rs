use std::io;
use std::path::{Path, PathBuf};

use spikecore::DataError;
use thiserror::Error;

/// Failures while loading sorter output.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The requested file does not exist.
    #[error("resource not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The sorter output directory itself is missing.
    #[error("data directory does not exist: {}", path.display())]
    DirectoryMissing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("invalid sorter output: {0}")]
    Data(#[from] DataError),
}

impl LoadError {
    /// Maps `ErrorKind::NotFound` to [`LoadError::NotFound`], everything else to `Io`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::NotFound { path: path.to_path_buf() }
        } else {
            LoadError::Io { path: path.to_path_buf(), source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}

/// Any failure of a quality-metrics run.
#[derive(Error, Debug)]
pub enum QcError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("metrics engine rejected input: {0}")]
    Data(#[from] DataError),

    #[error("CSV error in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("JSON error in {}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },

    #[error("table has no `{column}` column")]
    MissingColumn { column: String },

    #[error("unit {unit_id} appears more than once")]
    DuplicateUnit { unit_id: u32 },

    #[error("row {row}: `{value}` is not a valid unit id")]
    InvalidKey { row: usize, value: String },

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth { row: usize, expected: usize, found: usize },
}

impl QcError {
    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        QcError::Csv { path: path.to_path_buf(), source }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        QcError::Io { path: path.to_path_buf(), source }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        QcError::Json { path: path.to_path_buf(), source }
    }

    /// Errors that mean "the table does not fit the expected layout" rather than
    /// "the table could not be read".
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            QcError::MissingColumn { .. }
                | QcError::DuplicateUnit { .. }
                | QcError::InvalidKey { .. }
                | QcError::RowWidth { .. }
        )
    }
}
