//! Error types for cohort metadata ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while ingesting metadata files.
///
/// Every variant is scoped to a single file; a batch keeps going when one
/// file fails.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Schema Errors ===
    /// File has no header row.
    #[error("file is empty: {file}")]
    EmptyFile { file: String },

    /// File has a header row but no data rows.
    #[error("file has no data rows: {file}")]
    NoDataRows { file: String },

    /// Required name or table column could not be resolved from the header.
    #[error("{file} is missing required columns: {}", .missing.join(", "))]
    MissingColumns {
        file: String,
        missing: Vec<&'static str>,
    },
}

impl IngestError {
    /// Returns true for schema errors (as opposed to I/O failures).
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyFile { .. } | Self::NoDataRows { .. } | Self::MissingColumns { .. }
        )
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
