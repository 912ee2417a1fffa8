//! Cohort metadata ingestion.
//!
//! This crate turns uploaded metadata files into [`Variable`] records and
//! serializes selections back out.
//!
//! # Features
//!
//! - **Normalization**: Match header synonyms, parse quoted fields, apply
//!   defaults for missing optional fields
//! - **Batch Ingestion**: Normalize many files at once, reporting failures
//!   per file without aborting the batch
//! - **File Discovery**: Find CSV files in a folder
//! - **Export**: Write variables in the fixed export layout
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use chrono::Local;
//! use cohort_ingest::ingest_paths;
//!
//! let report = ingest_paths(&[PathBuf::from("metadata/")], Local::now().date_naive());
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.file, failure.error);
//! }
//! ```
//!
//! [`Variable`]: cohort_model::Variable

mod batch;
mod csv;
mod discovery;
mod error;
mod normalize;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Primitives ===
pub use csv::{ColumnMap, EXPORT_FILE_NAME, EXPORT_HEADER, parse_csv_line, split_records, write_variables};

// === Normalization ===
pub use normalize::{
    DEFAULT_DATATYPE, DEFAULT_DESCRIPTION, DEFAULT_TABLE, DEFAULT_VALUES, DEFAULT_VARIABLE_NAME,
    cohort_name_from_file, normalize, normalize_export, parse_completeness,
};

// === Batch Ingestion ===
pub use batch::{FileFailure, IngestReport, NormalizedFile, SourceFile, ingest_paths, ingest_sources};

// === File Discovery ===
pub use discovery::list_csv_files;
