//! Batch ingestion of several metadata files.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use cohort_model::{Cohort, Variable};
use tracing::{info, warn};

use crate::discovery::list_csv_files;
use crate::error::{IngestError, Result};
use crate::normalize::{cohort_name_from_file, normalize};

/// One uploaded file: its name and decoded text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads a file from disk, keeping its file name as the source name.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IngestError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IngestError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, text })
    }
}

/// A successfully normalized file: one cohort plus its variables.
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub cohort: Cohort,
    pub variables: Vec<Variable>,
}

/// A file that could not be ingested.
#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: IngestError,
}

/// Outcome of ingesting a batch of files.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Normalized files in input order.
    pub files: Vec<NormalizedFile>,
    /// Per-file failures; these never abort the rest of the batch.
    pub failures: Vec<FileFailure>,
}

impl IngestReport {
    /// Total number of variables across all normalized files.
    pub fn variable_count(&self) -> usize {
        self.files.iter().map(|f| f.variables.len()).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn push_failure(&mut self, file: String, error: IngestError) {
        warn!(file = %file, error = %error, "file ingestion failed");
        self.failures.push(FileFailure { file, error });
    }
}

/// Normalizes each source independently.
///
/// Every successful file becomes one [`Cohort`] dated `upload_date`. Files
/// are independent, so one failure is recorded and the batch continues.
pub fn ingest_sources(
    sources: impl IntoIterator<Item = SourceFile>,
    upload_date: NaiveDate,
) -> IngestReport {
    let mut report = IngestReport::default();
    for source in sources {
        ingest_one(&mut report, &source, upload_date);
    }
    info!(
        cohorts = report.files.len(),
        variables = report.variable_count(),
        failures = report.failures.len(),
        "ingest complete"
    );
    report
}

/// Reads and normalizes files from disk.
///
/// Directories are expanded to the CSV files they contain, sorted by name.
/// Unreadable paths are reported as per-file failures.
pub fn ingest_paths(paths: &[PathBuf], upload_date: NaiveDate) -> IngestReport {
    let mut report = IngestReport::default();
    for path in paths {
        let files = if path.is_dir() {
            match list_csv_files(path) {
                Ok(files) => files,
                Err(error) => {
                    report.push_failure(path.display().to_string(), error);
                    continue;
                }
            }
        } else {
            vec![path.clone()]
        };

        for file in files {
            match SourceFile::read(&file) {
                Ok(source) => ingest_one(&mut report, &source, upload_date),
                Err(error) => report.push_failure(file.display().to_string(), error),
            }
        }
    }
    info!(
        cohorts = report.files.len(),
        variables = report.variable_count(),
        failures = report.failures.len(),
        "ingest complete"
    );
    report
}

fn ingest_one(report: &mut IngestReport, source: &SourceFile, upload_date: NaiveDate) {
    let cohort_name = cohort_name_from_file(&source.name);
    match normalize(&source.text, &cohort_name) {
        Ok(variables) => {
            let cohort = Cohort::from_variables(cohort_name, &variables, upload_date);
            report.files.push(NormalizedFile { cohort, variables });
        }
        Err(error) => report.push_failure(source.name.clone(), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn test_failed_file_does_not_abort_batch() {
        let sources = vec![
            SourceFile::new("ALPHA.csv", "var_name,filename\nage,visits\nsex,visits\n"),
            SourceFile::new("BROKEN.csv", "var_name,description\nage,Age\n"),
            SourceFile::new("BETA.csv", "variable_name,table_name\nbmi,exam\n"),
        ];
        let report = ingest_sources(sources, date());

        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].cohort.name, "ALPHA");
        assert_eq!(report.files[0].cohort.variable_count, 2);
        assert_eq!(report.files[1].cohort.name, "BETA");
        assert_eq!(report.variable_count(), 3);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, "BROKEN.csv");
        assert!(matches!(
            report.failures[0].error,
            IngestError::MissingColumns { .. }
        ));
    }

    #[test]
    fn test_same_name_files_produce_two_cohorts() {
        let sources = vec![
            SourceFile::new("ALPHA.csv", "var_name,filename\nage,visits\n"),
            SourceFile::new("ALPHA.csv", "var_name,filename\nsex,visits\n"),
        ];
        let report = ingest_sources(sources, date());
        assert_eq!(report.files.len(), 2);
        assert!(report.files.iter().all(|f| f.cohort.name == "ALPHA"));
    }
}
