//! Catalog lookup errors.

use cohort_model::VariableKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// No catalog variable has this composite key.
    #[error("variable not found: {key}")]
    VariableNotFound { key: VariableKey },

    /// The cohort has no variables in this table.
    #[error("table not found: {cohort}/{table}")]
    TableNotFound { cohort: String, table: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
