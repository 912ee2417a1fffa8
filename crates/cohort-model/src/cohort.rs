//! Cohort metadata.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::variable::Variable;

/// One ingested dataset.
///
/// Created once per successfully normalized file and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    /// Derived from the source file name. Not guaranteed unique: two files
    /// with the same name produce two cohorts sharing it.
    pub name: String,
    pub variable_count: usize,
    /// Distinct table names in first-seen order.
    pub tables: Vec<String>,
    pub upload_date: NaiveDate,
}

impl Cohort {
    /// Builds the cohort summary for a freshly normalized batch of variables.
    pub fn from_variables(
        name: impl Into<String>,
        variables: &[Variable],
        upload_date: NaiveDate,
    ) -> Self {
        let mut tables: Vec<String> = Vec::new();
        for variable in variables {
            if !tables.iter().any(|t| t == &variable.table_name) {
                tables.push(variable.table_name.clone());
            }
        }
        Self {
            name: name.into(),
            variable_count: variables.len(),
            tables,
            upload_date,
        }
    }
}
