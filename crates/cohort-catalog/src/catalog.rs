//! The in-memory catalog store.

use cohort_ingest::{FileFailure, IngestReport, NormalizedFile};
use cohort_model::{Cohort, Variable, VariableKey};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::filter::Filter;
use crate::group::{CohortGroup, group_by_cohort_table};

/// All cohorts and variables ingested during a session.
///
/// The catalog only grows: files are appended whole and nothing is edited
/// in place. Every view below borrows from it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cohorts: Vec<Cohort>,
    variables: Vec<Variable>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one normalized file as a new cohort.
    ///
    /// Cohort names are not deduplicated; a second file with the same name
    /// adds a second cohort entry.
    pub fn append(&mut self, file: NormalizedFile) {
        let NormalizedFile { cohort, variables } = file;
        debug!(
            cohort = %cohort.name,
            variables = variables.len(),
            "appending cohort to catalog"
        );
        self.cohorts.push(cohort);
        self.variables.extend(variables);
    }

    /// Appends every successful file in a report and hands back the failures.
    pub fn append_report(&mut self, report: IngestReport) -> Vec<FileFailure> {
        let IngestReport { files, failures } = report;
        for file in files {
            self.append(file);
        }
        info!(
            cohorts = self.cohorts.len(),
            variables = self.variables.len(),
            "catalog updated"
        );
        failures
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn cohort_count(&self) -> usize {
        self.cohorts.len()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Distinct cohort names in the order they were first ingested.
    pub fn cohort_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for cohort in &self.cohorts {
            if !names.contains(&cohort.name.as_str()) {
                names.push(&cohort.name);
            }
        }
        names
    }

    /// Distinct table names within a cohort, in first-seen order.
    pub fn tables_in(&self, cohort: &str) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for variable in self.variables.iter().filter(|v| v.cohort_name == cohort) {
            if !tables.contains(&variable.table_name.as_str()) {
                tables.push(&variable.table_name);
            }
        }
        tables
    }

    /// Variables matching an arbitrary predicate, in catalog order.
    pub fn select_where(&self, predicate: impl Fn(&Variable) -> bool) -> Vec<&Variable> {
        self.variables.iter().filter(|&v| predicate(v)).collect()
    }

    /// Variables matching a [`Filter`], in catalog order.
    pub fn query(&self, filter: &Filter) -> Vec<&Variable> {
        self.select_where(|v| filter.matches(v))
    }

    /// Variables other than those of `cohort`.
    pub fn outside_cohort(&self, cohort: &str) -> Vec<&Variable> {
        self.select_where(|v| v.cohort_name != cohort)
    }

    /// Variables of one table in one cohort.
    pub fn table_variables(&self, cohort: &str, table: &str) -> Vec<&Variable> {
        self.select_where(|v| v.cohort_name == cohort && v.table_name == table)
    }

    /// First variable with this name in this cohort, in any table.
    pub fn find(&self, cohort: &str, variable_name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.cohort_name == cohort && v.variable_name == variable_name)
    }

    /// Variable with this exact composite key.
    pub fn get(&self, key: &VariableKey) -> Option<&Variable> {
        self.variables.iter().find(|v| v.has_key(key))
    }

    /// Like [`Catalog::get`], but a missing key is an error.
    pub fn resolve(&self, key: &VariableKey) -> Result<&Variable> {
        self.get(key)
            .ok_or_else(|| CatalogError::VariableNotFound { key: key.clone() })
    }

    /// Like [`Catalog::table_variables`], but an empty table is an error.
    pub fn resolve_table(&self, cohort: &str, table: &str) -> Result<Vec<&Variable>> {
        let variables = self.table_variables(cohort, table);
        if variables.is_empty() {
            return Err(CatalogError::TableNotFound {
                cohort: cohort.to_string(),
                table: table.to_string(),
            });
        }
        Ok(variables)
    }

    /// Matching variables grouped by cohort then table.
    pub fn grouped(&self, filter: &Filter) -> Vec<CohortGroup<'_>> {
        group_by_cohort_table(self.query(filter))
    }

    /// Drops all cohorts and variables.
    pub fn clear(&mut self) {
        self.cohorts.clear();
        self.variables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cohort_ingest::{SourceFile, ingest_sources};

    fn catalog() -> Catalog {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let report = ingest_sources(
            vec![
                SourceFile::new(
                    "ALPHA.csv",
                    "var_name,var_label,completeness,filename\n\
                     age,Age at baseline,100,demo\n\
                     sex,Sex,98,demo\n\
                     hb,Haemoglobin,60,labs\n",
                ),
                SourceFile::new("BETA.csv", "var_name,var_label,filename\nage_yrs,Age,demo\n"),
                SourceFile::new("BROKEN.csv", "var_name\nage\n"),
            ],
            date,
        );
        let mut catalog = Catalog::new();
        let failures = catalog.append_report(report);
        assert_eq!(failures.len(), 1);
        catalog
    }

    #[test]
    fn test_counters_and_names() {
        let catalog = catalog();
        assert_eq!(catalog.cohort_count(), 2);
        assert_eq!(catalog.variable_count(), 4);
        assert_eq!(catalog.cohort_names(), vec!["ALPHA", "BETA"]);
        assert_eq!(catalog.tables_in("ALPHA"), vec!["demo", "labs"]);
        assert!(catalog.tables_in("GAMMA").is_empty());
    }

    #[test]
    fn test_lookups() {
        let catalog = catalog();
        assert_eq!(catalog.find("ALPHA", "hb").map(|v| v.table_name.as_str()), Some("labs"));
        assert!(catalog.find("BETA", "hb").is_none());

        let key = VariableKey::new("BETA", "demo", "age_yrs");
        assert!(catalog.resolve(&key).is_ok());
        let missing = VariableKey::new("BETA", "labs", "age_yrs");
        assert!(matches!(
            catalog.resolve(&missing),
            Err(CatalogError::VariableNotFound { .. })
        ));
        assert!(catalog.resolve_table("ALPHA", "visits").is_err());
        assert_eq!(catalog.resolve_table("ALPHA", "demo").unwrap().len(), 2);
    }

    #[test]
    fn test_query_and_outside_cohort() {
        let catalog = catalog();
        let hits = catalog.query(&Filter::text("age").and(Filter::min_completeness(1.0)));
        let names: Vec<&str> = hits.iter().map(|v| v.variable_name.as_str()).collect();
        assert_eq!(names, vec!["age"]);

        let others = catalog.outside_cohort("ALPHA");
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].cohort_name, "BETA");
    }

    #[test]
    fn test_same_named_files_stay_separate() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let report = ingest_sources(
            vec![
                SourceFile::new("ALPHA.csv", "var_name,filename\nage,demo\n"),
                SourceFile::new("alpha.CSV", "var_name,filename\nsex,demo\n"),
                SourceFile::new("ALPHA.csv", "var_name,filename\nbmi,exam\n"),
            ],
            date,
        );
        let mut catalog = Catalog::new();
        catalog.append_report(report);
        assert_eq!(catalog.cohort_count(), 3);
        assert_eq!(catalog.cohort_names(), vec!["ALPHA", "alpha"]);
        assert_eq!(catalog.tables_in("ALPHA"), vec!["demo", "exam"]);
    }
}
