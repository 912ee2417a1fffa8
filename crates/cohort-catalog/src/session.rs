//! Session context shared by the workflows.

use cohort_ingest::{FileFailure, IngestReport};
use cohort_model::VariableKey;
use tracing::info;

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::error::Result;

/// One catalog and one cart.
///
/// Starts empty and is only cleared by [`Session::reset`]. A single owner
/// mutates it; workflows receive it by reference.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub catalog: Catalog,
    pub cart: Cart,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an ingestion batch to the catalog and returns its failures.
    pub fn ingest(&mut self, report: IngestReport) -> Vec<FileFailure> {
        self.catalog.append_report(report)
    }

    /// Adds the catalog variable with this key to the cart.
    pub fn select(&mut self, key: &VariableKey) -> Result<bool> {
        let variable = self.catalog.resolve(key)?;
        Ok(self.cart.add(variable))
    }

    /// Adds every variable of a catalog table to the cart.
    pub fn select_table(&mut self, cohort: &str, table: &str) -> Result<usize> {
        let variables = self.catalog.resolve_table(cohort, table)?;
        Ok(self.cart.add_all(variables))
    }

    /// Removes every variable of a catalog table from the cart.
    pub fn deselect_table(&mut self, cohort: &str, table: &str) -> Result<usize> {
        let variables = self.catalog.resolve_table(cohort, table)?;
        Ok(self.cart.remove_all(variables))
    }

    /// Empties both the catalog and the cart.
    pub fn reset(&mut self) {
        info!(
            cohorts = self.catalog.cohort_count(),
            selected = self.cart.len(),
            "resetting session"
        );
        self.catalog.clear();
        self.cart.clear();
    }
}
