//! Session state for the cohort explorer.
//!
//! - [`Catalog`]: every ingested cohort and variable, with read-only views
//! - [`Filter`] / [`BrowseFilter`]: composable predicates over variables
//! - [`Cart`]: the user's cross-cohort selection, keyed by composite identity
//! - [`Session`]: one catalog plus one cart, passed explicitly to workflows

mod cart;
mod catalog;
mod error;
mod filter;
mod group;
mod session;

pub use cart::{Cart, SelectionState};
pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use filter::{BrowseFilter, Filter};
pub use group::{CohortGroup, TableGroup, group_by_cohort_table};
pub use session::Session;
