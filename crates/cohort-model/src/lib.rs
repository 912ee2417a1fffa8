//! Data model for the cohort variable catalog.
//!
//! A [`Variable`] is one metadata row describing a measured field in a cohort
//! table. Its identity is the [`VariableKey`] triple
//! `(variable_name, cohort_name, table_name)`; every equality, deduplication
//! and selection test in the workspace goes through that key.

pub mod cohort;
pub mod values;
pub mod variable;

pub use cohort::Cohort;
pub use values::{natural_cmp, sorted_values};
pub use variable::{Variable, VariableKey};
