//! Library components of the cohort explorer CLI.

pub mod logging;
pub mod selector;
