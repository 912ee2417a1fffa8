//! Command-line selectors for variables and tables.
//!
//! A variable is written `COHORT/TABLE/VARIABLE` and a table `COHORT/TABLE`.
//! The last segment keeps any further slashes.

use std::fmt;
use std::str::FromStr;

use cohort_model::VariableKey;

/// A `COHORT/TABLE/VARIABLE` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSelector(pub VariableKey);

/// A `COHORT/TABLE` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelector {
    pub cohort: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    input: String,
    expected: &'static str,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selector '{}': expected {}", self.input, self.expected)
    }
}

impl std::error::Error for SelectorError {}

fn split_segments<'a>(
    input: &'a str,
    count: usize,
    expected: &'static str,
) -> Result<Vec<&'a str>, SelectorError> {
    let segments: Vec<&str> = input.splitn(count, '/').map(str::trim).collect();
    if segments.len() != count || segments.iter().any(|s| s.is_empty()) {
        return Err(SelectorError {
            input: input.to_string(),
            expected,
        });
    }
    Ok(segments)
}

impl FromStr for VariableSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = split_segments(s, 3, "COHORT/TABLE/VARIABLE")?;
        Ok(Self(VariableKey::new(segments[0], segments[1], segments[2])))
    }
}

impl FromStr for TableSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = split_segments(s, 2, "COHORT/TABLE")?;
        Ok(Self {
            cohort: segments[0].to_string(),
            table: segments[1].to_string(),
        })
    }
}

impl fmt::Display for TableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cohort, self.table)
    }
}
