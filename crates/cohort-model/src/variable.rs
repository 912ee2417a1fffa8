//! Variable records and their composite identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::values::{self, sorted_values};

/// Datatype markers that always make a variable categorical.
const CATEGORICAL_MARKERS: [&str; 3] = ["categorical", "nominal", "ordinal"];

/// Datatype markers that rule out the comma-in-values heuristic.
const NUMERIC_MARKERS: [&str; 4] = ["integer", "float", "number", "numeric"];

/// One metadata row describing a field in a cohort table.
///
/// Equality and hashing use only the composite key, so two records that
/// differ in description or values but share `(name, cohort, table)` are the
/// same variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub variable_name: String,
    pub variable_description: String,
    /// Comma-separated enumeration for categorical variables, otherwise a
    /// unit or range description.
    pub values: String,
    /// Percentage of non-missing observations, nominally `0..=100`.
    pub completeness: f64,
    pub table_name: String,
    pub datatype: String,
    /// Derived from the source file name, never from row content.
    pub cohort_name: String,
}

impl Variable {
    /// Returns the composite identity of this variable.
    #[must_use]
    pub fn key(&self) -> VariableKey {
        VariableKey {
            variable_name: self.variable_name.clone(),
            cohort_name: self.cohort_name.clone(),
            table_name: self.table_name.clone(),
        }
    }

    /// Returns true if this variable has the given composite identity.
    #[must_use]
    pub fn has_key(&self, key: &VariableKey) -> bool {
        self.variable_name == key.variable_name
            && self.cohort_name == key.cohort_name
            && self.table_name == key.table_name
    }

    /// Returns true if both records share the same composite identity.
    #[must_use]
    pub fn same_identity(&self, other: &Variable) -> bool {
        self.variable_name == other.variable_name
            && self.cohort_name == other.cohort_name
            && self.table_name == other.table_name
    }

    /// Classifies the variable as categorical.
    ///
    /// An explicit categorical datatype wins; an explicit numeric datatype
    /// loses; otherwise a comma in `values` marks an enumeration. An empty
    /// datatype is never categorical.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        if self.datatype.is_empty() {
            return false;
        }
        let datatype = self.datatype.to_lowercase();
        if CATEGORICAL_MARKERS
            .iter()
            .any(|marker| datatype.contains(marker))
        {
            return true;
        }
        if NUMERIC_MARKERS.iter().any(|marker| datatype.contains(marker)) {
            return false;
        }
        self.values.contains(values::VALUE_DELIMITER)
    }

    /// Returns the enumerated values in natural order.
    #[must_use]
    pub fn sorted_values(&self) -> Vec<&str> {
        sorted_values(&self.values)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variable_name.hash(state);
        self.cohort_name.hash(state);
        self.table_name.hash(state);
    }
}

/// The `(variable_name, cohort_name, table_name)` identity of a variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableKey {
    pub variable_name: String,
    pub cohort_name: String,
    pub table_name: String,
}

impl VariableKey {
    pub fn new(
        cohort_name: impl Into<String>,
        table_name: impl Into<String>,
        variable_name: impl Into<String>,
    ) -> Self {
        Self {
            variable_name: variable_name.into(),
            cohort_name: cohort_name.into(),
            table_name: table_name.into(),
        }
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.cohort_name, self.table_name, self.variable_name
        )
    }
}

impl From<&Variable> for VariableKey {
    fn from(variable: &Variable) -> Self {
        variable.key()
    }
}
