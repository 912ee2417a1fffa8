//! The selection cart.

use std::collections::HashSet;

use cohort_ingest::write_variables;
use cohort_model::{Variable, VariableKey};
use tracing::debug;

use crate::group::{CohortGroup, group_by_cohort_table};

/// How much of a list of variables is already in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    None,
    Partial,
    All,
}

/// An insertion-ordered set of variables keyed by composite identity.
///
/// Holding copies means later catalog changes never alter a selection.
/// No two members share a [`VariableKey`].
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<Variable>,
    keys: HashSet<VariableKey>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable unless one with the same key is present.
    ///
    /// Returns true if the cart changed.
    pub fn add(&mut self, variable: &Variable) -> bool {
        if !self.keys.insert(variable.key()) {
            return false;
        }
        self.items.push(variable.clone());
        true
    }

    /// Removes the member sharing this variable's key, if any.
    ///
    /// Returns true if the cart changed.
    pub fn remove(&mut self, variable: &Variable) -> bool {
        self.remove_key(&variable.key())
    }

    pub fn remove_key(&mut self, key: &VariableKey) -> bool {
        if !self.keys.remove(key) {
            return false;
        }
        self.items.retain(|item| !item.has_key(key));
        true
    }

    /// Adds every listed variable not already present.
    ///
    /// Returns how many were added.
    pub fn add_all<'a>(&mut self, variables: impl IntoIterator<Item = &'a Variable>) -> usize {
        let added = variables.into_iter().filter(|&v| self.add(v)).count();
        debug!(added, total = self.items.len(), "added variables to cart");
        added
    }

    /// Removes every member matching a listed variable.
    ///
    /// Returns how many were removed.
    pub fn remove_all<'a>(&mut self, variables: impl IntoIterator<Item = &'a Variable>) -> usize {
        let doomed: HashSet<VariableKey> = variables
            .into_iter()
            .map(Variable::key)
            .filter(|key| self.keys.contains(key))
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        self.items.retain(|item| !doomed.contains(&item.key()));
        self.keys.retain(|key| !doomed.contains(key));
        debug!(removed = doomed.len(), total = self.items.len(), "removed variables from cart");
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.keys.clear();
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.keys.contains(&variable.key())
    }

    pub fn contains_key(&self, key: &VariableKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Variable] {
        &self.items
    }

    /// Reports whether none, some, or all of `variables` are selected.
    ///
    /// An empty list is `None`.
    pub fn selection_state<'a>(
        &self,
        variables: impl IntoIterator<Item = &'a Variable>,
    ) -> SelectionState {
        let (mut total, mut selected) = (0usize, 0usize);
        for variable in variables {
            total += 1;
            if self.contains(variable) {
                selected += 1;
            }
        }
        match selected {
            0 => SelectionState::None,
            n if n == total => SelectionState::All,
            _ => SelectionState::Partial,
        }
    }

    /// Distinct cohorts among the members, in first-selected order.
    pub fn cohorts(&self) -> Vec<&str> {
        let mut cohorts: Vec<&str> = Vec::new();
        for item in &self.items {
            if !cohorts.contains(&item.cohort_name.as_str()) {
                cohorts.push(&item.cohort_name);
            }
        }
        cohorts
    }

    /// Members grouped by cohort then table.
    pub fn grouped(&self) -> Vec<CohortGroup<'_>> {
        group_by_cohort_table(&self.items)
    }

    /// Serializes the members in the export layout.
    pub fn export_csv(&self) -> String {
        write_variables(&self.items)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(cohort: &str, table: &str, name: &str, description: &str) -> Variable {
        Variable {
            variable_name: name.to_string(),
            variable_description: description.to_string(),
            values: "N/A".to_string(),
            completeness: 90.0,
            table_name: table.to_string(),
            datatype: "String".to_string(),
            cohort_name: cohort.to_string(),
        }
    }

    #[test]
    fn test_add_is_keyed_by_identity() {
        let mut cart = Cart::new();
        assert!(cart.add(&variable("A", "t", "age", "Age")));
        assert!(!cart.add(&variable("A", "t", "age", "Different description")));
        assert!(cart.add(&variable("A", "u", "age", "Age")));
        assert!(cart.add(&variable("B", "t", "age", "Age")));
        assert_eq!(cart.len(), 3);
        assert_eq!(cart.iter().next().map(|v| v.variable_description.as_str()), Some("Age"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(&variable("A", "t", "age", ""));
        assert!(!cart.remove(&variable("B", "t", "age", "")));
        assert!(cart.remove(&variable("A", "t", "age", "changed")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_bulk_operations_and_state() {
        let table = vec![
            variable("A", "demo", "age", ""),
            variable("A", "demo", "sex", ""),
            variable("A", "demo", "bmi", ""),
        ];
        let mut cart = Cart::new();
        assert_eq!(cart.selection_state(&table), SelectionState::None);

        cart.add(&table[1]);
        assert_eq!(cart.selection_state(&table), SelectionState::Partial);

        assert_eq!(cart.add_all(&table), 2);
        assert_eq!(cart.selection_state(&table), SelectionState::All);
        let order: Vec<&str> = cart.iter().map(|v| v.variable_name.as_str()).collect();
        assert_eq!(order, vec!["sex", "age", "bmi"]);

        assert_eq!(cart.remove_all(&table[..2]), 2);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.remove_all(&table[..2]), 0);
        assert_eq!(cart.selection_state(std::iter::empty()), SelectionState::None);
    }

    #[test]
    fn test_cohorts_and_clear() {
        let mut cart = Cart::new();
        cart.add(&variable("B", "t", "x", ""));
        cart.add(&variable("A", "t", "y", ""));
        cart.add(&variable("B", "u", "z", ""));
        assert_eq!(cart.cohorts(), vec!["B", "A"]);
        assert_eq!(cart.grouped().len(), 2);

        cart.clear();
        assert!(cart.is_empty());
        assert!(!cart.contains_key(&VariableKey::new("B", "t", "x")));
    }

    #[test]
    fn test_export_csv() {
        let mut cart = Cart::new();
        cart.add(&variable("ALPHA", "demo", "age", "Age, in years"));
        cart.add(&variable("BETA", "visits", "sex", "Sex"));
        insta::assert_snapshot!(cart.export_csv(), @r#"
        variable_name,variable_description,values,completeness,table_name,cohort_name
        "age","Age, in years","N/A",90,"demo","ALPHA"
        "sex","Sex","N/A",90,"visits","BETA"
        "#);
    }
}
