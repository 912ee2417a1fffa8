//! Cohort and table grouping for display.

use cohort_model::Variable;

/// Variables of one cohort, split by table.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortGroup<'a> {
    pub cohort: &'a str,
    pub tables: Vec<TableGroup<'a>>,
}

impl CohortGroup<'_> {
    pub fn variable_count(&self) -> usize {
        self.tables.iter().map(|t| t.variables.len()).sum()
    }
}

/// Variables of one table within a cohort.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup<'a> {
    pub table: &'a str,
    pub variables: Vec<&'a Variable>,
}

/// Groups variables by cohort, then by table.
///
/// Cohorts and tables appear in the order they are first seen; variables
/// keep their input order.
pub fn group_by_cohort_table<'a>(
    variables: impl IntoIterator<Item = &'a Variable>,
) -> Vec<CohortGroup<'a>> {
    let mut groups: Vec<CohortGroup<'a>> = Vec::new();
    for variable in variables {
        let cohort_idx = match groups.iter().position(|g| g.cohort == variable.cohort_name) {
            Some(idx) => idx,
            None => {
                groups.push(CohortGroup {
                    cohort: &variable.cohort_name,
                    tables: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let tables = &mut groups[cohort_idx].tables;
        match tables.iter().position(|t| t.table == variable.table_name) {
            Some(idx) => tables[idx].variables.push(variable),
            None => tables.push(TableGroup {
                table: &variable.table_name,
                variables: vec![variable],
            }),
        }
    }
    groups
}
