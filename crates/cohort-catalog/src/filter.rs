//! Composable variable predicates for faceted browsing.

use std::fmt;

use cohort_model::Variable;

type Predicate = Box<dyn Fn(&Variable) -> bool + Send + Sync>;

/// A predicate over variables.
///
/// Filters are built from the facet constructors and combined with
/// [`Filter::and`]. They never inspect anything but the variable itself.
pub struct Filter {
    predicate: Predicate,
}

impl Filter {
    /// Wraps an arbitrary predicate.
    pub fn new(predicate: impl Fn(&Variable) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// Matches every variable.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Case-insensitive substring match against name or description.
    ///
    /// An empty query matches everything.
    pub fn text(query: &str) -> Self {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Self::all();
        }
        Self::new(move |v| {
            v.variable_name.to_lowercase().contains(&needle)
                || v.variable_description.to_lowercase().contains(&needle)
        })
    }

    /// Exact cohort name match.
    pub fn cohort(name: &str) -> Self {
        let name = name.to_string();
        Self::new(move |v| v.cohort_name == name)
    }

    /// Exact table name match.
    pub fn table(name: &str) -> Self {
        let name = name.to_string();
        Self::new(move |v| v.table_name == name)
    }

    /// Keeps variables whose completeness is at least `floor`.
    pub fn min_completeness(floor: f64) -> Self {
        Self::new(move |v| v.completeness >= floor)
    }

    /// Conjunction of two filters.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        let Self { predicate: left } = self;
        let Self { predicate: right } = other;
        Self::new(move |v| left(v) && right(v))
    }

    pub fn matches(&self, variable: &Variable) -> bool {
        (self.predicate)(variable)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").finish_non_exhaustive()
    }
}

/// The browse facets a user can set at once.
///
/// Empty strings count as unset, as does a completeness floor of zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseFilter {
    pub search: Option<String>,
    pub cohort: Option<String>,
    pub table: Option<String>,
    pub min_completeness: f64,
}

impl BrowseFilter {
    /// Compiles the set facets into one [`Filter`].
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::all();
        if let Some(cohort) = non_empty(self.cohort.as_deref()) {
            filter = filter.and(Filter::cohort(cohort));
        }
        if let Some(table) = non_empty(self.table.as_deref()) {
            filter = filter.and(Filter::table(table));
        }
        if self.min_completeness > 0.0 {
            filter = filter.and(Filter::min_completeness(self.min_completeness));
        }
        if let Some(search) = non_empty(self.search.as_deref()) {
            filter = filter.and(Filter::text(search));
        }
        filter
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
