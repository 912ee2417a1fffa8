//! Cross-cohort similarity search for one variable.

use std::fmt::Write as _;

use cohort_catalog::Catalog;
use cohort_model::Variable;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::GenerationService;
use crate::error::WorkflowError;
use crate::orchestrator::Orchestrator;
use crate::response::{lenient_score, lenient_text, parse_json_array};

/// Matches scoring below this (on a 0 to 100 scale) are dropped.
pub const SIMILARITY_SCORE_FLOOR: f64 = 70.0;

/// Candidates offered to the service, first-come.
pub const MAX_CANDIDATES: usize = 300;

pub const SIMILARITY_INSTRUCTION: &str = "You are a research data ontology expert. \
     Be extremely critical with similarity scores. Output valid JSON only.";

/// Shown when the search itself failed, as opposed to finding nothing.
pub const SIMILARITY_FAILURE_NOTICE: &str = "Failed to find similar variables.";

/// Shown when the catalog holds a single cohort.
pub const NO_OTHER_COHORTS_NOTICE: &str = "No other cohorts available to search.";

/// A catalog variable annotated with the service's judgement.
///
/// The variable is a copy; the catalog is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarVariable {
    pub variable: Variable,
    pub reason: String,
    pub similarity_score: f64,
}

/// Result of a search that reached the service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimilarityMatches {
    /// Candidates included in the prompt.
    pub candidates_offered: usize,
    /// True when more candidates existed than [`MAX_CANDIDATES`].
    pub truncated: bool,
    pub results: Vec<SimilarVariable>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimilarityOutcome {
    /// Every catalog variable belongs to the source's cohort; nothing was sent.
    NoOtherCohorts,
    Matches(SimilarityMatches),
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(default, deserialize_with = "lenient_text")]
    variable_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    cohort_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    reason: String,
    #[serde(default, deserialize_with = "lenient_score")]
    similarity_score: Option<f64>,
}

/// Builds the prompt describing the source variable and the candidates.
pub fn build_similarity_prompt(source: &Variable, candidates: &[&Variable]) -> String {
    let mut listing = String::new();
    for (idx, v) in candidates.iter().enumerate() {
        if idx > 0 {
            listing.push('\n');
        }
        let _ = write!(
            listing,
            "{} | {} | {}",
            v.variable_name, v.cohort_name, v.variable_description
        );
    }

    format!(
        "Target Variable: \"{}\" ({}) from cohort \"{}\".\n\
         \n\
         Task: Find variables from the candidate list below that represent the SAME or VERY SIMILAR clinical concept.\n\
         Be strict. If a variable is loosely related (e.g. same organ but different metric), give it a low score (< 50).\n\
         Only assign high scores (> 70) to variables that could effectively be used as substitutes in a meta-analysis.\n\
         \n\
         Candidates (Format: Name | Cohort | Desc):\n\
         {listing}\n\
         \n\
         Return ONLY a JSON array of objects with these exact keys: \"variable_name\", \"cohort_name\", \"reason\", \"similarity_score\" (0-100).",
        source.variable_name, source.variable_description, source.cohort_name
    )
}

/// Resolves and filters the service's matches.
///
/// Each match is looked up by cohort and variable name among catalog
/// variables outside the source's cohort; unresolved matches and those below
/// [`SIMILARITY_SCORE_FLOOR`] are dropped. Service order is kept.
pub fn resolve_matches(
    completion: &str,
    catalog: &Catalog,
    source: &Variable,
) -> Result<Vec<SimilarVariable>, WorkflowError> {
    let raw: Vec<RawMatch> = parse_json_array(completion)?;
    let returned = raw.len();

    let results: Vec<SimilarVariable> = raw
        .into_iter()
        .filter_map(|m| {
            let score = m.similarity_score.filter(|s| *s >= SIMILARITY_SCORE_FLOOR)?;
            if m.cohort_name == source.cohort_name {
                return None;
            }
            let variable = catalog.find(&m.cohort_name, &m.variable_name)?;
            Some(SimilarVariable {
                variable: variable.clone(),
                reason: m.reason,
                similarity_score: score,
            })
        })
        .collect();

    debug!(returned, kept = results.len(), "resolved similarity matches");
    Ok(results)
}

/// Finds catalog variables in other cohorts that could substitute for
/// `source`.
///
/// Transport and response failures are errors, distinct from an empty
/// [`SimilarityMatches`].
pub fn find_similar<G: GenerationService>(
    orchestrator: &Orchestrator<G>,
    catalog: &Catalog,
    source: &Variable,
) -> Result<SimilarityOutcome, WorkflowError> {
    let others = catalog.outside_cohort(&source.cohort_name);
    if others.is_empty() {
        info!(cohort = %source.cohort_name, "no other cohorts to search");
        return Ok(SimilarityOutcome::NoOtherCohorts);
    }

    let truncated = others.len() > MAX_CANDIDATES;
    let candidates = &others[..others.len().min(MAX_CANDIDATES)];
    let prompt = build_similarity_prompt(source, candidates);

    let completion = orchestrator.generate(&prompt, SIMILARITY_INSTRUCTION)?;
    let results = resolve_matches(&completion, catalog, source)?;
    info!(
        variable = %source.key(),
        candidates = candidates.len(),
        truncated,
        matches = results.len(),
        "similarity search complete"
    );

    Ok(SimilarityOutcome::Matches(SimilarityMatches {
        candidates_offered: candidates.len(),
        truncated,
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cohort_ingest::{SourceFile, ingest_sources};

    fn catalog() -> Catalog {
        let report = ingest_sources(
            vec![
                SourceFile::new("ALPHA.csv", "var_name,var_label,filename\nsbp,Systolic BP,exam\n"),
                SourceFile::new(
                    "BETA.csv",
                    "var_name,var_label,filename\nbp_sys,Systolic blood pressure,vitals\nhr,Heart rate,vitals\n",
                ),
            ],
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        let mut catalog = Catalog::new();
        catalog.append_report(report);
        catalog
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let catalog = catalog();
        let source = &catalog.variables()[0];
        let candidates = catalog.outside_cohort("ALPHA");
        let prompt = build_similarity_prompt(source, &candidates);
        assert!(prompt.starts_with("Target Variable: \"sbp\" (Systolic BP) from cohort \"ALPHA\"."));
        assert!(prompt.contains(
            "Candidates (Format: Name | Cohort | Desc):\n\
             bp_sys | BETA | Systolic blood pressure\n\
             hr | BETA | Heart rate\n"
        ));
    }

    #[test]
    fn test_resolve_filters_floor_and_unknowns() {
        let catalog = catalog();
        let source = catalog.variables()[0].clone();
        let completion = r#"[
            {"variable_name": "bp_sys", "cohort_name": "BETA", "reason": "same measure", "similarity_score": 92},
            {"variable_name": "hr", "cohort_name": "BETA", "reason": "vital sign", "similarity_score": 40},
            {"variable_name": "dbp", "cohort_name": "BETA", "reason": "made up", "similarity_score": 99},
            {"variable_name": "sbp", "cohort_name": "ALPHA", "reason": "itself", "similarity_score": 100},
            {"variable_name": "hr", "cohort_name": "BETA", "reason": "boundary", "similarity_score": "70"}
        ]"#;
        let results = resolve_matches(completion, &catalog, &source).unwrap();

        let summary: Vec<(&str, f64)> = results
            .iter()
            .map(|r| (r.variable.variable_name.as_str(), r.similarity_score))
            .collect();
        assert_eq!(summary, vec![("bp_sys", 92.0), ("hr", 70.0)]);
        assert_eq!(results[0].variable.variable_description, "Systolic blood pressure");
        assert_eq!(results[0].reason, "same measure");
    }

    #[test]
    fn test_resolve_rejects_prose() {
        let catalog = catalog();
        let source = catalog.variables()[0].clone();
        assert!(resolve_matches("No matches found.", &catalog, &source).is_err());
    }
}
