//! Cross-cohort harmonisation of the selected variables.

use std::collections::HashSet;
use std::fmt::Write as _;

use cohort_catalog::Cart;
use cohort_model::Variable;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::GenerationService;
use crate::error::WorkflowError;
use crate::orchestrator::Orchestrator;
use crate::response::{DecodedArray, decode_json_array, lenient_text};

/// Fewest variables a group may hold.
pub const MIN_GROUP_VARIABLES: usize = 2;

/// Fewest distinct cohorts a group must span.
pub const MIN_GROUP_COHORTS: usize = 2;

/// Fewest selected variables worth harmonising.
pub const MIN_SELECTION: usize = 2;

pub const HARMONISATION_INSTRUCTION: &str =
    "You are a data harmonisation expert. Output valid JSON only.";

/// Shown when harmonisation could not be completed.
pub const HARMONISATION_FAILURE_NOTICE: &str = "Harmonisation failed. Try again.";

/// One variable's place in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default, deserialize_with = "lenient_text")]
    pub original_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cohort: String,
    /// How to transform the original values to the common representation.
    #[serde(default, deserialize_with = "lenient_text")]
    pub mapping: String,
}

/// A proposed common concept across cohorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonisationGroup {
    #[serde(default, deserialize_with = "lenient_text")]
    pub harmonised_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub standardized_values: String,
    #[serde(default)]
    pub variables: Vec<GroupMember>,
}

impl HarmonisationGroup {
    /// Distinct non-empty cohort names among the members.
    pub fn cohort_count(&self) -> usize {
        self.variables
            .iter()
            .map(|m| m.cohort.trim())
            .filter(|c| !c.is_empty())
            .collect::<HashSet<_>>()
            .len()
    }

    /// True if the group has enough members spread over enough cohorts.
    pub fn is_cross_cohort(&self) -> bool {
        self.variables.len() >= MIN_GROUP_VARIABLES && self.cohort_count() >= MIN_GROUP_COHORTS
    }
}

/// Groups that passed validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HarmonisationReport {
    /// In the order the service returned them.
    pub groups: Vec<HarmonisationGroup>,
    /// Groups discarded for being too small, single-cohort, or not
    /// decodable as a group at all.
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarmonisationOutcome {
    /// Fewer than [`MIN_SELECTION`] variables selected; nothing was sent.
    NotEnoughSelected,
    Groups(HarmonisationReport),
}

/// Builds the prompt listing each selected variable.
pub fn build_harmonisation_prompt(variables: &[Variable]) -> String {
    let mut listing = String::new();
    for v in variables {
        let _ = writeln!(
            listing,
            "- {} ({}): {}. Values: {}",
            v.variable_name, v.cohort_name, v.variable_description, v.values
        );
    }

    format!(
        "Harmonise these selected research variables across different cohorts. \
         Identify variables representing the same concept and provide a mapping.\n\
         \n\
         CRITICAL RULE: Only group variables from DIFFERENT cohorts. \
         Do not group variables from the same cohort together in a single harmonisation group. \
         Each group must represent a cross-cohort mapping.\n\
         \n\
         Variables:\n\
         {listing}\n\
         Return ONLY a JSON array of groups where EACH group contains 2 or more variables:\n\
         [\n  \
         {{\n    \
         \"harmonised_name\": \"Standard Name\",\n    \
         \"description\": \"Concept description\",\n    \
         \"reasoning\": \"Why these match\",\n    \
         \"standardized_values\": \"Proposed scale/units\",\n    \
         \"variables\": [\n      \
         {{ \"original_name\": \"name\", \"cohort\": \"cohort\", \"mapping\": \"how to transform\" }}\n    \
         ]\n  \
         }}\n\
         ]"
    )
}

/// Parses the service's groups and keeps only cross-cohort ones.
///
/// Offending groups are dropped whole, never trimmed into shape.
pub fn validate_groups(completion: &str) -> Result<HarmonisationReport, WorkflowError> {
    let DecodedArray {
        items: proposed,
        skipped,
    } = decode_json_array::<HarmonisationGroup>(completion)?;
    let total = proposed.len() + skipped;
    let groups: Vec<HarmonisationGroup> = proposed
        .into_iter()
        .filter(HarmonisationGroup::is_cross_cohort)
        .collect();
    let dropped = total - groups.len();
    if dropped > 0 {
        debug!(dropped, total, "dropped groups failing the cross-cohort rule");
    }
    Ok(HarmonisationReport { groups, dropped })
}

/// Asks the service to group the cart's variables by concept.
///
/// Transport and response failures are errors, distinct from a report with
/// no groups.
pub fn harmonise<G: GenerationService>(
    orchestrator: &Orchestrator<G>,
    cart: &Cart,
) -> Result<HarmonisationOutcome, WorkflowError> {
    if cart.len() < MIN_SELECTION {
        debug!(selected = cart.len(), "not enough variables to harmonise");
        return Ok(HarmonisationOutcome::NotEnoughSelected);
    }

    let prompt = build_harmonisation_prompt(cart.as_slice());
    let completion = orchestrator.generate(&prompt, HARMONISATION_INSTRUCTION)?;
    let report = validate_groups(&completion)?;
    info!(
        selected = cart.len(),
        groups = report.groups.len(),
        dropped = report.dropped,
        "harmonisation complete"
    );
    Ok(HarmonisationOutcome::Groups(report))
}
