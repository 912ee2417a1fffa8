//! Research-question discovery.
//!
//! One turn sends the user's question together with the whole catalog and
//! expects a conversational answer, a delimiter line, then a JSON array of
//! suggested variables.

use std::fmt::Write as _;

use cohort_catalog::Catalog;
use cohort_model::Variable;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::GenerationService;
use crate::orchestrator::Orchestrator;
use crate::response::{lenient_score, lenient_text, parse_json_array};

/// Marker separating the conversational answer from the suggestion list.
pub const SUGGESTIONS_DELIMITER: &str = "SUGGESTIONS:";

/// Suggestions scoring below this (on a 1 to 10 scale) are dropped.
pub const DISCOVERY_SCORE_FLOOR: f64 = 7.0;

/// Assistant reply recorded when the service cannot be reached.
pub const APOLOGY: &str = "I'm sorry, I had trouble processing that request.";

/// A variable the service recommends for the question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub variable_name: String,
    pub cohort_name: String,
    pub reason: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default, deserialize_with = "lenient_text")]
    variable_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    cohort_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    reason: String,
    #[serde(default, deserialize_with = "lenient_score")]
    score: Option<f64>,
}

impl RawSuggestion {
    fn into_trusted(self) -> Option<Suggestion> {
        let score = self.score.filter(|s| *s >= DISCOVERY_SCORE_FLOOR)?;
        Some(Suggestion {
            variable_name: self.variable_name,
            cohort_name: self.cohort_name,
            reason: self.reason,
            score,
        })
    }
}

/// A completion split into its two parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoveryReply {
    /// Text before the delimiter, trimmed. Always kept.
    pub text: String,
    /// Suggestions at or above [`DISCOVERY_SCORE_FLOOR`].
    pub suggestions: Vec<Suggestion>,
}

/// Splits a completion at the first [`SUGGESTIONS_DELIMITER`].
///
/// Unparseable JSON after the delimiter, or no delimiter at all, yields no
/// suggestions but keeps the text.
pub fn parse_discovery_reply(completion: &str) -> DiscoveryReply {
    let (text, tail) = match completion.split_once(SUGGESTIONS_DELIMITER) {
        Some((text, tail)) => (text, Some(tail)),
        None => (completion, None),
    };

    let suggestions = match tail.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tail) => match parse_json_array::<RawSuggestion>(tail) {
            Ok(raw) => raw
                .into_iter()
                .filter_map(RawSuggestion::into_trusted)
                .collect(),
            Err(err) => {
                debug!(error = %err, "discarding unparseable suggestion list");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    DiscoveryReply {
        text: text.trim().to_string(),
        suggestions,
    }
}

/// Builds the system instruction listing every catalog variable.
pub fn build_discovery_instruction(catalog: &Catalog) -> String {
    let mut listing = String::new();
    for v in catalog.variables() {
        let _ = writeln!(
            listing,
            "- {} ({}): {} [Table: {}]",
            v.variable_name, v.cohort_name, v.variable_description, v.table_name
        );
    }

    format!(
        "You are a research assistant for cohort data exploration.\n\
         Available variables:\n\
         {listing}\n\
         Task:\n\
         1. Answer the user's research question concisely.\n\
         2. Provide a list of recommended variables from the dataset in a JSON block at the end.\n\
         \n\
         CRITICAL INSTRUCTION:\n\
         - Only suggest variables that are DIRECTLY relevant to the user's query.\n\
         - You MUST return the \"cohort_name\" EXACTLY as it appears in the list above. Do not shorten or rename it.\n\
         - If the variables are only vaguely related or not useful for the specific question, DO NOT include them.\n\
         - If no variables match, return an empty array [].\n\
         - Assign a relevance score (1-10) to each suggestion.\n\
         \n\
         JSON Format:\n\
         {SUGGESTIONS_DELIMITER}\n\
         [\n  \
         {{ \"variable_name\": \"exact_name\", \"cohort_name\": \"exact_cohort\", \"reason\": \"why relevant\", \"score\": 1-10 }}\n\
         ]"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Only assistant messages carry suggestions.
    pub suggestions: Vec<Suggestion>,
}

impl Message {
    fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            suggestions: Vec::new(),
        }
    }

    fn assistant(reply: DiscoveryReply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.text,
            suggestions: reply.suggestions,
        }
    }
}

/// Progress of the latest turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Sending,
    Succeeded,
    Failed,
}

/// An append-only discovery conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    state: TurnState,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The most recent assistant message, if any.
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Runs one turn.
    ///
    /// A blank question or an empty catalog leaves the log untouched and the
    /// state idle. Otherwise the question is appended, the service is asked,
    /// and exactly one assistant message follows: the parsed reply, or
    /// [`APOLOGY`] if the service could not be reached.
    pub fn ask<G: GenerationService>(
        &mut self,
        orchestrator: &Orchestrator<G>,
        catalog: &Catalog,
        question: &str,
    ) -> TurnState {
        self.state = TurnState::Idle;
        if question.trim().is_empty() || catalog.is_empty() {
            debug!("skipping discovery turn: nothing to ask");
            return self.state;
        }

        self.messages.push(Message::user(question));
        self.state = TurnState::Sending;

        let instruction = build_discovery_instruction(catalog);
        let (message, state) = match orchestrator.generate(question, &instruction) {
            Ok(completion) => {
                let reply = parse_discovery_reply(&completion);
                info!(suggestions = reply.suggestions.len(), "discovery turn answered");
                (Message::assistant(reply), TurnState::Succeeded)
            }
            Err(err) => {
                warn!(error = %err, "discovery turn failed");
                let apology = DiscoveryReply {
                    text: APOLOGY.to_string(),
                    suggestions: Vec::new(),
                };
                (Message::assistant(apology), TurnState::Failed)
            }
        };
        self.messages.push(message);
        self.state = state;
        self.state
    }
}

/// Resolves suggestions to catalog variables by cohort and variable name.
///
/// Suggestions naming a variable the catalog does not have are dropped.
pub fn resolve_suggestions<'c, 's>(
    suggestions: &'s [Suggestion],
    catalog: &'c Catalog,
) -> Vec<(&'s Suggestion, &'c Variable)> {
    suggestions
        .iter()
        .filter_map(|s| {
            catalog
                .find(&s.cohort_name, &s.variable_name)
                .map(|variable| (s, variable))
        })
        .collect()
}
