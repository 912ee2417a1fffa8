//! AI-assisted matching for the cohort catalog.
//!
//! # Overview
//!
//! A [`GenerationService`] turns a prompt plus a system instruction into a
//! completion. The [`Orchestrator`] wraps one with retry and exponential
//! backoff. Three workflows sit on top:
//!
//! - [`discovery`]: answer a research question and suggest variables
//! - [`similarity`]: find substitutes for one variable in other cohorts
//! - [`harmonisation`]: group the selected variables into shared concepts
//!
//! Every confidence floor and structural rule is applied here, never left to
//! the service.
//!
//! # Example
//!
//! ```ignore
//! use cohort_ai::{AiConfig, GeminiClient, Orchestrator, find_similar};
//!
//! let config = AiConfig::load(None)?;
//! let orchestrator = Orchestrator::new(GeminiClient::new(&config)?, config.retry_policy());
//! let outcome = find_similar(&orchestrator, &session.catalog, &variable)?;
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod harmonisation;
pub mod orchestrator;
pub mod response;
pub mod similarity;

pub use client::{GeminiClient, GenerationService};
pub use config::AiConfig;
pub use discovery::{Conversation, DiscoveryReply, Message, Role, Suggestion, TurnState};
pub use error::{GenerationError, Result, WorkflowError};
pub use harmonisation::{
    GroupMember, HarmonisationGroup, HarmonisationOutcome, HarmonisationReport, harmonise,
};
pub use orchestrator::{Orchestrator, RetryPolicy};
pub use similarity::{SimilarVariable, SimilarityMatches, SimilarityOutcome, find_similar};
