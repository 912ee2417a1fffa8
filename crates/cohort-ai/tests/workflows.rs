//! Workflow tests against a scripted generation service.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveDate;
use cohort_ai::discovery::{APOLOGY, resolve_suggestions};
use cohort_ai::{
    AiConfig, Conversation, GenerationError, GenerationService, HarmonisationOutcome, Orchestrator,
    RetryPolicy, Role, SimilarityOutcome, TurnState, WorkflowError, find_similar, harmonise,
};
use cohort_catalog::{Cart, Catalog};
use cohort_ingest::{SourceFile, ingest_sources};

/// Replays canned results in order and records every request.
#[derive(Default)]
struct ScriptedService {
    script: RefCell<VecDeque<cohort_ai::Result<String>>>,
    requests: RefCell<Vec<(String, String)>>,
}

impl ScriptedService {
    fn new(script: Vec<cohort_ai::Result<String>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            requests: RefCell::default(),
        }
    }

    fn failing(times: usize) -> Vec<cohort_ai::Result<String>> {
        (0..times)
            .map(|i| {
                Err(GenerationError::Status {
                    status: 503,
                    message: format!("overloaded #{i}"),
                })
            })
            .collect()
    }

    fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl GenerationService for ScriptedService {
    fn generate(&self, prompt: &str, instruction: &str) -> cohort_ai::Result<String> {
        self.requests
            .borrow_mut()
            .push((prompt.to_string(), instruction.to_string()));
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Network("script exhausted".to_string())))
    }
}

fn orchestrator(script: Vec<cohort_ai::Result<String>>) -> Orchestrator<ScriptedService> {
    Orchestrator::new(ScriptedService::new(script), RetryPolicy::new(5, Duration::ZERO))
}

fn catalog(files: &[(&str, &str)]) -> Catalog {
    let sources = files
        .iter()
        .map(|(name, text)| SourceFile::new(*name, *text));
    let report = ingest_sources(sources, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
    let mut catalog = Catalog::new();
    assert!(catalog.append_report(report).is_empty());
    catalog
}

fn two_cohorts() -> Catalog {
    catalog(&[
        (
            "C.csv",
            "var_name,var_label,values,filename\nX,Smoking status,\"Never, Former, Current\",lifestyle\nage,Age,years,demo\n",
        ),
        (
            "D.csv",
            "var_name,var_label,values,filename\nsmoke,Ever smoked,\"Yes, No\",habits\nage_y,Age in years,years,demo\n",
        ),
    ])
}

// === Orchestrator ===

#[test]
fn five_transport_failures_are_terminal() {
    let orchestrator = orchestrator(ScriptedService::failing(5));
    let err = orchestrator.generate("prompt", "instruction").unwrap_err();

    assert!(matches!(err, GenerationError::Exhausted { attempts: 5, .. }));
    assert_eq!(orchestrator.service().calls(), 5);
}

#[test]
fn configured_attempts_never_exceed_five() {
    let config = AiConfig::from_toml_str("max_attempts = 9\nbase_delay_ms = 0").unwrap();
    let orchestrator = Orchestrator::new(
        ScriptedService::new(ScriptedService::failing(9)),
        config.retry_policy(),
    );
    let err = orchestrator.generate("prompt", "").unwrap_err();

    assert!(matches!(err, GenerationError::Exhausted { attempts: 5, .. }));
    assert_eq!(orchestrator.service().calls(), 5);

    let unclamped = Orchestrator::new(
        ScriptedService::new(ScriptedService::failing(9)),
        RetryPolicy::new(9, Duration::ZERO),
    );
    assert!(unclamped.generate("prompt", "").is_err());
    assert_eq!(unclamped.service().calls(), 5);
}

#[test]
fn success_after_four_failures_is_returned() {
    let mut script = ScriptedService::failing(4);
    script.push(Ok("finally".to_string()));
    let orchestrator = orchestrator(script);

    assert_eq!(orchestrator.generate("prompt", "").unwrap(), "finally");
    assert_eq!(orchestrator.service().calls(), 5);
}

#[test]
fn malformed_envelope_is_retried() {
    let orchestrator = orchestrator(vec![
        Err(GenerationError::MalformedEnvelope("no candidates".to_string())),
        Ok("ok".to_string()),
    ]);
    assert_eq!(orchestrator.generate("prompt", "").unwrap(), "ok");
    assert_eq!(orchestrator.service().calls(), 2);
}

#[test]
fn non_transport_errors_are_not_retried() {
    let orchestrator = orchestrator(vec![Err(GenerationError::MissingApiKey)]);
    assert!(matches!(
        orchestrator.generate("prompt", ""),
        Err(GenerationError::MissingApiKey)
    ));
    assert_eq!(orchestrator.service().calls(), 1);
}

// === Discovery ===

#[test]
fn discovery_turn_appends_reply_and_trusted_suggestions() {
    let catalog = two_cohorts();
    let orchestrator = orchestrator(vec![Ok(
        "Here are options.\nSUGGESTIONS:\n[{\"variable_name\":\"X\",\"cohort_name\":\"C\",\"reason\":\"r\",\"score\":8},\
         {\"variable_name\":\"ghost\",\"cohort_name\":\"C\",\"reason\":\"r\",\"score\":9}]"
            .to_string(),
    )]);
    let mut conversation = Conversation::new();

    let state = conversation.ask(&orchestrator, &catalog, "Which smoking variables exist?");

    assert_eq!(state, TurnState::Succeeded);
    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Which smoking variables exist?");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Here are options.");
    assert_eq!(messages[1].suggestions.len(), 2);

    let resolved = resolve_suggestions(&messages[1].suggestions, &catalog);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].1.variable_description, "Smoking status");

    let requests = orchestrator.service().requests.borrow();
    let (prompt, instruction) = &requests[0];
    assert_eq!(prompt, "Which smoking variables exist?");
    assert!(instruction.contains("- X (C): Smoking status [Table: lifestyle]"));
    assert!(instruction.contains("- age_y (D): Age in years [Table: demo]"));
    assert!(instruction.contains("SUGGESTIONS:"));
}

#[test]
fn discovery_low_scores_keep_the_reply() {
    let catalog = two_cohorts();
    let orchestrator = orchestrator(vec![Ok(
        "Here are options.\nSUGGESTIONS:\n[{\"variable_name\":\"X\",\"cohort_name\":\"C\",\"reason\":\"r\",\"score\":5}]"
            .to_string(),
    )]);
    let mut conversation = Conversation::new();
    conversation.ask(&orchestrator, &catalog, "smoking?");

    let reply = conversation.last_reply().unwrap();
    assert_eq!(reply.content, "Here are options.");
    assert!(reply.suggestions.is_empty());
}

#[test]
fn discovery_transport_failure_appends_apology() {
    let catalog = two_cohorts();
    let mut script = ScriptedService::failing(5);
    script.push(Ok("Second answer.".to_string()));
    let orchestrator = orchestrator(script);
    let mut conversation = Conversation::new();

    assert_eq!(
        conversation.ask(&orchestrator, &catalog, "first?"),
        TurnState::Failed
    );
    assert_eq!(conversation.last_reply().unwrap().content, APOLOGY);

    assert_eq!(
        conversation.ask(&orchestrator, &catalog, "second?"),
        TurnState::Succeeded
    );
    let contents: Vec<&str> = conversation
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["first?", APOLOGY, "second?", "Second answer."]);
}

#[test]
fn discovery_skips_blank_questions_and_empty_catalogs() {
    let orchestrator = orchestrator(vec![Ok("unused".to_string())]);
    let mut conversation = Conversation::new();

    assert_eq!(
        conversation.ask(&orchestrator, &two_cohorts(), "   "),
        TurnState::Idle
    );
    assert_eq!(
        conversation.ask(&orchestrator, &Catalog::new(), "anything?"),
        TurnState::Idle
    );
    assert!(conversation.messages().is_empty());
    assert_eq!(orchestrator.service().calls(), 0);
}

// === Similarity ===

#[test]
fn similarity_without_other_cohorts_makes_no_call() {
    let catalog = catalog(&[("C.csv", "var_name,filename\nX,t\nY,t\n")]);
    let orchestrator = orchestrator(vec![]);
    let source = catalog.variables()[0].clone();

    let outcome = find_similar(&orchestrator, &catalog, &source).unwrap();
    assert_eq!(outcome, SimilarityOutcome::NoOtherCohorts);
    assert_eq!(orchestrator.service().calls(), 0);
}

#[test]
fn similarity_keeps_resolved_matches_above_floor() {
    let catalog = two_cohorts();
    let source = catalog.find("C", "X").unwrap().clone();
    let orchestrator = orchestrator(vec![Ok("```json\n[\
         {\"variable_name\":\"smoke\",\"cohort_name\":\"D\",\"reason\":\"same habit\",\"similarity_score\":85},\
         {\"variable_name\":\"age_y\",\"cohort_name\":\"D\",\"reason\":\"unrelated\",\"similarity_score\":10},\
         {\"variable_name\":\"pack_years\",\"cohort_name\":\"D\",\"reason\":\"invented\",\"similarity_score\":95}\
         ]\n```"
        .to_string())]);

    let SimilarityOutcome::Matches(matches) = find_similar(&orchestrator, &catalog, &source).unwrap()
    else {
        panic!("expected matches");
    };
    assert_eq!(matches.candidates_offered, 2);
    assert!(!matches.truncated);
    assert_eq!(matches.results.len(), 1);
    assert_eq!(matches.results[0].variable.variable_name, "smoke");
    assert_eq!(matches.results[0].similarity_score, 85.0);
    assert!(matches.results.iter().all(|r| r.similarity_score >= 70.0));

    let requests = orchestrator.service().requests.borrow();
    assert!(requests[0].0.contains("smoke | D | Ever smoked"));
    assert!(!requests[0].0.contains("age | C | Age"));
}

#[test]
fn similarity_caps_candidates() {
    let mut big = String::from("var_name,filename\n");
    for i in 0..305 {
        let _ = writeln!(big, "v{i},t");
    }
    let catalog = catalog(&[("C.csv", "var_name,filename\nX,t\n"), ("D.csv", big.as_str())]);
    let source = catalog.find("C", "X").unwrap().clone();
    let orchestrator = orchestrator(vec![Ok("[]".to_string())]);

    let SimilarityOutcome::Matches(matches) = find_similar(&orchestrator, &catalog, &source).unwrap()
    else {
        panic!("expected matches");
    };
    assert_eq!(matches.candidates_offered, 300);
    assert!(matches.truncated);
    assert!(matches.results.is_empty());

    let requests = orchestrator.service().requests.borrow();
    assert!(requests[0].0.contains("v299 | D |"));
    assert!(!requests[0].0.contains("v300 | D |"));
}

#[test]
fn similarity_failures_are_explicit_errors() {
    let catalog = two_cohorts();
    let source = catalog.find("C", "X").unwrap().clone();

    let orchestrator_down = orchestrator(ScriptedService::failing(5));
    assert!(matches!(
        find_similar(&orchestrator_down, &catalog, &source),
        Err(WorkflowError::Generation(GenerationError::Exhausted { .. }))
    ));

    let orchestrator_prose = orchestrator(vec![Ok("I found nothing.".to_string())]);
    let err = find_similar(&orchestrator_prose, &catalog, &source).unwrap_err();
    assert!(err.is_response_error());
    assert_eq!(orchestrator_prose.service().calls(), 1);
}

// === Harmonisation ===

#[test]
fn harmonisation_needs_two_selected() {
    let catalog = two_cohorts();
    let mut cart = Cart::new();
    cart.add(&catalog.variables()[0]);
    let orchestrator = orchestrator(vec![]);

    assert_eq!(
        harmonise(&orchestrator, &cart).unwrap(),
        HarmonisationOutcome::NotEnoughSelected
    );
    assert_eq!(orchestrator.service().calls(), 0);
}

#[test]
fn harmonisation_enforces_cross_cohort_groups() {
    let catalog = two_cohorts();
    let mut cart = Cart::new();
    cart.add_all(catalog.variables());
    let orchestrator = orchestrator(vec![Ok(r#"[
        {"harmonised_name":"smoking","description":"Smoking","reasoning":"same habit",
         "standardized_values":"never/ever",
         "variables":[{"original_name":"X","cohort":"C","mapping":"Former, Current -> ever"},
                      {"original_name":"smoke","cohort":"D","mapping":"Yes -> ever"}]},
        {"harmonised_name":"age","description":"Age","reasoning":"same cohort only",
         "standardized_values":"years",
         "variables":[{"original_name":"age","cohort":"C","mapping":""},
                      {"original_name":"age","cohort":"C","mapping":""}]}
    ]"#
    .to_string())]);

    let HarmonisationOutcome::Groups(report) = harmonise(&orchestrator, &cart).unwrap() else {
        panic!("expected groups");
    };
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].harmonised_name, "smoking");
    assert_eq!(report.dropped, 1);

    let requests = orchestrator.service().requests.borrow();
    let (prompt, instruction) = &requests[0];
    assert!(prompt.contains("- X (C): Smoking status. Values: Never, Former, Current"));
    assert!(prompt.contains("- age_y (D): Age in years. Values: years"));
    assert!(instruction.contains("harmonisation expert"));
}

#[test]
fn harmonisation_parse_failure_is_not_retried() {
    let catalog = two_cohorts();
    let mut cart = Cart::new();
    cart.add_all(catalog.variables());
    let orchestrator = orchestrator(vec![Ok("Groups: smoking".to_string())]);

    let err = harmonise(&orchestrator, &cart).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidJson(_)));
    assert_eq!(orchestrator.service().calls(), 1);
}
