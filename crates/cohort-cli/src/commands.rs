use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use tracing::{info, info_span, warn};

use cohort_ai::discovery::resolve_suggestions;
use cohort_ai::harmonisation::{HARMONISATION_FAILURE_NOTICE, MIN_SELECTION};
use cohort_ai::similarity::{NO_OTHER_COHORTS_NOTICE, SIMILARITY_FAILURE_NOTICE};
use cohort_ai::{
    AiConfig, Conversation, GeminiClient, HarmonisationOutcome, Orchestrator, SimilarityOutcome,
    TurnState, WorkflowError, find_similar, harmonise,
};
use cohort_catalog::{BrowseFilter, Session};
use cohort_ingest::{EXPORT_FILE_NAME, ingest_paths};
use cohort_model::VariableKey;

use crate::cli::{BrowseArgs, DiscoverArgs, ExportArgs, InputArgs, SelectionArgs, SimilarArgs};
use crate::summary::{
    print_cohorts, print_failures, print_harmonisation, print_reply, print_similar,
    print_variables,
};

/// A loaded session and whether every input file was ingested.
pub struct Loaded {
    pub session: Session,
    pub complete: bool,
}

/// Ingests the input paths into a fresh session.
///
/// Per-file failures are printed and reported through [`Loaded::complete`];
/// only a catalog with no cohorts at all is an error.
pub fn load_session(input: &InputArgs) -> Result<Loaded> {
    let span = info_span!("ingest", paths = input.paths.len());
    let _guard = span.enter();

    let report = ingest_paths(&input.paths, Local::now().date_naive());
    let mut session = Session::new();
    let failures = session.ingest(report);
    print_failures(&failures);

    if session.catalog.is_empty() {
        bail!("no cohort metadata could be loaded");
    }
    info!(
        cohorts = session.catalog.cohort_count(),
        variables = session.catalog.variable_count(),
        failed = failures.len(),
        "session loaded"
    );
    Ok(Loaded {
        session,
        complete: failures.is_empty(),
    })
}

pub fn run_cohorts(args: &InputArgs) -> Result<bool> {
    let Loaded { session, complete } = load_session(args)?;
    print_cohorts(&session.catalog);
    Ok(complete)
}

pub fn run_browse(args: &BrowseArgs) -> Result<bool> {
    let Loaded { session, complete } = load_session(&args.input)?;
    let filter = BrowseFilter {
        search: args.search.clone(),
        cohort: args.cohort.clone(),
        table: args.table.clone(),
        min_completeness: args.min_completeness,
    }
    .to_filter();
    let groups = session.catalog.grouped(&filter);
    print_variables(&groups);
    Ok(complete)
}

pub fn run_discover(args: &DiscoverArgs, config: Option<&Path>) -> Result<bool> {
    let Loaded { session, complete } = load_session(&args.input)?;
    if args.question.trim().is_empty() {
        bail!("the question is empty");
    }
    let orchestrator = build_orchestrator(config)?;

    let span = info_span!("discover");
    let _guard = span.enter();
    let mut conversation = Conversation::new();
    let state = conversation.ask(&orchestrator, &session.catalog, &args.question);
    if let Some(reply) = conversation.last_reply() {
        let resolved = resolve_suggestions(&reply.suggestions, &session.catalog);
        print_reply(reply, &resolved);
    }
    Ok(complete && state == TurnState::Succeeded)
}

pub fn run_similar(args: &SimilarArgs, config: Option<&Path>) -> Result<bool> {
    let Loaded { session, complete } = load_session(&args.input)?;
    let key = VariableKey::new(&args.cohort, &args.table, &args.variable);
    let source = session
        .catalog
        .resolve(&key)
        .with_context(|| format!("select source variable {key}"))?;
    let orchestrator = build_orchestrator(config)?;

    let span = info_span!("similar", variable = %key);
    let _guard = span.enter();
    let outcome = find_similar(&orchestrator, &session.catalog, source)
        .map_err(|error| workflow_failure(SIMILARITY_FAILURE_NOTICE, &error))?;
    match outcome {
        SimilarityOutcome::NoOtherCohorts => println!("{NO_OTHER_COHORTS_NOTICE}"),
        SimilarityOutcome::Matches(matches) => print_similar(source, &matches),
    }
    Ok(complete)
}

pub fn run_harmonise(args: &SelectionArgs, config: Option<&Path>) -> Result<bool> {
    let Loaded {
        mut session,
        complete,
    } = load_session(&args.input)?;
    apply_selection(&mut session, args)?;
    if session.cart.len() < MIN_SELECTION {
        println!("Select at least {MIN_SELECTION} variables to harmonise.");
        return Ok(false);
    }
    let orchestrator = build_orchestrator(config)?;

    let span = info_span!("harmonise", selected = session.cart.len());
    let _guard = span.enter();
    let outcome = harmonise(&orchestrator, &session.cart)
        .map_err(|error| workflow_failure(HARMONISATION_FAILURE_NOTICE, &error))?;
    match outcome {
        HarmonisationOutcome::NotEnoughSelected => {
            println!("Select at least {MIN_SELECTION} variables to harmonise.");
            Ok(false)
        }
        HarmonisationOutcome::Groups(report) => {
            print_harmonisation(&report);
            Ok(complete)
        }
    }
}

pub fn run_export(args: &ExportArgs) -> Result<bool> {
    let Loaded {
        mut session,
        complete,
    } = load_session(&args.selection.input)?;
    apply_selection(&mut session, &args.selection)?;
    if session.cart.is_empty() {
        bail!("nothing selected; use --select or --select-table");
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| EXPORT_FILE_NAME.into());
    std::fs::write(&output, session.cart.export_csv())
        .with_context(|| format!("write {}", output.display()))?;
    info!(path = %output.display(), variables = session.cart.len(), "selection exported");
    println!(
        "Exported {} variable(s) from {} cohort(s) to {}",
        session.cart.len(),
        session.cart.cohorts().len(),
        output.display()
    );
    Ok(complete)
}

/// Adds the selected variables and tables to the session's cart.
///
/// A selector that names nothing in the catalog is an error.
fn apply_selection(session: &mut Session, args: &SelectionArgs) -> Result<()> {
    for selector in &args.select {
        session
            .select(&selector.0)
            .with_context(|| format!("select {}", selector.0))?;
    }
    for selector in &args.select_table {
        let added = session
            .select_table(&selector.cohort, &selector.table)
            .with_context(|| format!("select table {selector}"))?;
        info!(table = %selector, added, "table selected");
    }
    Ok(())
}

/// Turns a workflow error into the notice shown to the user.
///
/// The full error chain goes to the log.
fn workflow_failure(notice: &str, error: &WorkflowError) -> anyhow::Error {
    warn!(error = %error, response_error = error.is_response_error(), "workflow failed");
    anyhow!("{notice} {}", error.user_message())
}

fn build_orchestrator(config: Option<&Path>) -> Result<Orchestrator<GeminiClient>> {
    let config = AiConfig::load(config).context("load generation-service config")?;
    let client = GeminiClient::new(&config).context("create generation client")?;
    Ok(Orchestrator::new(client, config.retry_policy()))
}
