use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use tracing::{info, warn};

use super::enrich::{EnrichmentClient, build_prompt};
use super::output::{write_json_outcome, write_text_outcome};
use super::router::{SearchHits, search_database, supported_types};
use crate::cli::{SearchArgs, SearchMethod, SearchType, TableShape};
use crate::config::AppConfig;
use crate::db;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub method: SearchMethod,
    pub search_type: SearchType,
    pub value: String,
    pub shape: TableShape,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchBody {
    Hits(SearchHits),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub requested_method: SearchMethod,
    pub effective_method: SearchMethod,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
    pub body: SearchBody,
}

pub fn run(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut prompts = io::stderr();

    let method = match args.method {
        Some(method) => method,
        None => prompt_choice(
            &mut input,
            &mut prompts,
            "search method",
            SearchMethod::value_variants(),
        )?,
    };
    let search_type = match args.search_type {
        Some(search_type) => search_type,
        None => prompt_choice(
            &mut input,
            &mut prompts,
            "search type",
            &supported_types(args.schema),
        )?,
    };
    let value = match args.value {
        Some(value) => value,
        None => prompt_line(&mut input, &mut prompts, "Enter search value:")?,
    };

    let request = SearchRequest {
        method,
        search_type,
        value: value.trim().to_string(),
        shape: args.schema,
        limit: args.limit.max(1),
    };

    let outcome = execute(config, &request)?;

    info!(
        method = request.method.as_str(),
        effective_method = outcome.effective_method.as_str(),
        search_type = request.search_type.as_str(),
        schema = request.shape.as_str(),
        fallback_used = outcome.fallback_used,
        "search completed"
    );

    let stdout = io::stdout();
    let mut output = io::BufWriter::new(stdout.lock());
    if args.json {
        write_json_outcome(&mut output, &request, &outcome)?;
    } else {
        write_text_outcome(&mut output, &outcome)?;
    }
    output.flush()?;

    Ok(())
}

/// Runs one search. `rag` and `external` fall back to the database when the
/// remote call fails; `generate` has no fallback.
pub fn execute(config: &AppConfig, request: &SearchRequest) -> Result<SearchOutcome> {
    if request.value.trim().is_empty() {
        bail!("search value must not be empty");
    }

    match request.method {
        SearchMethod::Database => database_outcome(config, request, None),
        SearchMethod::Generate => {
            let client = EnrichmentClient::new(config)?;
            let text = client
                .generate(&build_prompt(request.search_type, &request.value))
                .context("failed to fetch generated answer")?;
            Ok(text_outcome(request.method, text))
        }
        SearchMethod::Rag => {
            let client = EnrichmentClient::new(config)?;
            match client.retrieve(request.search_type, &request.value) {
                Ok(text) => Ok(text_outcome(request.method, text)),
                Err(err) => fall_back(config, request, err),
            }
        }
        SearchMethod::External => {
            let client = EnrichmentClient::new(config)?;
            match client.generate_from_metadata(&request.value) {
                Ok(text) => Ok(text_outcome(request.method, text)),
                Err(err) => fall_back(config, request, err),
            }
        }
    }
}

fn fall_back(
    config: &AppConfig,
    request: &SearchRequest,
    err: anyhow::Error,
) -> Result<SearchOutcome> {
    let reason = format!("{err:#}");
    warn!(
        method = request.method.as_str(),
        reason = %reason,
        "enrichment failed; falling back to database search"
    );
    database_outcome(config, request, Some(reason))
        .context("database fallback failed after enrichment error")
}

fn database_outcome(
    config: &AppConfig,
    request: &SearchRequest,
    fallback_reason: Option<String>,
) -> Result<SearchOutcome> {
    if !config.db_path.exists() {
        bail!(
            "database file missing: {}; run `movie-lookup init` or an import first",
            config.db_path.display()
        );
    }

    let connection = db::open_read_only(&config.db_path)?;
    let hits = search_database(
        &connection,
        request.shape,
        request.search_type,
        &request.value,
        request.limit,
    )?;

    Ok(SearchOutcome {
        requested_method: request.method,
        effective_method: SearchMethod::Database,
        fallback_used: fallback_reason.is_some(),
        fallback_reason,
        body: SearchBody::Hits(hits),
    })
}

fn text_outcome(method: SearchMethod, text: String) -> SearchOutcome {
    SearchOutcome {
        requested_method: method,
        effective_method: method,
        fallback_used: false,
        fallback_reason: None,
        body: SearchBody::Text(text),
    }
}

/// Asks for one of `choices`, accepting names and aliases in any case.
pub fn prompt_choice<T: ValueEnum + Copy + PartialEq>(
    input: &mut impl BufRead,
    prompts: &mut impl Write,
    label: &str,
    choices: &[T],
) -> Result<T> {
    let listed = choices
        .iter()
        .filter_map(|choice| choice.to_possible_value())
        .map(|value| value.get_name().to_string())
        .collect::<Vec<String>>()
        .join(", ");

    let answer = prompt_line(input, prompts, &format!("Choose {label}: ({listed})"))?;
    match <T as ValueEnum>::from_str(answer.trim(), true) {
        Ok(choice) if choices.contains(&choice) => Ok(choice),
        _ => bail!("invalid {label}: {answer:?}"),
    }
}

pub fn prompt_line(
    input: &mut impl BufRead,
    prompts: &mut impl Write,
    prompt: &str,
) -> Result<String> {
    writeln!(prompts, "{prompt}")?;
    prompts.flush()?;

    let mut answer = String::new();
    let read = input
        .read_line(&mut answer)
        .context("failed to read from standard input")?;
    if read == 0 {
        bail!("no answer given for: {prompt}");
    }

    Ok(answer.trim().to_string())
}
