use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use super::router::SearchHits;
use super::run::{SearchBody, SearchOutcome, SearchRequest};
use crate::model::{MovieRow, TitleHit};

const SEPARATOR: &str = "-------------------------";

#[derive(Debug, Serialize)]
struct SearchResponse<'a> {
    method: &'static str,
    effective_method: &'static str,
    search_type: &'static str,
    value: &'a str,
    schema: &'static str,
    fallback_used: bool,
    fallback_reason: Option<&'a str>,
    returned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    titles: Option<&'a [TitleHit]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    movies: Option<&'a [MovieRow]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

pub fn write_json_outcome(
    output: &mut impl Write,
    request: &SearchRequest,
    outcome: &SearchOutcome,
) -> Result<()> {
    let (titles, movies, text, returned) = match &outcome.body {
        SearchBody::Hits(SearchHits::Titles(hits)) => (Some(hits.as_slice()), None, None, hits.len()),
        SearchBody::Hits(SearchHits::Movies(rows)) => (None, Some(rows.as_slice()), None, rows.len()),
        SearchBody::Text(text) => (None, None, Some(text.as_str()), 1),
    };

    let response = SearchResponse {
        method: outcome.requested_method.as_str(),
        effective_method: outcome.effective_method.as_str(),
        search_type: request.search_type.as_str(),
        value: &request.value,
        schema: request.shape.as_str(),
        fallback_used: outcome.fallback_used,
        fallback_reason: outcome.fallback_reason.as_deref(),
        returned,
        titles,
        movies,
        text,
    };

    serde_json::to_writer_pretty(&mut *output, &response)
        .context("failed to serialize search json output")?;
    writeln!(output)?;
    Ok(())
}

pub fn write_text_outcome(output: &mut impl Write, outcome: &SearchOutcome) -> Result<()> {
    if outcome.fallback_used {
        writeln!(
            output,
            "{} search failed; showing database results.",
            outcome.requested_method.as_str()
        )?;
    }

    match &outcome.body {
        SearchBody::Text(text) => {
            writeln!(output, "Search Results:")?;
            writeln!(output, "{text}")?;
        }
        SearchBody::Hits(hits) if hits.is_empty() => {
            writeln!(output, "No matching movies found.")?;
        }
        SearchBody::Hits(SearchHits::Titles(hits)) => {
            for hit in hits {
                write_title(output, hit)?;
            }
        }
        SearchBody::Hits(SearchHits::Movies(rows)) => {
            for row in rows {
                write_movie(output, row)?;
            }
        }
    }

    Ok(())
}

fn write_title(output: &mut impl Write, hit: &TitleHit) -> Result<()> {
    match hit.year {
        Some(year) => writeln!(output, "Title: {} ({year})", hit.title)?,
        None => writeln!(output, "Title: {}", hit.title)?,
    }
    writeln!(output, "IMDb Rating: {}", format_rating(hit.rating))?;
    if !hit.credits.is_empty() {
        writeln!(output, "Cast & Crew:")?;
        for credit in &hit.credits {
            writeln!(output, "- {} ({})", credit.name, credit.category)?;
        }
    }
    writeln!(output, "{SEPARATOR}")?;
    Ok(())
}

fn write_movie(output: &mut impl Write, row: &MovieRow) -> Result<()> {
    writeln!(
        output,
        "Title: {}",
        row.title.as_deref().unwrap_or("(untitled)")
    )?;
    writeln!(output, "Rating: {}", format_rating(row.rating))?;

    let fields = [
        ("Year", row.year.map(|year| year.to_string())),
        ("Genre", row.genre.clone()),
        ("Director", row.director.clone()),
        ("Actors", row.actors.clone()),
        ("Language", row.language.clone()),
        ("Country", row.country.clone()),
        ("Budget", row.budget.map(|budget| budget.to_string())),
        ("Box Office", row.box_office.map(|gross| gross.to_string())),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            writeln!(output, "{label}: {value}")?;
        }
    }
    writeln!(output, "{SEPARATOR}")?;
    Ok(())
}

fn format_rating(rating: Option<f64>) -> String {
    rating
        .map(|value| format!("{value:.1}"))
        .unwrap_or_else(|| "n/a".to_string())
}
