use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::cli::SearchType;
use crate::config::AppConfig;

/// One line of a streamed generation response.
#[derive(Debug, Deserialize)]
struct Fragment {
    response: Option<String>,
}

/// Blocking client for the generation, retrieval and metadata endpoints.
pub struct EnrichmentClient<'a> {
    http: Client,
    config: &'a AppConfig,
}

impl<'a> EnrichmentClient<'a> {
    pub fn new(config: &'a AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, config })
    }

    pub fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
        });
        self.post_streamed(&self.config.generation_url, &body)
    }

    pub fn retrieve(&self, search_type: SearchType, value: &str) -> Result<String> {
        let body = json!({
            "queryType": search_type.as_str(),
            "queryValue": value,
        });
        self.post_streamed(&self.config.rag_url, &body)
    }

    /// Raw response body of the metadata search endpoint.
    pub fn fetch_metadata(&self, value: &str) -> Result<String> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            bail!("metadata search requires an api key (--api-key or MOVIE_LOOKUP_API_KEY)");
        };

        let url = &self.config.metadata_url;
        debug!(url = %url, "requesting metadata");
        let response = self
            .http
            .get(url)
            .query(&[("api_key", api_key), ("query", value)])
            .send()
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        response
            .text()
            .with_context(|| format!("failed to read response from {url}"))
    }

    /// Fetches metadata for the value and asks the generator to summarise it.
    pub fn generate_from_metadata(&self, value: &str) -> Result<String> {
        let metadata = self.fetch_metadata(value)?;
        self.generate(&metadata_prompt(value, &metadata))
    }

    fn post_streamed(&self, url: &str, body: &serde_json::Value) -> Result<String> {
        debug!(url = %url, "posting request");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        collect_fragments(BufReader::new(response))
            .with_context(|| format!("failed to read response from {url}"))
    }
}

/// Joins the `response` field of every JSON line in arrival order. Lines
/// that are not JSON objects are ignored.
pub fn collect_fragments<R: BufRead>(reader: R) -> Result<String> {
    let mut text = String::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Fragment>(trimmed) {
            Ok(Fragment {
                response: Some(fragment),
            }) => text.push_str(&fragment),
            Ok(_) => {}
            Err(err) => debug!(error = %err, "ignoring unparsable response line"),
        }
    }

    Ok(text.trim().to_string())
}

pub fn build_prompt(search_type: SearchType, value: &str) -> String {
    match search_type {
        SearchType::Movie => format!(
            "Provide detailed information about the movie titled: \"{value}\". Include genre, rating, and key cast members."
        ),
        SearchType::Director => format!(
            "List all movies directed by \"{value}\" along with their IMDb ratings and notable actors."
        ),
        SearchType::Genre => format!(
            "Recommend popular movies in the \"{value}\" genre with brief descriptions and ratings."
        ),
        SearchType::Rating => format!(
            "Find movies with an IMDb rating of at least \"{value}\". List the titles and their directors."
        ),
        SearchType::Actor => format!(
            "List movies starring \"{value}\" along with their genres, ratings, and release years."
        ),
        _ => format!("Find information related to: {value}"),
    }
}

pub fn metadata_prompt(value: &str, metadata: &str) -> String {
    format!("User Query: {value}\nTMDb Data: {metadata}")
}
