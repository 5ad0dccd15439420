use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{error, info, warn};

use super::batch::{ConflictPolicy, IMPORT_BATCH_SIZE};
use super::feeds::{FeedSpec, MOVIES_CSV};
use super::pipeline::import_records;
use crate::cli::{FeedKind, ImportCsvArgs, ImportImdbArgs};
use crate::config::AppConfig;
use crate::db;
use crate::model::{ImportRunManifest, ImportStats, SourceReport};
use crate::util::{
    now_utc_string, rfc3339_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub fn run_csv(config: &AppConfig, args: ImportCsvArgs) -> Result<()> {
    execute_import(config, &[(&MOVIES_CSV, args.path)], args.manifest_path)
}

pub fn run_imdb(config: &AppConfig, args: ImportImdbArgs) -> Result<()> {
    let kinds = selected_feeds(&args.feeds);
    let sources = kinds
        .into_iter()
        .map(|kind| (FeedSpec::for_kind(kind), args.data_dir.join(kind.file_name())))
        .collect::<Vec<(&'static FeedSpec, PathBuf)>>();

    execute_import(config, &sources, args.manifest_path)
}

/// Keeps the canonical feed order and drops repeats.
fn selected_feeds(requested: &[FeedKind]) -> Vec<FeedKind> {
    if requested.is_empty() {
        return FeedKind::ALL.to_vec();
    }
    FeedKind::ALL
        .into_iter()
        .filter(|kind| requested.contains(kind))
        .collect()
}

fn execute_import(
    config: &AppConfig,
    sources: &[(&'static FeedSpec, PathBuf)],
    manifest_path: Option<PathBuf>,
) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("import-{}", utc_compact_string(started_ts));
    let manifest_path = manifest_path.unwrap_or_else(|| {
        db_directory(&config.db_path)
            .join("manifests")
            .join(format!("import_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(db_path = %config.db_path.display(), run_id = %run_id, "starting import");

    let mut connection = db::open_read_write(&config.db_path)?;
    db::ensure_schema(&connection)?;

    let mut totals = ImportStats::default();
    let mut reports = Vec::with_capacity(sources.len());
    let mut failed = Vec::new();

    for (feed, path) in sources {
        info!(source = feed.name, path = %path.display(), "importing");
        let report = match import_source(&mut connection, path, feed) {
            Ok(stats) => {
                totals.absorb(&stats);
                info!(
                    source = feed.name,
                    table = feed.table,
                    accepted = stats.accepted,
                    inserted = stats.inserted,
                    ignored_duplicates = stats.ignored_duplicates,
                    skipped_invalid = stats.skipped_invalid,
                    rejected_shape = stats.rejected_shape,
                    batches = stats.batches_committed,
                    "source imported"
                );
                let sha256 = match sha256_file(path) {
                    Ok(digest) => Some(digest),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "could not hash source");
                        None
                    }
                };
                SourceReport {
                    feed: feed.name.to_string(),
                    table: feed.table.to_string(),
                    path: path.display().to_string(),
                    status: "completed".to_string(),
                    sha256,
                    stats: Some(stats),
                    failure_reason: None,
                }
            }
            Err(err) => {
                error!(source = feed.name, error = %format!("{err:#}"), "source import failed");
                failed.push(feed.name);
                SourceReport {
                    feed: feed.name.to_string(),
                    table: feed.table.to_string(),
                    path: path.display().to_string(),
                    status: "failed".to_string(),
                    sha256: None,
                    stats: None,
                    failure_reason: Some(format!("{err:#}")),
                }
            }
        };
        reports.push(report);
    }

    let manifest = ImportRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: db::read_metadata(&connection, "db_schema_version")?
            .unwrap_or_else(|| db::DB_SCHEMA_VERSION.to_string()),
        status: if failed.is_empty() {
            "completed".to_string()
        } else {
            "completed_with_errors".to_string()
        },
        started_at: rfc3339_string(started_ts),
        updated_at: now_utc_string(),
        command: std::env::args().collect::<Vec<String>>().join(" "),
        db_path: config.db_path.display().to_string(),
        totals,
        sources: reports,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote import run manifest");

    if !failed.is_empty() {
        bail!("failed to import {}", failed.join(", "));
    }

    info!(
        inserted = totals.inserted,
        skipped_invalid = totals.skipped_invalid,
        "import completed"
    );
    Ok(())
}

/// Imports one file into its table. Failing to open the file is fatal for
/// this source only.
pub fn import_source(
    connection: &mut Connection,
    path: &Path,
    feed: &FeedSpec,
) -> Result<ImportStats> {
    let file = File::open(path)
        .with_context(|| format!("failed to open {}: {}", feed.name, path.display()))?;
    let stats = import_records(
        connection,
        BufReader::new(file),
        feed,
        ConflictPolicy::Ignore,
        IMPORT_BATCH_SIZE,
    )?;
    db::mark_imported(connection, feed.table)?;
    Ok(stats)
}

fn db_directory(db_path: &Path) -> &Path {
    db_path.parent().unwrap_or_else(|| Path::new(""))
}
