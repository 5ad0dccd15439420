use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db;

pub fn run(config: &AppConfig) -> Result<()> {
    let db_path = &config.db_path;
    info!(path = %db_path.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = db::open_read_only(db_path)?;
    let schema_version = db::read_metadata(&connection, "db_schema_version")
        .unwrap_or_default()
        .unwrap_or_default();
    let updated_at = db::read_metadata(&connection, "db_updated_at")
        .unwrap_or_default()
        .unwrap_or_default();
    info!(
        schema_version = %schema_version,
        updated_at = %updated_at,
        "database status"
    );

    for table in db::DATA_TABLES {
        match table_status(&connection, table) {
            Ok((rows, last_import)) => info!(
                table,
                rows,
                last_import = %last_import.unwrap_or_default(),
                "table status"
            ),
            Err(err) => warn!(table, error = %err, "table unavailable"),
        }
    }

    Ok(())
}

fn table_status(connection: &Connection, table: &str) -> Result<(i64, Option<String>)> {
    let rows = db::count_rows(connection, table)?;
    let last_import = db::read_metadata(connection, &format!("last_import:{table}"))?;
    Ok((rows, last_import))
}
