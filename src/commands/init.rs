use anyhow::Result;
use tracing::info;

use crate::config::AppConfig;
use crate::db;

pub fn run(config: &AppConfig) -> Result<()> {
    let connection = db::open_read_write(&config.db_path)?;
    db::ensure_schema(&connection)?;

    let version = db::read_metadata(&connection, "db_schema_version")?.unwrap_or_default();
    info!(
        path = %config.db_path.display(),
        schema_version = %version,
        "tables ready"
    );

    Ok(())
}
