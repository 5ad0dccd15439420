use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "1.1.0";

/// Tables whose row counts are reported by `status`.
pub const DATA_TABLES: [&str; 5] = [
    "title_basics",
    "title_ratings",
    "name_basics",
    "title_principals",
    "movies",
];

pub fn open_read_write(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    Ok(connection)
}

pub fn open_read_only(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))
}

/// Pragmas applied to every read-write connection before importing.
const WRITE_PRAGMAS: [(&str, &str); 3] = [
    ("journal_mode", "WAL"),
    ("synchronous", "NORMAL"),
    ("temp_store", "MEMORY"),
];

fn configure_connection(connection: &Connection) -> Result<()> {
    for (pragma, value) in WRITE_PRAGMAS {
        connection
            .pragma_update(None, pragma, value)
            .with_context(|| format!("failed to set {pragma}={value}"))?;
    }
    Ok(())
}

/// Creates every destination table. Safe to call on an existing store.
pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS title_basics (
              tconst TEXT NOT NULL PRIMARY KEY,
              titleType TEXT,
              primaryTitle TEXT,
              originalTitle TEXT,
              isAdult INTEGER,
              startYear INTEGER,
              endYear INTEGER,
              runtimeMinutes INTEGER,
              genres TEXT
            );

            CREATE TABLE IF NOT EXISTS title_ratings (
              tconst TEXT NOT NULL PRIMARY KEY,
              averageRating REAL,
              numVotes INTEGER
            );

            CREATE TABLE IF NOT EXISTS name_basics (
              nconst TEXT NOT NULL PRIMARY KEY,
              primaryName TEXT,
              birthYear INTEGER,
              deathYear INTEGER,
              primaryProfession TEXT,
              knownForTitles TEXT
            );

            CREATE TABLE IF NOT EXISTS title_principals (
              tconst TEXT NOT NULL,
              ordering INTEGER NOT NULL,
              nconst TEXT,
              category TEXT,
              job TEXT,
              characters TEXT,
              PRIMARY KEY (tconst, ordering)
            );

            CREATE TABLE IF NOT EXISTS movies (
              ID INTEGER PRIMARY KEY,
              Title TEXT,
              Year INTEGER,
              Genre TEXT,
              Director TEXT,
              Rating REAL,
              Actors TEXT,
              Language TEXT,
              Country TEXT,
              Budget INTEGER,
              BoxOffice INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_title_basics_primary_title ON title_basics(primaryTitle);
            CREATE INDEX IF NOT EXISTS idx_name_basics_primary_name ON name_basics(primaryName);
            CREATE INDEX IF NOT EXISTS idx_title_principals_nconst ON title_principals(nconst);
            ",
        )
        .context("failed to create schema")?;

    if read_metadata(connection, "db_schema_version")?.is_none() {
        write_metadata(connection, "db_schema_version", DB_SCHEMA_VERSION)?;
    }

    Ok(())
}

pub fn write_metadata(connection: &Connection, key: &str, value: &str) -> Result<()> {
    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )
        .with_context(|| format!("failed to write metadata key {key}"))?;
    Ok(())
}

pub fn read_metadata(connection: &Connection, key: &str) -> Result<Option<String>> {
    connection
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read metadata key {key}"))
}

pub fn mark_imported(connection: &Connection, table: &str) -> Result<()> {
    let now = now_utc_string();
    write_metadata(connection, &format!("last_import:{table}"), &now)?;
    write_metadata(connection, "db_updated_at", &now)
}

pub fn count_rows(connection: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    connection
        .query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows in {table}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_schema_is_idempotent() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_schema(&connection).expect("first schema pass should succeed");
        connection
            .execute(
                "INSERT INTO movies(ID, Title) VALUES(1, 'Inception')",
                [],
            )
            .expect("row should insert");

        ensure_schema(&connection).expect("second schema pass should succeed");

        for table in DATA_TABLES {
            count_rows(&connection, table).expect("every data table should exist");
        }
        assert_eq!(count_rows(&connection, "movies").expect("count"), 1);
        assert_eq!(
            read_metadata(&connection, "db_schema_version")
                .expect("metadata should read")
                .as_deref(),
            Some(DB_SCHEMA_VERSION)
        );
    }

    #[test]
    fn principals_key_is_title_and_ordering() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_schema(&connection).expect("schema should be created");

        connection
            .execute(
                "INSERT INTO title_principals(tconst, ordering, nconst) VALUES('tt1', 1, 'nm1')",
                [],
            )
            .expect("first credit should insert");
        connection
            .execute(
                "INSERT INTO title_principals(tconst, ordering, nconst) VALUES('tt1', 2, 'nm1')",
                [],
            )
            .expect("same person at another position should insert");
        let duplicate = connection.execute(
            "INSERT INTO title_principals(tconst, ordering, nconst) VALUES('tt1', 1, 'nm2')",
            [],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn read_write_connections_use_wal() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let connection =
            open_read_write(&dir.path().join("movies.db")).expect("db file should open");

        let mode: String = connection
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .expect("journal mode should read");
        let synchronous: i64 = connection
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .expect("synchronous should read");
        assert_eq!(mode, "wal");
        assert_eq!(synchronous, 1);
    }

    #[test]
    fn identifier_columns_reject_null() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_schema(&connection).expect("schema should be created");

        for sql in [
            "INSERT INTO title_basics(tconst, primaryTitle) VALUES(NULL, 'x')",
            "INSERT INTO title_ratings(tconst, averageRating) VALUES(NULL, 7.0)",
            "INSERT INTO name_basics(nconst, primaryName) VALUES(NULL, 'x')",
        ] {
            assert!(connection.execute(sql, []).is_err(), "{sql} should fail");
        }

        let ignored = connection
            .execute(
                "INSERT OR IGNORE INTO title_ratings(tconst, averageRating) VALUES(NULL, 7.0)",
                [],
            )
            .expect("ignored insert should not error");
        assert_eq!(ignored, 0);
        assert_eq!(count_rows(&connection, "title_ratings").expect("count"), 0);
    }

    #[test]
    fn mark_imported_records_timestamps() {
        let connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_schema(&connection).expect("schema should be created");
        mark_imported(&connection, "movies").expect("metadata should be written");

        assert!(
            read_metadata(&connection, "last_import:movies")
                .expect("metadata should read")
                .is_some()
        );
        assert!(
            read_metadata(&connection, "db_updated_at")
                .expect("metadata should read")
                .is_some()
        );
    }
}
