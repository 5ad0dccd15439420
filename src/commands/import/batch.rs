use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::debug;

use super::feeds::FeedSpec;

pub const IMPORT_BATCH_SIZE: usize = 1000;

/// What to do when a row collides with an existing primary key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConflictPolicy {
    /// Keep the stored row and drop the incoming one.
    Ignore,
    /// Fail the batch; the transaction is rolled back.
    Abort,
}

impl ConflictPolicy {
    fn insert_verb(self) -> &'static str {
        match self {
            Self::Ignore => "INSERT OR IGNORE",
            Self::Abort => "INSERT OR ABORT",
        }
    }
}

pub fn insert_sql(feed: &FeedSpec, policy: ConflictPolicy) -> String {
    let placeholders = (1..=feed.column_count())
        .map(|index| format!("?{index}"))
        .collect::<Vec<String>>()
        .join(", ");

    format!(
        "{} INTO {} ({}) VALUES ({})",
        policy.insert_verb(),
        feed.table,
        feed.column_names(),
        placeholders
    )
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub inserted: usize,
    pub ignored_duplicates: usize,
    pub batches_committed: usize,
}

/// Buffers converted rows and commits them in fixed-size transactions.
///
/// A failed flush rolls back the in-flight batch only; batches committed
/// earlier stay in place.
pub struct BatchWriter<'c> {
    connection: &'c mut Connection,
    table: &'static str,
    sql: String,
    batch_size: usize,
    pending: Vec<Vec<Value>>,
    stats: BatchStats,
}

impl<'c> BatchWriter<'c> {
    pub fn new(
        connection: &'c mut Connection,
        feed: &FeedSpec,
        policy: ConflictPolicy,
        batch_size: usize,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            connection,
            table: feed.table,
            sql: insert_sql(feed, policy),
            batch_size,
            pending: Vec::with_capacity(batch_size),
            stats: BatchStats::default(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) -> Result<()> {
        self.pending.push(row);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let tx = self
            .connection
            .transaction()
            .with_context(|| format!("failed to begin batch for {}", self.table))?;

        let mut inserted = 0;
        let mut ignored = 0;
        {
            let mut statement = tx
                .prepare_cached(&self.sql)
                .with_context(|| format!("failed to prepare insert for {}", self.table))?;

            for row in &self.pending {
                let changed = statement
                    .execute(params_from_iter(row.iter()))
                    .with_context(|| format!("failed to insert into {}", self.table))?;
                if changed == 0 {
                    ignored += 1;
                } else {
                    inserted += 1;
                }
            }
        }

        tx.commit()
            .with_context(|| format!("failed to commit batch for {}", self.table))?;

        self.stats.inserted += inserted;
        self.stats.ignored_duplicates += ignored;
        self.stats.batches_committed += 1;
        debug!(
            table = self.table,
            rows = self.pending.len(),
            batch = self.stats.batches_committed,
            "committed batch"
        );
        self.pending.clear();

        Ok(())
    }

    /// Flushes the remainder and returns the running totals.
    pub fn finish(mut self) -> Result<BatchStats> {
        self.flush()?;
        Ok(self.stats)
    }
}
