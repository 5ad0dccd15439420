use serde::Serialize;

/// Counters for one imported source file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub lines_read: usize,
    pub accepted: usize,
    pub inserted: usize,
    pub ignored_duplicates: usize,
    pub skipped_invalid: usize,
    pub rejected_shape: usize,
    pub batches_committed: usize,
}

impl ImportStats {
    pub fn absorb(&mut self, other: &ImportStats) {
        self.lines_read += other.lines_read;
        self.accepted += other.accepted;
        self.inserted += other.inserted;
        self.ignored_duplicates += other.ignored_duplicates;
        self.skipped_invalid += other.skipped_invalid;
        self.rejected_shape += other.rejected_shape;
        self.batches_committed += other.batches_committed;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub feed: String,
    pub table: String,
    pub path: String,
    pub status: String,
    pub sha256: Option<String>,
    pub stats: Option<ImportStats>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub db_path: String,
    pub totals: ImportStats,
    pub sources: Vec<SourceReport>,
}

/// One credited person on a title, in credit order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credit {
    pub name: String,
    pub category: String,
}

/// A title from the joined IMDb tables with its cast and crew folded in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleHit {
    pub tconst: String,
    pub title: String,
    pub year: Option<i64>,
    pub rating: Option<f64>,
    pub credits: Vec<Credit>,
}

/// A row of the flat `movies` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieRow {
    pub id: i64,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub actors: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub budget: Option<i64>,
    pub box_office: Option<i64>,
}
