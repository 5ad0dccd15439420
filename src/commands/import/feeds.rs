use crate::cli::FeedKind;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

#[derive(Copy, Clone, Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Identifier column; a row without it is rejected.
    pub key: bool,
}

const fn key(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        name,
        kind,
        key: true,
    }
}

const fn text(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Text,
        key: false,
    }
}

const fn integer(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Integer,
        key: false,
    }
}

const fn real(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Real,
        key: false,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordFormat {
    /// Comma separated, double quotes protect embedded commas. Every column
    /// is required and the field count must match exactly.
    QuotedComma,
    /// Tab separated with `\N` for absent values. Short rows are padded
    /// with absent values.
    TabLiteral,
}

/// Describes one source file and the table it lands in.
#[derive(Debug)]
pub struct FeedSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub format: RecordFormat,
    pub columns: &'static [ColumnSpec],
}

pub static MOVIES_CSV: FeedSpec = FeedSpec {
    name: "movies.csv",
    table: "movies",
    format: RecordFormat::QuotedComma,
    columns: &[
        key("ID", ColumnKind::Integer),
        text("Title"),
        integer("Year"),
        text("Genre"),
        text("Director"),
        real("Rating"),
    ],
};

pub static TITLE_BASICS: FeedSpec = FeedSpec {
    name: "title.basics",
    table: "title_basics",
    format: RecordFormat::TabLiteral,
    columns: &[
        key("tconst", ColumnKind::Text),
        text("titleType"),
        text("primaryTitle"),
        text("originalTitle"),
        integer("isAdult"),
        integer("startYear"),
        integer("endYear"),
        integer("runtimeMinutes"),
        text("genres"),
    ],
};

pub static TITLE_RATINGS: FeedSpec = FeedSpec {
    name: "title.ratings",
    table: "title_ratings",
    format: RecordFormat::TabLiteral,
    columns: &[
        key("tconst", ColumnKind::Text),
        real("averageRating"),
        integer("numVotes"),
    ],
};

pub static NAME_BASICS: FeedSpec = FeedSpec {
    name: "name.basics",
    table: "name_basics",
    format: RecordFormat::TabLiteral,
    columns: &[
        key("nconst", ColumnKind::Text),
        text("primaryName"),
        integer("birthYear"),
        integer("deathYear"),
        text("primaryProfession"),
        text("knownForTitles"),
    ],
};

pub static TITLE_PRINCIPALS: FeedSpec = FeedSpec {
    name: "title.principals",
    table: "title_principals",
    format: RecordFormat::TabLiteral,
    columns: &[
        key("tconst", ColumnKind::Text),
        key("ordering", ColumnKind::Integer),
        text("nconst"),
        text("category"),
        text("job"),
        text("characters"),
    ],
};

impl FeedSpec {
    pub fn for_kind(kind: FeedKind) -> &'static FeedSpec {
        match kind {
            FeedKind::TitleBasics => &TITLE_BASICS,
            FeedKind::TitleRatings => &TITLE_RATINGS,
            FeedKind::NameBasics => &NAME_BASICS,
            FeedKind::TitlePrincipals => &TITLE_PRINCIPALS,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> String {
        self.columns
            .iter()
            .map(|column| column.name)
            .collect::<Vec<&str>>()
            .join(", ")
    }
}
