use anyhow::{Context, Result, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params};

use crate::cli::{SearchType, TableShape};
use crate::model::{Credit, MovieRow, TitleHit};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Comparison {
    Contains,
    AtLeast,
    Equals,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    Column(&'static str),
    /// Matches titles crediting a person under one of the categories.
    Credit {
        categories: &'static [&'static str],
    },
}

/// How one search type turns into a `WHERE` clause.
#[derive(Copy, Clone, Debug)]
pub struct QueryDescriptor {
    pub search_type: SearchType,
    pub predicate: Predicate,
    pub comparison: Comparison,
    /// Wraps the value in `%` so `Contains` matches anywhere in the column.
    pub wildcard: bool,
}

const fn contains(search_type: SearchType, column: &'static str) -> QueryDescriptor {
    QueryDescriptor {
        search_type,
        predicate: Predicate::Column(column),
        comparison: Comparison::Contains,
        wildcard: true,
    }
}

const fn credited(search_type: SearchType, categories: &'static [&'static str]) -> QueryDescriptor {
    QueryDescriptor {
        search_type,
        predicate: Predicate::Credit { categories },
        comparison: Comparison::Contains,
        wildcard: true,
    }
}

const fn numeric(
    search_type: SearchType,
    column: &'static str,
    comparison: Comparison,
) -> QueryDescriptor {
    QueryDescriptor {
        search_type,
        predicate: Predicate::Column(column),
        comparison,
        wildcard: false,
    }
}

pub static IMDB_QUERIES: &[QueryDescriptor] = &[
    contains(SearchType::Movie, "tb.primaryTitle"),
    credited(SearchType::Director, &["director"]),
    contains(SearchType::Genre, "tb.genres"),
    numeric(SearchType::Year, "tb.startYear", Comparison::Equals),
    numeric(SearchType::Rating, "tr.averageRating", Comparison::AtLeast),
    credited(SearchType::Actor, &["actor", "actress"]),
];

pub static FLAT_QUERIES: &[QueryDescriptor] = &[
    contains(SearchType::Movie, "Title"),
    contains(SearchType::Director, "Director"),
    contains(SearchType::Genre, "Genre"),
    numeric(SearchType::Year, "Year", Comparison::Equals),
    numeric(SearchType::Rating, "Rating", Comparison::AtLeast),
    contains(SearchType::Actor, "Actors"),
    contains(SearchType::Language, "Language"),
    contains(SearchType::Country, "Country"),
    numeric(SearchType::Budget, "Budget", Comparison::AtLeast),
    numeric(SearchType::BoxOffice, "BoxOffice", Comparison::AtLeast),
];

fn queries(shape: TableShape) -> &'static [QueryDescriptor] {
    match shape {
        TableShape::Imdb => IMDB_QUERIES,
        TableShape::Flat => FLAT_QUERIES,
    }
}

pub fn descriptor(shape: TableShape, search_type: SearchType) -> Option<&'static QueryDescriptor> {
    queries(shape)
        .iter()
        .find(|descriptor| descriptor.search_type == search_type)
}

/// Search types the layout can answer, in descriptor order.
pub fn supported_types(shape: TableShape) -> Vec<SearchType> {
    queries(shape)
        .iter()
        .map(|descriptor| descriptor.search_type)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchHits {
    Titles(Vec<TitleHit>),
    Movies(Vec<MovieRow>),
}

impl SearchHits {
    pub fn len(&self) -> usize {
        match self {
            Self::Titles(hits) => hits.len(),
            Self::Movies(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the lookup for one search type and value against the chosen layout.
pub fn search_database(
    connection: &Connection,
    shape: TableShape,
    search_type: SearchType,
    value: &str,
    limit: usize,
) -> Result<SearchHits> {
    let Some(descriptor) = descriptor(shape, search_type) else {
        bail!(
            "search type {} is not available for the {} schema",
            search_type.as_str(),
            shape.as_str()
        );
    };

    let bound = bind_value(descriptor, value)?;
    let predicate = render_predicate(descriptor);
    let limit = i64::try_from(limit.max(1)).unwrap_or(i64::MAX);

    match shape {
        TableShape::Imdb => query_titles(connection, &predicate, bound, limit).map(SearchHits::Titles),
        TableShape::Flat => query_movies(connection, &predicate, bound, limit).map(SearchHits::Movies),
    }
}

pub fn bind_value(descriptor: &QueryDescriptor, raw: &str) -> Result<Value> {
    let value = raw.trim();
    if value.is_empty() {
        bail!("search value must not be empty");
    }

    match descriptor.comparison {
        Comparison::Contains if descriptor.wildcard => Ok(Value::Text(format!("%{value}%"))),
        Comparison::Contains => Ok(Value::Text(value.to_string())),
        Comparison::AtLeast | Comparison::Equals => match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Value::Real(number)),
            _ => bail!(
                "search value for {} must be numeric, got {value:?}",
                descriptor.search_type.as_str()
            ),
        },
    }
}

pub fn render_predicate(descriptor: &QueryDescriptor) -> String {
    let operator = match descriptor.comparison {
        Comparison::Contains => "LIKE",
        Comparison::AtLeast => ">=",
        Comparison::Equals => "=",
    };

    match descriptor.predicate {
        Predicate::Column(column) => format!("{column} {operator} ?1"),
        Predicate::Credit { categories } => {
            let categories = categories
                .iter()
                .map(|category| format!("'{category}'"))
                .collect::<Vec<String>>()
                .join(", ");
            format!(
                "tb.tconst IN (
                   SELECT p.tconst
                   FROM title_principals p
                   JOIN name_basics n ON n.nconst = p.nconst
                   WHERE p.category IN ({categories}) AND n.primaryName {operator} ?1
                 )"
            )
        }
    }
}

fn query_titles(
    connection: &Connection,
    predicate: &str,
    bound: Value,
    limit: i64,
) -> Result<Vec<TitleHit>> {
    let sql = format!(
        "
        WITH matched AS (
          SELECT tb.tconst
          FROM title_basics tb
          LEFT JOIN title_ratings tr ON tr.tconst = tb.tconst
          WHERE tb.titleType = 'movie' AND {predicate}
          ORDER BY tb.primaryTitle, tb.tconst
          LIMIT ?2
        )
        SELECT
          tb.tconst,
          COALESCE(tb.primaryTitle, ''),
          tb.startYear,
          tr.averageRating,
          nb.primaryName,
          tp.category
        FROM matched m
        JOIN title_basics tb ON tb.tconst = m.tconst
        LEFT JOIN title_ratings tr ON tr.tconst = tb.tconst
        LEFT JOIN title_principals tp ON tp.tconst = tb.tconst
        LEFT JOIN name_basics nb ON nb.nconst = tp.nconst
        ORDER BY tb.primaryTitle, tb.tconst, tp.ordering
        "
    );

    let mut statement = connection
        .prepare(&sql)
        .context("failed to prepare title search")?;
    let mut rows = statement.query(params![bound, limit])?;

    let mut hits = Vec::<TitleHit>::new();
    while let Some(row) = rows.next()? {
        let tconst: String = row.get(0)?;
        let name: Option<String> = row.get(4)?;
        let category: Option<String> = row.get(5)?;

        let starts_new_title = hits.last().is_none_or(|hit| hit.tconst != tconst);
        if starts_new_title {
            hits.push(TitleHit {
                tconst,
                title: row.get(1)?,
                year: row.get(2)?,
                rating: row.get(3)?,
                credits: Vec::new(),
            });
        }

        if let (Some(name), Some(category), Some(hit)) = (name, category, hits.last_mut()) {
            let credit = Credit { name, category };
            if !hit.credits.contains(&credit) {
                hit.credits.push(credit);
            }
        }
    }

    Ok(hits)
}

fn query_movies(
    connection: &Connection,
    predicate: &str,
    bound: Value,
    limit: i64,
) -> Result<Vec<MovieRow>> {
    let sql = format!(
        "
        SELECT ID, Title, Year, Genre, Director, Rating, Actors, Language, Country, Budget, BoxOffice
        FROM movies
        WHERE {predicate}
        ORDER BY Title, ID
        LIMIT ?2
        "
    );

    let mut statement = connection
        .prepare(&sql)
        .context("failed to prepare movie search")?;
    let rows = statement.query_map(params![bound, limit], movie_from_row)?;

    rows.collect::<rusqlite::Result<Vec<MovieRow>>>()
        .context("failed to read movie search results")
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<MovieRow> {
    Ok(MovieRow {
        id: row.get(0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        genre: row.get(3)?,
        director: row.get(4)?,
        rating: row.get(5)?,
        actors: row.get(6)?,
        language: row.get(7)?,
        country: row.get(8)?,
        budget: row.get(9)?,
        box_office: row.get(10)?,
    })
}
