use std::io::Cursor;
use std::path::Path;

use clap::ValueEnum;
use rusqlite::Connection;

use super::enrich::{build_prompt, collect_fragments, metadata_prompt};
use super::output::{write_json_outcome, write_text_outcome};
use super::router::{
    FLAT_QUERIES, IMDB_QUERIES, Predicate, SearchHits, descriptor, render_predicate,
    search_database, supported_types,
};
use super::run::{SearchBody, SearchRequest, execute, prompt_choice, prompt_line};
use crate::cli::{SearchMethod, SearchType, TableShape};
use crate::config::AppConfig;
use crate::db;

const UNREACHABLE: &str = "http://127.0.0.1:1/unreachable";

fn seed(connection: &Connection) {
    db::ensure_schema(connection).expect("schema should be created");
    connection
        .execute_batch(
            "
            INSERT INTO title_basics VALUES
              ('tt0111161', 'movie', 'The Shawshank Redemption', 'The Shawshank Redemption', 0, 1994, NULL, 142, 'Drama'),
              ('tt1375666', 'movie', 'Inception', 'Inception', 0, 2010, NULL, 148, 'Action,Adventure,Sci-Fi'),
              ('tt0816692', 'movie', 'Interstellar', 'Interstellar', 0, 2014, NULL, 169, 'Adventure,Drama,Sci-Fi'),
              ('tt0000001', 'movie', 'Unrated Short Feature', 'Unrated Short Feature', 0, 1894, NULL, 1, 'Documentary'),
              ('tt9999999', 'tvSeries', 'Inception: The Series', 'Inception: The Series', 0, 2020, NULL, 45, 'Sci-Fi');

            INSERT INTO title_ratings VALUES
              ('tt0111161', 9.3, 2900000),
              ('tt1375666', 8.8, 2500000),
              ('tt0816692', 8.5, 2100000),
              ('tt9999999', 9.9, 10);

            INSERT INTO name_basics VALUES
              ('nm0634240', 'Christopher Nolan', 1970, NULL, 'writer,producer,director', 'tt1375666'),
              ('nm0000138', 'Leonardo DiCaprio', 1974, NULL, 'actor,producer', 'tt1375666'),
              ('nm0000288', 'Anne Hathaway', 1982, NULL, 'actress', 'tt0816692'),
              ('nm0000209', 'Tim Robbins', 1958, NULL, 'actor', 'tt0111161');

            INSERT INTO title_principals VALUES
              ('tt1375666', 1, 'nm0000138', 'actor', NULL, '[\"Cobb\"]'),
              ('tt1375666', 2, 'nm0634240', 'director', NULL, NULL),
              ('tt0816692', 1, 'nm0000288', 'actress', NULL, '[\"Brand\"]'),
              ('tt0816692', 2, 'nm0634240', 'director', NULL, NULL),
              ('tt0111161', 1, 'nm0000209', 'actor', NULL, '[\"Andy\"]');

            INSERT INTO movies(ID, Title, Year, Genre, Director, Rating, Language, Budget) VALUES
              (1, 'Inception', 2010, 'Sci-Fi', 'Nolan', 8.8, 'English', 160000000),
              (2, 'Amelie', 2001, 'Romance', 'Jeunet', 8.3, 'French', 10000000),
              (3, 'Heat', 1995, 'Crime', 'Mann', 8.3, 'English', 60000000),
              (4, 'Parasite', 2019, 'Thriller', 'Bong', 8.5, 'Korean', 11400000);
            ",
        )
        .expect("seed rows should insert");
}

fn seeded() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory DB should open");
    seed(&connection);
    connection
}

fn seeded_file(dir: &Path) -> AppConfig {
    let db_path = dir.join("movies.db");
    let connection = db::open_read_write(&db_path).expect("db file should open");
    seed(&connection);
    drop(connection);

    AppConfig {
        db_path,
        generation_url: UNREACHABLE.to_string(),
        rag_url: UNREACHABLE.to_string(),
        metadata_url: UNREACHABLE.to_string(),
        api_key: Some("test-key".to_string()),
        ..AppConfig::default()
    }
}

fn titles(hits: SearchHits) -> Vec<crate::model::TitleHit> {
    match hits {
        SearchHits::Titles(hits) => hits,
        SearchHits::Movies(_) => panic!("expected joined title results"),
    }
}

fn movies(hits: SearchHits) -> Vec<crate::model::MovieRow> {
    match hits {
        SearchHits::Movies(rows) => rows,
        SearchHits::Titles(_) => panic!("expected flat movie results"),
    }
}

#[test]
fn every_search_type_has_a_flat_descriptor() {
    for search_type in SearchType::ALL {
        assert!(
            descriptor(TableShape::Flat, search_type).is_some(),
            "missing flat descriptor for {}",
            search_type.as_str()
        );
    }
    assert_eq!(FLAT_QUERIES.len(), SearchType::ALL.len());
    assert!(
        FLAT_QUERIES
            .iter()
            .all(|query| matches!(query.predicate, Predicate::Column(_)))
    );
}

#[test]
fn imdb_descriptors_cover_the_joined_search_types() {
    let covered = IMDB_QUERIES
        .iter()
        .map(|query| query.search_type)
        .collect::<Vec<SearchType>>();
    assert_eq!(
        covered,
        vec![
            SearchType::Movie,
            SearchType::Director,
            SearchType::Genre,
            SearchType::Year,
            SearchType::Rating,
            SearchType::Actor,
        ]
    );
    assert!(descriptor(TableShape::Imdb, SearchType::BoxOffice).is_none());
}

#[test]
fn rating_search_returns_only_titles_at_or_above_the_value() {
    let connection = seeded();
    let hits = titles(
        search_database(&connection, TableShape::Imdb, SearchType::Rating, "8.5", 50)
            .expect("search should succeed"),
    );

    let names = hits.iter().map(|hit| hit.title.as_str()).collect::<Vec<&str>>();
    assert_eq!(names, vec!["Inception", "Interstellar", "The Shawshank Redemption"]);
    assert!(hits.iter().all(|hit| hit.rating.is_some_and(|rating| rating >= 8.5)));
}

#[test]
fn flat_rating_search_applies_the_same_threshold() {
    let connection = seeded();
    let rows = movies(
        search_database(&connection, TableShape::Flat, SearchType::Rating, "8.5", 50)
            .expect("search should succeed"),
    );

    let ids = rows.iter().map(|row| row.id).collect::<Vec<i64>>();
    assert_eq!(ids, vec![1, 4]);
}

#[test]
fn movie_search_matches_substrings_and_ignores_non_movie_titles() {
    let connection = seeded();
    let hits = titles(
        search_database(&connection, TableShape::Imdb, SearchType::Movie, "incep", 50)
            .expect("search should succeed"),
    );

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].tconst, "tt1375666");
    assert_eq!(hits[0].year, Some(2010));
    let credits = hits[0]
        .credits
        .iter()
        .map(|credit| format!("{} ({})", credit.name, credit.category))
        .collect::<Vec<String>>();
    assert_eq!(
        credits,
        vec!["Leonardo DiCaprio (actor)", "Christopher Nolan (director)"]
    );
}

#[test]
fn director_search_returns_every_credited_film_with_full_cast() {
    let connection = seeded();
    let hits = titles(
        search_database(&connection, TableShape::Imdb, SearchType::Director, "nolan", 50)
            .expect("search should succeed"),
    );

    let names = hits.iter().map(|hit| hit.title.as_str()).collect::<Vec<&str>>();
    assert_eq!(names, vec!["Inception", "Interstellar"]);
    assert_eq!(hits[1].credits.len(), 2);
}

#[test]
fn actor_search_includes_actresses() {
    let connection = seeded();
    let hits = titles(
        search_database(&connection, TableShape::Imdb, SearchType::Actor, "Hathaway", 50)
            .expect("search should succeed"),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Interstellar");
}

#[test]
fn titles_without_ratings_or_credits_are_still_listed() {
    let connection = seeded();
    let hits = titles(
        search_database(&connection, TableShape::Imdb, SearchType::Year, "1894", 50)
            .expect("search should succeed"),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].rating, None);
    assert!(hits[0].credits.is_empty());
}

#[test]
fn limit_counts_titles_not_credit_rows() {
    let connection = seeded();
    let hits = titles(
        search_database(&connection, TableShape::Imdb, SearchType::Genre, "sci-fi", 1)
            .expect("search should succeed"),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].credits.len(), 2);
}

#[test]
fn numeric_search_types_reject_text_values() {
    let connection = seeded();
    let err = search_database(&connection, TableShape::Imdb, SearchType::Rating, "great", 50)
        .expect_err("non-numeric rating should fail");
    assert!(err.to_string().contains("must be numeric"));
}

#[test]
fn unsupported_search_type_for_schema_is_an_error() {
    let connection = seeded();
    let err = search_database(&connection, TableShape::Imdb, SearchType::Language, "French", 50)
        .expect_err("language is flat-only");
    assert!(err.to_string().contains("not available for the imdb schema"));

    let rows = movies(
        search_database(&connection, TableShape::Flat, SearchType::Language, "French", 50)
            .expect("flat language search should succeed"),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title.as_deref(), Some("Amelie"));
}

#[test]
fn credit_predicate_names_every_category() {
    let actor = descriptor(TableShape::Imdb, SearchType::Actor).expect("actor descriptor");
    let rendered = render_predicate(actor);
    assert!(rendered.contains("p.category IN ('actor', 'actress')"));
    assert!(rendered.contains("n.primaryName LIKE ?1"));
}

#[test]
fn collect_fragments_joins_responses_in_order_and_skips_noise() {
    let body = "{\"response\":\"The \"}\n\
                not json at all\n\
                {\"done\":false}\n\
                {\"response\":\"answer.\"}\n\
                \n\
                {\"response\":\"  \",\"done\":true}\n";

    let text = collect_fragments(Cursor::new(body)).expect("fragments should collect");
    assert_eq!(text, "The answer.");
}

#[test]
fn prompts_follow_the_search_type() {
    assert!(build_prompt(SearchType::Director, "Nolan").contains("directed by \"Nolan\""));
    assert_eq!(
        build_prompt(SearchType::Country, "France"),
        "Find information related to: France"
    );
    assert_eq!(
        metadata_prompt("Heat", "{\"results\":[]}"),
        "User Query: Heat\nTMDb Data: {\"results\":[]}"
    );
}

#[test]
fn external_search_falls_back_to_database_on_connection_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = seeded_file(dir.path());
    let request = SearchRequest {
        method: SearchMethod::External,
        search_type: SearchType::Movie,
        value: "Inception".to_string(),
        shape: TableShape::Imdb,
        limit: 10,
    };

    let outcome = execute(&config, &request).expect("fallback should succeed");

    assert!(outcome.fallback_used);
    assert!(outcome.fallback_reason.is_some());
    assert_eq!(outcome.effective_method, SearchMethod::Database);
    match outcome.body {
        SearchBody::Hits(hits) => assert!(!hits.is_empty()),
        SearchBody::Text(_) => panic!("expected database hits"),
    }
}

#[test]
fn rag_search_falls_back_to_database_on_connection_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = seeded_file(dir.path());
    let request = SearchRequest {
        method: SearchMethod::Rag,
        search_type: SearchType::Director,
        value: "Nolan".to_string(),
        shape: TableShape::Imdb,
        limit: 10,
    };

    let outcome = execute(&config, &request).expect("fallback should succeed");
    assert!(outcome.fallback_used);
    assert_eq!(outcome.requested_method, SearchMethod::Rag);
}

#[test]
fn generate_search_surfaces_connection_errors() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = seeded_file(dir.path());
    let request = SearchRequest {
        method: SearchMethod::Generate,
        search_type: SearchType::Movie,
        value: "Inception".to_string(),
        shape: TableShape::Imdb,
        limit: 10,
    };

    assert!(execute(&config, &request).is_err());
}

#[test]
fn database_search_reports_missing_store() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = AppConfig {
        db_path: dir.path().join("absent.db"),
        ..AppConfig::default()
    };
    let request = SearchRequest {
        method: SearchMethod::Database,
        search_type: SearchType::Movie,
        value: "Inception".to_string(),
        shape: TableShape::Imdb,
        limit: 10,
    };

    let err = execute(&config, &request).expect_err("missing database should fail");
    assert!(err.to_string().contains("database file missing"));
}

#[test]
fn text_output_lists_title_rating_and_credits() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = seeded_file(dir.path());
    let request = SearchRequest {
        method: SearchMethod::Database,
        search_type: SearchType::Movie,
        value: "Inception".to_string(),
        shape: TableShape::Imdb,
        limit: 10,
    };
    let outcome = execute(&config, &request).expect("search should succeed");

    let mut rendered = Vec::new();
    write_text_outcome(&mut rendered, &outcome).expect("text should render");
    let rendered = String::from_utf8(rendered).expect("output should be utf-8");

    assert!(rendered.contains("Title: Inception (2010)"));
    assert!(rendered.contains("IMDb Rating: 8.8"));
    assert!(rendered.contains("- Christopher Nolan (director)"));

    let mut json = Vec::new();
    write_json_outcome(&mut json, &request, &outcome).expect("json should render");
    let parsed: serde_json::Value = serde_json::from_slice(&json).expect("json should parse");
    assert_eq!(parsed["returned"], 1);
    assert_eq!(parsed["titles"][0]["tconst"], "tt1375666");
    assert_eq!(parsed["fallback_used"], false);
}

#[test]
fn prompts_accept_names_and_aliases_case_insensitively() {
    let mut input = Cursor::new("LLAMA\nbox-office\n  Heat  \n");
    let mut prompts = Vec::new();

    let method = prompt_choice(
        &mut input,
        &mut prompts,
        "search method",
        SearchMethod::value_variants(),
    )
    .expect("method should parse");
    let search_type = prompt_choice(
        &mut input,
        &mut prompts,
        "search type",
        &supported_types(TableShape::Flat),
    )
    .expect("type should parse");
    let value = prompt_line(&mut input, &mut prompts, "Enter search value:").expect("value");

    assert_eq!(method, SearchMethod::Generate);
    assert_eq!(search_type, SearchType::BoxOffice);
    assert_eq!(value, "Heat");
    let shown = String::from_utf8(prompts).expect("prompts should be utf-8");
    assert!(shown.contains("Choose search method: (database, generate, rag, external)"));
}

#[test]
fn type_prompt_offers_only_types_the_schema_supports() {
    let imdb_types = supported_types(TableShape::Imdb);
    let mut prompts = Vec::new();

    let mut input = Cursor::new("language\n");
    let err = prompt_choice(&mut input, &mut prompts, "search type", &imdb_types)
        .expect_err("language is not searchable in the imdb tables");
    assert!(err.to_string().contains("invalid search type"));

    let shown = String::from_utf8(prompts).expect("prompts should be utf-8");
    assert!(shown.contains("(movie, director, genre, year, rating, actor)"));
    assert!(!shown.contains("language"));

    let mut prompts = Vec::new();
    let mut input = Cursor::new("Actor\n");
    let choice = prompt_choice(&mut input, &mut prompts, "search type", &imdb_types)
        .expect("actor is searchable in the imdb tables");
    assert_eq!(choice, SearchType::Actor);
    assert_eq!(supported_types(TableShape::Flat).len(), SearchType::ALL.len());
}

#[test]
fn prompts_reject_unknown_choices_and_closed_input() {
    let mut prompts = Vec::new();

    let mut input = Cursor::new("telepathy\n");
    assert!(
        prompt_choice(
            &mut input,
            &mut prompts,
            "search method",
            SearchMethod::value_variants()
        )
        .is_err()
    );

    let mut input = Cursor::new("");
    assert!(prompt_line(&mut input, &mut prompts, "Enter search value:").is_err());
}
