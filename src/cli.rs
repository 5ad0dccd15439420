use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "movie-lookup",
    version,
    about = "Import movie data into a local SQLite store and search it"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML file with storage and endpoint settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[arg(long, global = true)]
    pub generation_url: Option<String>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub rag_url: Option<String>,

    #[arg(long, global = true)]
    pub metadata_url: Option<String>,

    #[arg(long, global = true, env = "MOVIE_LOOKUP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the destination tables if they do not exist yet.
    Init,
    ImportCsv(ImportCsvArgs),
    ImportImdb(ImportImdbArgs),
    Search(SearchArgs),
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct ImportCsvArgs {
    #[arg(long, default_value = "movies.csv")]
    pub path: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportImdbArgs {
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Restrict the run to the named feeds; all four when omitted.
    #[arg(long = "feed", value_enum)]
    pub feeds: Vec<FeedKind>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum FeedKind {
    TitleBasics,
    TitleRatings,
    NameBasics,
    TitlePrincipals,
}

impl FeedKind {
    pub const ALL: [FeedKind; 4] = [
        Self::TitleBasics,
        Self::TitleRatings,
        Self::NameBasics,
        Self::TitlePrincipals,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::TitleBasics => "title.basics.tsv",
            Self::TitleRatings => "title.ratings.tsv",
            Self::NameBasics => "name.basics.tsv",
            Self::TitlePrincipals => "title.principals.tsv",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(long, value_enum)]
    pub method: Option<SearchMethod>,

    #[arg(long = "type", value_enum)]
    pub search_type: Option<SearchType>,

    #[arg(long)]
    pub value: Option<String>,

    #[arg(long, value_enum, default_value_t = TableShape::Imdb)]
    pub schema: TableShape,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SearchMethod {
    Database,
    #[value(alias = "llama")]
    Generate,
    Rag,
    External,
}

impl SearchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Generate => "generate",
            Self::Rag => "rag",
            Self::External => "external",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum SearchType {
    Movie,
    Director,
    Genre,
    Year,
    Rating,
    Actor,
    Language,
    Country,
    Budget,
    BoxOffice,
}

impl SearchType {
    pub const ALL: [SearchType; 10] = [
        Self::Movie,
        Self::Director,
        Self::Genre,
        Self::Year,
        Self::Rating,
        Self::Actor,
        Self::Language,
        Self::Country,
        Self::Budget,
        Self::BoxOffice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Director => "director",
            Self::Genre => "genre",
            Self::Year => "year",
            Self::Rating => "rating",
            Self::Actor => "actor",
            Self::Language => "language",
            Self::Country => "country",
            Self::Budget => "budget",
            Self::BoxOffice => "box-office",
        }
    }
}

/// Which of the two table layouts a search runs against.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum TableShape {
    /// `title_basics` joined with ratings, principals and names.
    Imdb,
    /// The single `movies` table filled by `import-csv`.
    Flat,
}

impl TableShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imdb => "imdb",
            Self::Flat => "flat",
        }
    }
}
