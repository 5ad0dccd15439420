use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use crate::cli::GlobalArgs;

pub const DEFAULT_DB_PATH: &str = "movies.db";
pub const DEFAULT_GENERATION_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_RAG_URL: &str = "http://localhost:5000/query";
pub const DEFAULT_METADATA_URL: &str = "https://api.themoviedb.org/3/search/movie";

/// Settings shared by every command, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub generation_url: String,
    pub model: String,
    pub rag_url: String,
    pub metadata_url: String,
    pub api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            generation_url: DEFAULT_GENERATION_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            rag_url: DEFAULT_RAG_URL.to_string(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    generation: GenerationSection,
    #[serde(default)]
    rag: RagSection,
    #[serde(default)]
    metadata: MetadataSection,
}

#[derive(Debug, Deserialize, Default)]
struct StorageSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct GenerationSection {
    url: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RagSection {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MetadataSection {
    url: Option<String>,
    api_key: Option<String>,
}

impl AppConfig {
    /// Layers defaults, the optional TOML file, then command-line flags.
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = &args.config {
            config.apply_file(load_file(path)?);
            debug!(path = %path.display(), "loaded config file");
        }

        if let Some(db_path) = &args.db_path {
            config.db_path = db_path.clone();
        }
        if let Some(url) = &args.generation_url {
            config.generation_url = url.clone();
        }
        if let Some(model) = &args.model {
            config.model = model.clone();
        }
        if let Some(url) = &args.rag_url {
            config.rag_url = url.clone();
        }
        if let Some(url) = &args.metadata_url {
            config.metadata_url = url.clone();
        }
        if let Some(key) = &args.api_key {
            config.api_key = Some(key.clone());
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(path) = file.storage.path {
            self.db_path = path;
        }
        if let Some(url) = file.generation.url {
            self.generation_url = url;
        }
        if let Some(model) = file.generation.model {
            self.model = model;
        }
        if let Some(url) = file.rag.url {
            self.rag_url = url;
        }
        if let Some(url) = file.metadata.url {
            self.metadata_url = url;
        }
        if let Some(key) = file.metadata.api_key {
            self.api_key = Some(key);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.db_path.as_os_str().is_empty() {
            bail!("storage path must not be empty");
        }
        for (name, value) in [
            ("generation url", &self.generation_url),
            ("model", &self.model),
            ("rag url", &self.rag_url),
            ("metadata url", &self.metadata_url),
        ] {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}
