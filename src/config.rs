use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_WIDTH;
use crate::semantic::DEFAULT_MODEL;
use crate::transcript::DEFAULT_WINDOW_MINUTES;

const DEFAULT_EXPORTS_DIR: &str = "discord_exports";
const DEFAULT_CHUNKS_DIR: &str = "discord_jsons";
const DEFAULT_INDEX_FILE: &str = "vectors.bin";
const DEFAULT_TOP_K: usize = 10;

const CONFIG_FILE: &str = "config.yaml";

/// Configuration for transcript chunking
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Grouping window in minutes; messages within the window of a
    /// segment's first message share the segment
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,

    /// When false, every message becomes its own artifact entry
    #[serde(default = "default_group")]
    pub group: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_WINDOW_MINUTES,
            group: true,
        }
    }
}

/// Configuration for embedding generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Configuration for query-time behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of results per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Lines of surrounding context shown on each side of a hit
    #[serde(default = "default_context_width")]
    pub context_width: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            context_width: DEFAULT_WIDTH,
        }
    }
}

fn default_window_minutes() -> i64 {
    DEFAULT_WINDOW_MINUTES
}

fn default_group() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_context_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_exports_dir() -> String {
    DEFAULT_EXPORTS_DIR.to_string()
}

fn default_chunks_dir() -> String {
    DEFAULT_CHUNKS_DIR.to_string()
}

fn default_index_file() -> String {
    DEFAULT_INDEX_FILE.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory of scraped transcript exports (one subdirectory per
    /// guild)
    #[serde(default = "default_exports_dir")]
    pub exports_dir: String,

    /// Directory of chunked segment artifacts
    #[serde(default = "default_chunks_dir")]
    pub chunks_dir: String,

    /// Vector index artifact file
    #[serde(default = "default_index_file")]
    pub index_file: String,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exports_dir: default_exports_dir(),
            chunks_dir: default_chunks_dir(),
            index_file: default_index_file(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            base_path: String::new(),
        }
    }
}

impl Config {
    fn validate(&self) {
        if self.chunking.window_minutes < 0 {
            panic!(
                "chunking.window_minutes must not be negative, got {}",
                self.chunking.window_minutes
            );
        }

        if self.search.top_k == 0 {
            panic!("search.top_k must be greater than 0");
        }

        if self.embedding.model.trim().is_empty() {
            panic!("embedding.model must not be empty");
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let config_path = Path::new(base_path).join(CONFIG_FILE);

        // create new if does not exist
        if !config_path.exists() {
            std::fs::create_dir_all(base_path).expect("cannot create data directory");
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap(),
            )
            .expect("cannot write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = Path::new(&self.base_path).join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str).expect("cannot write config");
    }

    /// The configured grouping window.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.chunking.window_minutes)
    }

    pub fn exports_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.exports_dir)
    }

    pub fn chunks_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.chunks_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.index_file)
    }

    /// Cache directory for downloaded embedding models.
    pub fn cache_path(&self) -> PathBuf {
        Path::new(&self.base_path).to_path_buf()
    }
}
