//! Serving context for query-time operations.
//!
//! An [`ArchiveService`] owns the loaded vector index (read-only for the
//! life of the service) and lazily initializes the embedding model on the
//! first query. All front-end operations go through an explicit service
//! value, so several indexes can coexist in one process and there is no
//! load-order hazard.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::context::{self, ContextError, ContextLine};
use crate::semantic::embeddings::{EmbeddingError, EmbeddingModel};
use crate::semantic::query::{self, SearchError};
use crate::semantic::storage::{IndexStorage, StorageError};
use crate::semantic::VectorIndex;
use crate::transcript::artifact::{self, ArtifactError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("No vector index at {path}; run `logseek index` first")]
    IndexUnavailable { path: PathBuf },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A ranked result at the front-end boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub score: f32,
    pub content: String,
    pub username: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub source_file: String,
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
}

/// Which backing store answers context lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextBackend {
    /// Flattened segment artifacts.
    Segments,
    /// The original transcript file, by physical line number.
    RawFile,
}

/// Query-time service over one persisted index.
pub struct ArchiveService {
    config: Config,
    index: VectorIndex,
    /// Lazily-initialized embedding model; the first search pays the
    /// model load, context lookups never do.
    model: Mutex<Option<EmbeddingModel>>,
}

impl ArchiveService {
    /// Open a service over the persisted index.
    ///
    /// Fails fast with [`ServiceError::IndexUnavailable`] when no index
    /// artifact exists; every query and context request requires a loaded
    /// index.
    pub fn open(config: Config) -> Result<Self, ServiceError> {
        let storage = IndexStorage::new(config.index_path());
        if !storage.exists() {
            return Err(ServiceError::IndexUnavailable {
                path: storage.path().to_path_buf(),
            });
        }

        let index = storage.load(Some(&config.embedding.model))?;
        log::info!(
            "Loaded vector index: {} messages, model '{}'",
            index.len(),
            index.model_name()
        );

        Ok(Self {
            config,
            index,
            model: Mutex::new(None),
        })
    }

    /// The loaded index.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Rank archived messages against a free-text query.
    ///
    /// An empty index is reported and yields an empty result set rather
    /// than an error; embedding failures propagate to the caller.
    pub fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResultItem>, ServiceError> {
        if self.index.is_empty() {
            log::warn!("Search against an empty index: {query:?}");
            return Ok(Vec::new());
        }

        let top_k = top_k.unwrap_or(self.config.search.top_k);

        let mut guard = self
            .model
            .lock()
            .map_err(|e| ServiceError::Internal(format!("Lock poisoned: {e}")))?;
        if guard.is_none() {
            *guard = Some(EmbeddingModel::new(
                &self.config.embedding.model,
                self.config.cache_path(),
            )?);
        }
        let Some(model) = guard.as_ref() else {
            return Err(ServiceError::Internal(
                "embedding model not initialized".to_string(),
            ));
        };

        match query::search(&self.index, model, query, top_k) {
            Ok(hits) => Ok(hits
                .into_iter()
                .map(|hit| {
                    let deep_link = hit.record.deep_link();
                    let record = hit.record;
                    SearchResultItem {
                        score: hit.score,
                        content: record.content,
                        username: record.username,
                        timestamp: record.timestamp,
                        source_file: record.source_file,
                        line_number: record.line_number,
                        deep_link,
                    }
                })
                .collect()),
            Err(SearchError::EmptyIndex) => Ok(Vec::new()),
            Err(SearchError::Embedding(e)) => Err(e.into()),
            Err(e @ SearchError::DimensionMismatch { .. }) => {
                Err(ServiceError::Internal(e.to_string()))
            }
        }
    }

    /// Fetch surrounding lines for a hit.
    ///
    /// `width` falls back to the configured default. The raw-file backend
    /// reopens the original transcript; the segment backend replays the
    /// chunked artifacts.
    pub fn context(
        &self,
        source_file: &str,
        line_number: u32,
        width: Option<u32>,
        backend: ContextBackend,
    ) -> Result<Vec<ContextLine>, ServiceError> {
        let width = width.unwrap_or(self.config.search.context_width);

        match backend {
            ContextBackend::RawFile => {
                let exports = self.config.exports_path();
                let path = find_transcript(&exports, source_file).ok_or_else(|| {
                    ContextError::SourceNotFound {
                        path: exports.join(source_file),
                    }
                })?;
                Ok(context::raw_file_context(&path, line_number, width)?)
            }
            ContextBackend::Segments => {
                let segments = artifact::load_dir(&self.config.chunks_path())?;
                Ok(
                    context::segment_context(&segments, source_file, line_number, width as usize)
                        .into_iter()
                        .map(|entry| ContextLine {
                            line_number: entry.message.line_number,
                            content: entry.message.content,
                            is_target: entry.is_target,
                        })
                        .collect(),
                )
            }
        }
    }
}

/// Transcripts live in per-guild subdirectories of the exports
/// directory; find one by file name.
fn find_transcript(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_transcript(&path, name) {
                return Some(found);
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(name) {
            return Some(path);
        }
    }
    None
}
