//! Semantic indexing and search over chunked transcripts.
//!
//! # Architecture
//!
//! - `embeddings`: fastembed-backed embedding generation behind the
//!   [`Embedder`] seam
//! - `index`: the flattened record/vector parallel arrays and the batch
//!   index builder
//! - `storage`: versioned binary persistence for vectors.bin
//! - `query`: exact cosine-similarity ranking

pub mod embeddings;
pub mod index;
pub mod query;
pub mod storage;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel};
pub use index::{build_index, EmbeddingRecord, IndexError, VectorIndex};
pub use query::{search, SearchError, SearchHit};
pub use storage::{IndexStorage, StorageError};

/// Default embedding model for new indexes.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
