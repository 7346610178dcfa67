//! The vector index: embeddings and per-message metadata as parallel
//! arrays.
//!
//! `records[i]` describes embedding row `i`. The two arrays are built
//! together in one pass and never patched afterwards; the only update
//! path is a full rebuild.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::semantic::embeddings::{Embedder, EmbeddingError};
use crate::transcript::chunker::Segment;
use crate::transcript::{DiscordRef, Message};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Embedder returned {rows} vectors for {records} records")]
    RowCountMismatch { rows: usize, records: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Metadata carried alongside one embedding row.
///
/// This is the flattened, index-time view of a [`Message`]; it keeps the
/// content so results can be rendered without reopening transcripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub content: String,
    pub line_number: u32,
    pub timestamp: Option<DateTime<Utc>>,
    pub username: Option<String>,
    pub source_file: String,
    #[serde(
        rename = "discord_info",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub discord: Option<DiscordRef>,
}

impl EmbeddingRecord {
    fn from_message(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            line_number: message.line_number,
            timestamp: message.timestamp,
            username: message.username.clone(),
            source_file: message.source_file.clone(),
            discord: message.discord,
        }
    }

    /// Deep link into the chat client, when provenance is known.
    pub fn deep_link(&self) -> Option<String> {
        self.discord.map(|d| d.deep_link())
    }
}

/// Read-only snapshot of all embedded messages.
#[derive(Debug)]
pub struct VectorIndex {
    model_name: String,
    dimensions: usize,
    /// Row-major `len() * dimensions` values.
    embeddings: Vec<f32>,
    records: Vec<EmbeddingRecord>,
}

impl VectorIndex {
    /// Assemble an index from parts, checking the parallel-array
    /// invariant.
    pub fn from_parts(
        model_name: String,
        dimensions: usize,
        embeddings: Vec<f32>,
        records: Vec<EmbeddingRecord>,
    ) -> Result<Self, IndexError> {
        if embeddings.len() != records.len() * dimensions {
            return Err(IndexError::RowCountMismatch {
                rows: embeddings.len() / dimensions.max(1),
                records: records.len(),
            });
        }

        Ok(Self {
            model_name,
            dimensions,
            embeddings,
            records,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed messages.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding row `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.embeddings[i * self.dimensions..(i + 1) * self.dimensions]
    }

    pub fn record(&self, i: usize) -> &EmbeddingRecord {
        &self.records[i]
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub(crate) fn embeddings(&self) -> &[f32] {
        &self.embeddings
    }
}

/// Flatten segments and embed every non-empty message in one batch call.
///
/// Messages with empty content never enter the index. Order is preserved:
/// segment order across files, message order within segments. An empty
/// surviving set produces an empty index; the caller decides how to
/// report that.
pub fn build_index(
    segments: &[Segment],
    embedder: &dyn Embedder,
) -> Result<VectorIndex, IndexError> {
    let mut contents = Vec::new();
    let mut records = Vec::new();

    for segment in segments {
        for message in &segment.messages {
            if message.content.is_empty() {
                continue;
            }
            contents.push(message.content.clone());
            records.push(EmbeddingRecord::from_message(message));
        }
    }

    let dimensions = embedder.dimensions();
    let model_name = embedder.model_name().to_string();

    if contents.is_empty() {
        return VectorIndex::from_parts(model_name, dimensions, Vec::new(), Vec::new());
    }

    let vectors = embedder.embed_batch(&contents)?;
    if vectors.len() != records.len() {
        return Err(IndexError::RowCountMismatch {
            rows: vectors.len(),
            records: records.len(),
        });
    }

    let mut embeddings = Vec::with_capacity(records.len() * dimensions);
    for vector in vectors {
        if vector.len() != dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                got: vector.len(),
            });
        }
        embeddings.extend_from_slice(&vector);
    }

    VectorIndex::from_parts(model_name, dimensions, embeddings, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::MockEmbedder;
    use chrono::TimeZone;

    fn message(line: u32, content: &str) -> Message {
        Message {
            line_number: line,
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            username: Some("user".to_string()),
            content: content.to_string(),
            source_file: "chat.txt".to_string(),
            discord: None,
        }
    }

    fn segment(messages: Vec<Message>) -> Segment {
        Segment {
            timestamp: messages.first().and_then(|m| m.timestamp),
            source_file: "chat.txt".to_string(),
            messages,
        }
    }

    #[test]
    fn build_preserves_order_across_segments() {
        let embedder = MockEmbedder::new();
        let segments = vec![
            segment(vec![message(1, "hello world"), message(2, "goodbye world")]),
            segment(vec![message(9, "hello again")]),
        ];

        let index = build_index(&segments, &embedder).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.record(0).line_number, 1);
        assert_eq!(index.record(1).line_number, 2);
        assert_eq!(index.record(2).line_number, 9);
        assert_eq!(index.model_name(), embedder.model_name());
        assert_eq!(index.dimensions(), embedder.dimensions());
    }

    #[test]
    fn empty_content_is_skipped() {
        let embedder = MockEmbedder::new();
        let segments = vec![segment(vec![message(1, ""), message(2, "hello")])];

        let index = build_index(&segments, &embedder).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.record(0).line_number, 2);
    }

    #[test]
    fn no_content_yields_empty_index() {
        let embedder = MockEmbedder::new();
        let segments = vec![segment(vec![message(1, "")])];

        let index = build_index(&segments, &embedder).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), embedder.dimensions());
    }

    #[test]
    fn provenance_is_carried_into_records() {
        let embedder = MockEmbedder::new();
        let mut msg = message(4, "hello");
        msg.discord = Some(DiscordRef {
            guild_id: 1,
            channel_id: 2,
            message_id: 3,
        });

        let index = build_index(&[segment(vec![msg])], &embedder).unwrap();
        assert_eq!(
            index.record(0).deep_link().as_deref(),
            Some("discord://channels/1/2/3")
        );
    }

    #[test]
    fn rows_match_dimensions() {
        let embedder = MockEmbedder::new();
        let index = build_index(&[segment(vec![message(1, "hello world")])], &embedder).unwrap();
        assert_eq!(index.row(0).len(), embedder.dimensions());
    }

    #[test]
    fn from_parts_rejects_mismatched_arrays() {
        let records = vec![EmbeddingRecord {
            content: "hi".to_string(),
            line_number: 1,
            timestamp: None,
            username: None,
            source_file: "chat.txt".to_string(),
            discord: None,
        }];

        let result = VectorIndex::from_parts("m".to_string(), 3, vec![0.0; 2], records);
        assert!(matches!(result, Err(IndexError::RowCountMismatch { .. })));
    }
}
