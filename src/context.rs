//! Context expansion around a search hit.
//!
//! Two backing stores: the chunked segment artifacts, or the raw
//! transcript file re-read by physical line number. Both return a window
//! clipped to valid bounds with the target entry flagged.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::transcript::chunker::Segment;
use crate::transcript::Message;

/// Default number of lines shown on each side of the target.
pub const DEFAULT_WIDTH: u32 = 5;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Source transcript not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One line of surrounding context at the serving boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextLine {
    pub line_number: u32,
    pub content: String,
    pub is_target: bool,
}

/// A message from the chunked representation, flagged when it is the hit.
#[derive(Debug, Clone, Serialize)]
pub struct ContextMessage {
    #[serde(flatten)]
    pub message: Message,
    pub is_target: bool,
}

/// Expand context from segment artifacts.
///
/// Flattens every segment for `source_file` in segment order and returns
/// the slice `[target - width, target + width]` around the message whose
/// line number matches. An unknown line number yields an empty window,
/// not an error.
pub fn segment_context(
    segments: &[Segment],
    source_file: &str,
    line_number: u32,
    width: usize,
) -> Vec<ContextMessage> {
    let flattened: Vec<&Message> = segments
        .iter()
        .filter(|s| s.source_file == source_file)
        .flat_map(|s| s.messages.iter())
        .collect();

    let Some(target) = flattened.iter().position(|m| m.line_number == line_number) else {
        return Vec::new();
    };

    let start = target.saturating_sub(width);
    let end = (target + width).min(flattened.len() - 1);

    flattened[start..=end]
        .iter()
        .enumerate()
        .map(|(offset, message)| ContextMessage {
            message: (*message).clone(),
            is_target: start + offset == target,
        })
        .collect()
}

/// Expand context from the raw transcript file.
///
/// Lines are 1-based and the window `[line_number - width,
/// line_number + width]` is inclusive, clipped to the file. Fails with
/// [`ContextError::SourceNotFound`] when the transcript is missing; a
/// line number past the end of the file yields an empty window.
pub fn raw_file_context(
    path: &Path,
    line_number: u32,
    width: u32,
) -> Result<Vec<ContextLine>, ContextError> {
    if !path.exists() {
        return Err(ContextError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = std::fs::read_to_string(path).map_err(|source| ContextError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let lines: Vec<&str> = text.lines().collect();

    let total = lines.len() as u32;
    if line_number == 0 || line_number > total {
        return Ok(Vec::new());
    }

    let start = line_number.saturating_sub(width).max(1);
    let end = line_number.saturating_add(width).min(total);

    Ok((start..=end)
        .map(|number| ContextLine {
            line_number: number,
            content: lines[(number - 1) as usize].to_string(),
            is_target: number == line_number,
        })
        .collect())
}
