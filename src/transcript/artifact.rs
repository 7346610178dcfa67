//! Persisted segment artifacts.
//!
//! Chunked transcripts are stored as one JSON file per source transcript:
//! grouped runs write `<stem>_chunks.json` (an array of segments), flat
//! runs write `<stem>_messages.json` (an array of bare messages). Both
//! shapes are valid input for the index builder, so the loader accepts
//! either. Timestamps serialize as ISO-8601 strings, absent values as
//! null.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::transcript::chunker::Segment;
use crate::transcript::Message;

/// Suffix of grouped artifacts.
pub const GROUPED_SUFFIX: &str = "_chunks.json";
/// Suffix of flat artifacts.
pub const FLAT_SUFFIX: &str = "_messages.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: invalid artifact: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One entry of an artifact file, whichever shape it was written in.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactEntry {
    Segment(Segment),
    Message(Message),
}

/// Write grouped segments for one transcript.
pub fn write_segments(
    dir: &Path,
    stem: &str,
    segments: &[Segment],
) -> Result<PathBuf, ArtifactError> {
    write_json(dir, format!("{stem}{GROUPED_SUFFIX}"), segments)
}

/// Write the flat (one message per entry) artifact for one transcript.
pub fn write_messages(
    dir: &Path,
    stem: &str,
    messages: &[Message],
) -> Result<PathBuf, ArtifactError> {
    write_json(dir, format!("{stem}{FLAT_SUFFIX}"), messages)
}

fn write_json<T: serde::Serialize + ?Sized>(
    dir: &Path,
    file_name: String,
    value: &T,
) -> Result<PathBuf, ArtifactError> {
    std::fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Parse {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Load a single artifact file into segments.
///
/// Flat entries become singleton segments, so downstream stages only ever
/// see one shape.
pub fn load_file(path: &Path) -> Result<Vec<Segment>, ArtifactError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: Vec<ArtifactEntry> =
        serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            ArtifactEntry::Segment(segment) => segment,
            ArtifactEntry::Message(message) => Segment::singleton(message),
        })
        .collect())
}

/// Load every artifact in a directory, in file-name order.
///
/// Files that fail to parse are reported and skipped; the rest of the
/// directory still loads. Only `*_chunks.json` and `*_messages.json`
/// files are considered.
pub fn load_dir(dir: &Path) -> Result<Vec<Segment>, ArtifactError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ArtifactError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_artifact(path))
        .collect();
    paths.sort();

    let mut segments = Vec::new();
    for path in paths {
        match load_file(&path) {
            Ok(loaded) => segments.extend(loaded),
            Err(err) => log::error!("skipping artifact: {err}"),
        }
    }

    Ok(segments)
}

fn is_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(GROUPED_SUFFIX) || name.ends_with(FLAT_SUFFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(line: u32, content: &str) -> Message {
        Message {
            line_number: line,
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            username: Some("user".to_string()),
            content: content.to_string(),
            source_file: "general.txt".to_string(),
            discord: None,
        }
    }

    #[test]
    fn grouped_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            timestamp: message(1, "hi").timestamp,
            source_file: "general.txt".to_string(),
            messages: vec![message(1, "hi"), message(2, "there")],
        };

        let path = write_segments(dir.path(), "general", &[segment.clone()]).unwrap();
        assert!(path.to_string_lossy().ends_with("general_chunks.json"));

        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded, vec![segment]);
    }

    #[test]
    fn flat_artifacts_load_as_singleton_segments() {
        let dir = tempfile::tempdir().unwrap();
        let messages = vec![message(1, "hi"), message(2, "there")];

        let path = write_messages(dir.path(), "general", &messages).unwrap();
        assert!(path.to_string_lossy().ends_with("general_messages.json"));

        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].messages, vec![messages[0].clone()]);
        assert_eq!(loaded[0].timestamp, messages[0].timestamp);
    }

    #[test]
    fn absent_timestamp_serializes_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let mut msg = message(1, "floating");
        msg.timestamp = None;
        msg.username = None;

        let path = write_messages(dir.path(), "general", &[msg.clone()]).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"timestamp\": null"));

        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded[0].messages[0], msg);
    }

    #[test]
    fn load_dir_merges_both_shapes_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            timestamp: None,
            source_file: "alpha.txt".to_string(),
            messages: vec![message(1, "grouped")],
        };
        write_segments(dir.path(), "alpha", &[segment]).unwrap();
        write_messages(dir.path(), "beta", &[message(1, "flat")]).unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let segments = load_dir(dir.path()).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].messages[0].content, "grouped");
        assert_eq!(segments[1].messages[0].content, "flat");
    }

    #[test]
    fn corrupt_artifact_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_messages(dir.path(), "good", &[message(1, "ok")]).unwrap();
        std::fs::write(dir.path().join("bad_chunks.json"), "not json").unwrap();

        let segments = load_dir(dir.path()).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].messages[0].content, "ok");
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_dir(&missing),
            Err(ArtifactError::Io { .. })
        ));
    }
}
