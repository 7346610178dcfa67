//! Transcript model and chunking pipeline.
//!
//! Raw transcripts are plain text, one message per line, as written by the
//! export scraper. This module turns them into persisted segment artifacts:
//!
//! - `parser`: line grammar for scraped transcripts
//! - `chunker`: time-window grouping into segments
//! - `provenance`: per-line Discord id sidecars
//! - `artifact`: segment JSON files on disk

pub mod artifact;
pub mod chunker;
pub mod parser;
pub mod provenance;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use chunker::{chunk_messages, Segment, DEFAULT_WINDOW_MINUTES};
pub use parser::{parse_line, parse_transcript};
pub use provenance::DiscordRef;

/// One archived chat message.
///
/// `line_number` is the message's 1-based physical position in its source
/// transcript, counting blank lines too. It is the stable identity used to
/// find the message again in the raw file and is never renumbered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub line_number: u32,
    pub timestamp: Option<DateTime<Utc>>,
    pub username: Option<String>,
    pub content: String,
    pub source_file: String,
    #[serde(
        rename = "discord_info",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub discord: Option<DiscordRef>,
}
