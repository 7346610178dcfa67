//! Per-line provenance sidecars written by the export scraper.
//!
//! Next to every `<channel>.txt` transcript the scraper keeps a
//! `<channel>_metadata.json` file mapping line numbers to the Discord ids
//! of the message that produced that line. The ids survive into the
//! vector index so search hits can link back into the client.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Discord identifiers for one archived message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordRef {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
}

impl DiscordRef {
    /// App-protocol deep link to the message.
    pub fn deep_link(&self) -> String {
        format!(
            "discord://channels/{}/{}/{}",
            self.guild_id, self.channel_id, self.message_id
        )
    }
}

/// Path of the sidecar belonging to a transcript file.
pub fn sidecar_path(transcript: &Path) -> PathBuf {
    let stem = transcript
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    transcript.with_file_name(format!("{stem}_metadata.json"))
}

/// Load the provenance sidecar for a transcript, if one exists.
///
/// A missing sidecar is normal (not every export has one). A malformed
/// sidecar is logged and ignored rather than failing the chunk run:
/// messages simply carry no provenance.
pub fn load_sidecar(transcript: &Path) -> HashMap<u32, DiscordRef> {
    let path = sidecar_path(transcript);
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return HashMap::new();
    };

    match serde_json::from_str::<HashMap<String, DiscordRef>>(&raw) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(line, discord)| match line.parse::<u32>() {
                Ok(number) => Some((number, discord)),
                Err(_) => {
                    log::warn!(
                        "{}: ignoring non-numeric line key {line:?}",
                        path.display()
                    );
                    None
                }
            })
            .collect(),
        Err(err) => {
            log::warn!("{}: malformed sidecar: {err}", path.display());
            HashMap::new()
        }
    }
}
