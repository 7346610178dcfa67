//! Time-window grouping of parsed messages into segments.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::transcript::Message;

/// Default grouping window in minutes.
pub const DEFAULT_WINDOW_MINUTES: i64 = 5;

/// A conversational segment: messages grouped around an anchor timestamp.
///
/// `timestamp` is the timestamp of the group's first message, absent only
/// for groups formed from undated messages. A segment owns its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub timestamp: Option<DateTime<Utc>>,
    pub source_file: String,
    pub messages: Vec<Message>,
}

impl Segment {
    /// Wrap a single message in its own segment (the flat artifact shape).
    pub fn singleton(message: Message) -> Self {
        Self {
            timestamp: message.timestamp,
            source_file: message.source_file.clone(),
            messages: vec![message],
        }
    }
}

/// Group messages into segments using a time window anchored at each
/// group's first message.
///
/// Messages are sorted by timestamp with undated messages strictly last,
/// ties broken by ascending line number. A message starts a new segment
/// when it is undated, when the current anchor is undated, or when it
/// falls more than `window` from the anchor. The anchor never slides: it
/// stays on the group's first message, so long conversations still split
/// once they drift past the window.
pub fn chunk_messages(mut messages: Vec<Message>, window: Duration) -> Vec<Segment> {
    messages.sort_by_key(|m| (m.timestamp.is_none(), m.timestamp, m.line_number));

    let mut iter = messages.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut anchor = first.timestamp;
    let mut current = vec![first];

    for message in iter {
        let fits = match (anchor, message.timestamp) {
            (Some(anchor), Some(ts)) => (ts - anchor).abs() <= window,
            _ => false,
        };

        if fits {
            current.push(message);
        } else {
            segments.push(seal(current));
            anchor = message.timestamp;
            current = vec![message];
        }
    }

    segments.push(seal(current));
    segments
}

fn seal(messages: Vec<Message>) -> Segment {
    let timestamp = messages.first().and_then(|m| m.timestamp);
    let source_file = messages
        .first()
        .map(|m| m.source_file.clone())
        .unwrap_or_default();
    Segment {
        timestamp,
        source_file,
        messages,
    }
}
