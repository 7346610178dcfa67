//! Transcript line parsing.
//!
//! The scraper writes one message per line:
//!
//! ```text
//! [2024-03-01 18:22:05 UTC] someuser#0: engine mounts came in today
//! ```
//!
//! Attachment and embed continuation lines are indented, carry no
//! timestamp, and must stay retrievable; anything that doesn't match the
//! grammar is kept as a freestanding message instead of being dropped.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::transcript::Message;

static MESSAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) UTC\] (.*?): (.*)$")
        .expect("message line regex is valid")
});

/// Parse a single transcript line into a [`Message`].
///
/// Returns `None` for blank lines. Lines that don't match the message
/// grammar, or that carry a timestamp which fails calendar validation,
/// become freestanding messages: no timestamp, no username, content equal
/// to the whole trimmed line.
pub fn parse_line(line: &str, line_number: u32, source_file: &str) -> Option<Message> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = MESSAGE_LINE.captures(line) {
        match NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S") {
            Ok(timestamp) => {
                return Some(Message {
                    line_number,
                    timestamp: Some(timestamp.and_utc()),
                    username: Some(strip_brackets(&caps[2]).to_string()),
                    content: caps[3].to_string(),
                    source_file: source_file.to_string(),
                    discord: None,
                });
            }
            Err(err) => {
                log::warn!(
                    "{source_file}:{line_number}: invalid timestamp ({err}), keeping line as freestanding content"
                );
            }
        }
    }

    Some(Message {
        line_number,
        timestamp: None,
        username: None,
        content: line.to_string(),
        source_file: source_file.to_string(),
        discord: None,
    })
}

/// Authors occasionally arrive bracketed themselves; the wrapper is not
/// part of the name.
fn strip_brackets(author: &str) -> &str {
    author
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(author)
}

/// Parse a whole transcript body, numbering lines by physical position.
///
/// Blank lines produce no message but still advance the counter, so
/// `line_number` always matches the raw file and raw-file context lookups
/// stay correct.
pub fn parse_transcript(text: &str, source_file: &str) -> Vec<Message> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| parse_line(line, idx as u32 + 1, source_file))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_message_line() {
        let msg = parse_line(
            "[2024-03-01 18:22:05 UTC] someuser#0: engine mounts came in today",
            7,
            "general.txt",
        )
        .unwrap();

        assert_eq!(
            msg.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 22, 5).unwrap())
        );
        assert_eq!(msg.username.as_deref(), Some("someuser#0"));
        assert_eq!(msg.content, "engine mounts came in today");
        assert_eq!(msg.line_number, 7);
        assert_eq!(msg.source_file, "general.txt");
    }

    #[test]
    fn strips_bracketed_author() {
        let msg = parse_line(
            "[2024-03-01 18:22:05 UTC] [webhook]: build finished",
            1,
            "ci.txt",
        )
        .unwrap();
        assert_eq!(msg.username.as_deref(), Some("webhook"));
    }

    #[test]
    fn author_splits_at_first_colon() {
        let msg = parse_line(
            "[2024-03-01 18:22:05 UTC] user: note: check the manifold",
            1,
            "general.txt",
        )
        .unwrap();
        assert_eq!(msg.username.as_deref(), Some("user"));
        assert_eq!(msg.content, "note: check the manifold");
    }

    #[test]
    fn invalid_calendar_date_becomes_freestanding() {
        let line = "[2024-13-01 18:22:05 UTC] user: hello";
        let msg = parse_line(line, 3, "general.txt").unwrap();
        assert_eq!(msg.timestamp, None);
        assert_eq!(msg.username, None);
        assert_eq!(msg.content, line);
    }

    #[test]
    fn continuation_line_is_preserved() {
        let msg = parse_line(
            "    [Attachment] https://cdn.example/img.png",
            12,
            "general.txt",
        )
        .unwrap();
        assert_eq!(msg.timestamp, None);
        assert_eq!(msg.username, None);
        assert_eq!(msg.content, "[Attachment] https://cdn.example/img.png");
    }

    #[test]
    fn blank_line_yields_nothing() {
        assert_eq!(parse_line("", 1, "a.txt"), None);
        assert_eq!(parse_line("   \t", 2, "a.txt"), None);
    }

    #[test]
    fn line_numbers_count_blank_lines() {
        let text = "[2024-03-01 18:00:00 UTC] a: one\n\n[2024-03-01 18:00:30 UTC] b: two\n";
        let messages = parse_transcript(text, "general.txt");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].line_number, 1);
        assert_eq!(messages[1].line_number, 3);
    }

    #[test]
    fn grammar_roundtrip_recovers_author_and_content() {
        let cases = [
            ("alice#1234", "hi there"),
            ("bob", "multi  spaced   content"),
            ("user.name", "trailing punctuation!"),
        ];
        for (author, content) in cases {
            let line = format!("[2024-01-02 03:04:05 UTC] {author}: {content}");
            let msg = parse_line(&line, 1, "t.txt").unwrap();
            assert_eq!(msg.username.as_deref(), Some(author));
            assert_eq!(msg.content, content);
        }
    }
}
