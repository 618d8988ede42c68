//! Call transcript normalization.
//!
//! The voice platform reports transcripts in several shapes depending on the
//! event and call type: a top-level array of role/text objects, the same
//! array nested under a call artifact, a single `Role:`-prefixed delimited
//! string, or a bare string. [`normalize_call`] reduces every shape to one
//! canonical `(role, text)` sequence so nothing downstream branches on raw
//! payload structure.
//!
//! System turns are filtered out of the canonical sequence — they are never
//! shown or mined for lead fields — but still contribute to the raw text
//! used for keyword matching, as does the call summary.

use serde_json::Value;
use std::sync::LazyLock;

use regex::Regex;

/// Speaker role after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Assistant,
    User,
    System,
    Other(String),
}

impl Role {
    fn parse(raw: &str) -> Role {
        let r = raw.trim().to_lowercase();
        if r.starts_with("assistant") || r.starts_with("agent") || r.starts_with("bot") {
            Role::Assistant
        } else if r.starts_with("user") || r.starts_with("caller") || r.starts_with("customer") {
            Role::User
        } else if r.starts_with("system") {
            Role::System
        } else if r.is_empty() {
            Role::User
        } else {
            Role::Other(raw.trim().to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Role::Assistant => "Assistant",
            Role::User => "User",
            Role::System => "System",
            Role::Other(s) => s,
        }
    }
}

/// One canonical transcript turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Canonical form of a call's conversation.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTranscript {
    /// Lowercased call summary + full transcript text, for keyword search.
    pub raw_text: String,
    /// Ordered non-system turns.
    pub turns: Vec<Turn>,
}

static ROLE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*([A-Za-z][A-Za-z _-]{0,30}):\s*(.*)$").unwrap());

/// Normalize a webhook `message` (or a call-detail object fetched from the
/// voice platform API) into one canonical transcript.
pub fn normalize_call(message: &Value) -> NormalizedTranscript {
    let summary = message
        .pointer("/analysis/summary")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    let artifact = message
        .get("artifact")
        .or_else(|| message.get("artifacts"))
        .unwrap_or(&Value::Null);

    // Shapes in priority order; the first that yields anything wins.
    let candidates = [
        message.get("transcript"),
        message.get("messages"),
        artifact.get("transcript"),
        artifact.get("messages"),
    ];

    for candidate in candidates.iter().flatten() {
        if let Some(items) = candidate.as_array() {
            if items.is_empty() {
                continue;
            }
            let (turns, text) = turns_from_array(items);
            return finish(summary, text, turns);
        }
    }

    for candidate in candidates.iter().flatten() {
        if let Some(s) = candidate.as_str() {
            if s.trim().is_empty() {
                continue;
            }
            let turns = parse_delimited(s);
            return finish(summary, s.to_string(), turns);
        }
    }

    finish(summary, String::new(), Vec::new())
}

fn finish(summary: String, transcript_text: String, turns: Vec<Turn>) -> NormalizedTranscript {
    NormalizedTranscript {
        raw_text: format!("{} {}", summary, transcript_text),
        turns: turns
            .into_iter()
            .filter(|t| t.role != Role::System)
            .collect(),
    }
}

fn turns_from_array(items: &[Value]) -> (Vec<Turn>, String) {
    let mut turns = Vec::new();
    let mut texts = Vec::new();

    for item in items {
        match item {
            // Bare strings carry no speaker; they feed keyword search only.
            Value::String(s) => texts.push(s.clone()),
            Value::Object(_) => {
                let text = ["message", "content", "transcript", "text"]
                    .iter()
                    .filter_map(|k| item.get(k).and_then(Value::as_str))
                    .map(str::trim)
                    .find(|t| !t.is_empty())
                    .unwrap_or("");
                if text.is_empty() {
                    continue;
                }
                texts.push(text.to_string());
                let role = item.get("role").and_then(Value::as_str).unwrap_or("");
                turns.push(Turn {
                    role: Role::parse(role),
                    text: text.to_string(),
                });
            }
            _ => {}
        }
    }

    (turns, texts.join(" "))
}

/// Parse a `Role:`-prefixed delimited transcript string. Unprefixed leading
/// text becomes a user turn; continuation lines append to the current turn.
pub fn parse_delimited(s: &str) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut last_end = 0usize;
    let mut pending_head: Option<String> = None;

    let matches: Vec<_> = ROLE_LINE_RE.captures_iter(s).collect();
    if matches.is_empty() {
        return Vec::new();
    }

    // Anything before the first role marker has no speaker
    if let Some(first) = matches.first() {
        let head = s[..first.get(0).unwrap().start()].trim();
        if !head.is_empty() {
            pending_head = Some(head.to_string());
        }
    }

    for cap in &matches {
        let whole = cap.get(0).unwrap();
        // Continuation lines between markers belong to the previous turn
        if whole.start() > last_end {
            if let Some(turn) = turns.last_mut() {
                let between = s[last_end..whole.start()].trim();
                if !between.is_empty() {
                    turn.text.push(' ');
                    turn.text.push_str(between);
                }
            }
        }
        last_end = whole.end();

        let role = Role::parse(&cap[1]);
        let text = cap[2].trim().to_string();
        turns.push(Turn { role, text });
    }

    if let Some(turn) = turns.last_mut() {
        let tail = s[last_end..].trim();
        if !tail.is_empty() {
            turn.text.push(' ');
            turn.text.push_str(tail);
        }
    }

    if let Some(head) = pending_head {
        turns.insert(
            0,
            Turn {
                role: Role::User,
                text: head,
            },
        );
    }

    turns.retain(|t| !t.text.is_empty());
    turns
}

/// Render turns back into the delimited display form.
pub fn format_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}
