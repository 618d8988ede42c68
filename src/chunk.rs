//! Overlapping-window text chunker.
//!
//! Splits knowledge-document text into windows of roughly `size` characters
//! that overlap by `overlap` characters, so context is preserved across
//! chunk boundaries. Cut points back off to the previous space when a window
//! would end mid-word, as long as that space is past the window midpoint.
//!
//! Operates on `char` positions rather than bytes so multi-byte text never
//! splits inside a code point.

/// Split text into overlapping chunks. Returns an empty vector when the
/// trimmed text is shorter than `min_chars` (too short to be useful).
pub fn chunk_text(text: &str, size: usize, overlap: usize, min_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let trimmed: Vec<char> = text.trim().chars().collect();
    if trimmed.len() < min_chars || size == 0 {
        return chunks;
    }

    let len = trimmed.len();
    let mut start = 0usize;

    loop {
        let end = (start + size).min(len);
        let mut cut = end;

        // Avoid splitting a word: back off to the last space in the window,
        // but never shrink the window below half its size.
        if end < len {
            if let Some(last_space) = trimmed[start..end].iter().rposition(|c| *c == ' ') {
                if last_space > size / 2 {
                    cut = start + last_space + 1;
                }
            }
        }

        let slice: String = trimmed[start..cut].iter().collect();
        let slice = slice.trim();
        if !slice.is_empty() {
            chunks.push(slice.to_string());
        }

        if end >= len {
            break;
        }

        // The next window re-covers the overlap tail of this one. The guard
        // forces progress when overlap >= size is passed in directly.
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: usize = 600;
    const OVERLAP: usize = 80;
    const MIN: usize = 20;

    #[test]
    fn test_short_text_yields_nothing() {
        assert!(chunk_text("hi", SIZE, OVERLAP, MIN).is_empty());
        assert!(chunk_text("   hello there   ", SIZE, OVERLAP, MIN).is_empty());
        assert!(chunk_text("", SIZE, OVERLAP, MIN).is_empty());
    }

    #[test]
    fn test_minimum_length_text_yields_one_chunk() {
        let text = "a".repeat(20);
        let chunks = chunk_text(&text, SIZE, OVERLAP, MIN);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_every_chunk_is_a_substring_of_the_source() {
        let text = "The admission office opens at nine in the morning and closes at five. \
                    Hostel allocation happens in the first week of the semester. \
                    Library cards are issued by the central library desk on request."
            .repeat(8);
        let chunks = chunk_text(&text, 100, 20, MIN);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(text.contains(c), "chunk not found in source: {:?}", c);
        }
    }

    #[test]
    fn test_windows_respect_size_bound() {
        let text = "word ".repeat(300);
        let chunks = chunk_text(&text, 100, 20, MIN);
        for c in &chunks {
            assert!(c.chars().count() <= 100, "oversized chunk: {}", c.len());
        }
    }

    #[test]
    fn test_consecutive_windows_overlap() {
        // With no spaces there is no back-off, so windows are exact and the
        // overlap region must repeat verbatim.
        let text: String = ('a'..='z').cycle().take(500).collect();
        let chunks = chunk_text(&text, 100, 20, MIN);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(20).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn test_backs_off_to_space_past_midpoint() {
        let text = format!("{} {}", "a".repeat(70), "b".repeat(200));
        let chunks = chunk_text(&text, 100, 10, MIN);
        // The first cut lands mid-"b" run; the space at position 70 is past
        // the midpoint (50), so the first chunk ends at the word boundary.
        assert_eq!(chunks[0], "a".repeat(70));
    }

    #[test]
    fn test_oversized_overlap_still_terminates() {
        let text = "x".repeat(400);
        let chunks = chunk_text(&text, 50, 50, MIN);
        assert!(!chunks.is_empty());
        let chunks = chunk_text(&text, 50, 120, MIN);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_restartable_and_deterministic() {
        let text = "Course fees and eligibility criteria for all departments. ".repeat(20);
        let a = chunk_text(&text, 200, 40, MIN);
        let b = chunk_text(&text, 200, 40, MIN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "प्रवेश प्रक्रिया की जानकारी के लिए कार्यालय से संपर्क करें। ".repeat(10);
        let chunks = chunk_text(&text, 100, 20, MIN);
        assert!(!chunks.is_empty());
    }
}
