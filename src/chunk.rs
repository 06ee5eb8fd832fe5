//! Text chunker: splits long input into bounded segments.
//!
//! The text encoder has a practical sequence limit, so long input is cut at
//! the most natural boundary available: paragraphs, then sentences, then
//! comma clauses, then words. At every level pieces are packed greedily into
//! chunks of at most `max_len` characters. A single word longer than
//! `max_len` is the only thing ever emitted over the limit.
//!
//! [`chunk_normalized`] is what synthesis uses: paragraphs are found on the
//! raw text (normalisation collapses the blank lines that mark them), then
//! each paragraph is normalised and the bound applies to the normalised text.

use fancy_regex::Regex as FancyRegex;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::normalize;

/// Default maximum characters per chunk.
pub const DEFAULT_MAX_CHUNK_LEN: usize = 300;

/// Tokens whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "Dr.", "Mr.", "Mrs.", "Ms.", "Prof.", "Sr.", "Jr.", "St.", "Ave.", "Rd.", "Blvd.", "Dept.",
    "Inc.", "Ltd.", "Co.", "Corp.", "etc.", "vs.", "i.e.", "e.g.", "Ph.D.",
];

static RE_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
/// Whitespace run preceded by sentence-final punctuation.
static RE_SENTENCE_BREAK: Lazy<FancyRegex> =
    Lazy::new(|| FancyRegex::new(r"(?<=[.!?])\s+").unwrap());

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Splitting helpers
// ─────────────────────────────────────────────────────────────────────────────

fn is_abbreviation(token: &str) -> bool {
    ABBREVIATIONS.contains(&token)
}

/// Split a paragraph into sentences on `. ! ?` + whitespace, keeping the
/// punctuation and skipping boundaries that follow a known abbreviation.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in RE_SENTENCE_BREAK.find_iter(text) {
        // The pattern is a fixed-width look-behind over a plain string; the
        // matcher cannot hit its backtrack limit here.
        let Ok(m) = m else { break };
        let preceding = text[start..m.start()].split_whitespace().next_back();
        if preceding.is_some_and(is_abbreviation) {
            continue;
        }
        let sentence = text[start..m.start()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Greedily join `units` with single spaces into chunks of at most
/// `max_len` characters. A unit longer than `max_len` is emitted alone.
fn pack<I, S>(units: I, max_len: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for unit in units {
        let unit = unit.as_ref().trim();
        if unit.is_empty() {
            continue;
        }
        let unit_len = char_len(unit);

        if !current.is_empty() && current_len + 1 + unit_len > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(unit);
        current_len += unit_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split an over-long sentence on commas (each comma stays with its
/// clause), falling back to words for clauses that are still too long.
fn split_long_sentence(sentence: &str, max_len: usize) -> Vec<String> {
    let mut units = Vec::new();
    for clause in sentence.split_inclusive(',') {
        let clause = clause.trim();
        if char_len(clause) <= max_len {
            units.push(clause.to_string());
        } else {
            units.extend(pack(clause.split_whitespace(), max_len));
        }
    }
    pack(units, max_len)
}

fn split_long_paragraph(paragraph: &str, max_len: usize) -> Vec<String> {
    let mut units = Vec::new();
    for sentence in split_sentences(paragraph) {
        if char_len(sentence) <= max_len {
            units.push(sentence.to_string());
        } else {
            units.extend(split_long_sentence(sentence, max_len));
        }
    }
    pack(units, max_len)
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

fn chunk_paragraphs<I>(paragraphs: I, max_len: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();

    for paragraph in paragraphs {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if char_len(paragraph) <= max_len {
            chunks.push(paragraph.to_string());
        } else {
            chunks.extend(split_long_paragraph(paragraph, max_len));
        }
    }

    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}

/// Split `text` into ordered chunks of at most `max_len` characters.
///
/// Never returns an empty vector: blank input yields a single empty chunk.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    chunk_paragraphs(RE_PARAGRAPH.split(text.trim()).map(str::to_string), max_len)
}

/// Normalise `text` paragraph by paragraph, then chunk it.
///
/// Paragraphs that normalise to nothing (emoji only, say) are dropped. The
/// single empty chunk is returned only when nothing at all survives.
pub fn chunk_normalized(text: &str, max_len: usize) -> Vec<String> {
    chunk_paragraphs(RE_PARAGRAPH.split(text.trim()).map(normalize), max_len)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    fn assert_bounded(chunks: &[String], max_len: usize) {
        for chunk in chunks {
            assert!(
                char_len(chunk) <= max_len || words(chunk).len() == 1,
                "chunk over {max_len} chars: {chunk:?}"
            );
            assert_eq!(chunk.trim(), chunk, "chunk not trimmed: {chunk:?}");
        }
    }

    fn assert_words_preserved(text: &str, chunks: &[String]) {
        let joined = chunks.join(" ");
        assert_eq!(words(&joined), words(text));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(chunk_text("", 100), vec![String::new()]);
        assert_eq!(chunk_text("  \n\n  ", 100), vec![String::new()]);
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(chunk_text("  Hello world.  ", 100), vec!["Hello world."]);
    }

    #[test]
    fn test_repeated_sentences() {
        let text = "Sentence. ".repeat(80);
        let chunks = chunk_text(&text, 100);
        assert!(!chunks.is_empty());
        assert_bounded(&chunks, 100);
        assert_words_preserved(&text, &chunks);
        // Ten nine-character sentences plus nine spaces fill a chunk exactly.
        assert_eq!(chunks.len(), 8);
        assert_eq!(char_len(&chunks[0]), 99);
    }

    #[test]
    fn test_paragraphs_stay_separate() {
        let chunks = chunk_text("First para.\n\nSecond para.\n   \nThird.", 100);
        assert_eq!(chunks, vec!["First para.", "Second para.", "Third."]);
    }

    #[test]
    fn test_abbreviation_is_not_a_boundary() {
        let s = split_sentences("Dr. Smith met Mr. Jones. They talked, e.g. about Ph.D. work! Done?");
        assert_eq!(
            s,
            vec!["Dr. Smith met Mr. Jones.", "They talked, e.g. about Ph.D. work!", "Done?"]
        );
    }

    #[test]
    fn test_abbreviation_match_is_exact() {
        // "Taco." ends with "Co." but is an ordinary word.
        assert_eq!(split_sentences("I ate a Taco. Then left."), vec!["I ate a Taco.", "Then left."]);
    }

    #[test]
    fn test_long_sentence_splits_on_commas() {
        let text = "alpha beta gamma, delta epsilon zeta, eta theta iota, kappa lambda mu.";
        let chunks = chunk_text(text, 40);
        assert_bounded(&chunks, 40);
        assert_words_preserved(text, &chunks);
        assert_eq!(chunks[0], "alpha beta gamma, delta epsilon zeta,");
        assert!(chunks.iter().all(|c| c.ends_with(',') || c.ends_with('.')));
    }

    #[test]
    fn test_long_clause_splits_on_words() {
        let text = "word ".repeat(60);
        let chunks = chunk_text(&text, 23);
        assert!(chunks.len() > 1);
        assert_bounded(&chunks, 23);
        assert_words_preserved(&text, &chunks);
    }

    #[test]
    fn test_unsplittable_word_emitted_whole() {
        let long = "x".repeat(50);
        let text = format!("short words {long} more words here");
        let chunks = chunk_text(&text, 20);
        assert!(chunks.contains(&long));
        assert_bounded(&chunks, 20);
        assert_words_preserved(&text, &chunks);
    }

    #[test]
    fn test_bounds_hold_across_limits() {
        let text = "Mr. Brown, who lives on Elm St. near the corner, said hello. \
                    It was, by all accounts, a remarkably long and winding conversation \
                    about nothing in particular!\n\nA new paragraph starts here? Yes, it does.";
        for max_len in [1, 5, 12, 30, 64, 200] {
            let chunks = chunk_text(text, max_len);
            assert!(!chunks.is_empty());
            assert_bounded(&chunks, max_len);
            assert_words_preserved(text, &chunks);
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // Ten three-byte characters: fits in ten, not in nine.
        let text = "\u{3042}".repeat(10);
        assert_eq!(chunk_text(&text, 10), vec![text.clone()]);
    }

    #[test]
    fn test_normalized_chunks_bounded_after_expansion() {
        // Normalising grows "a@b" to "a at b", so the raw 19 characters
        // become 47 and must be split.
        let chunks = chunk_normalized("a@b@c@d@e@f@g@h@i@j", 20);
        assert!(chunks.len() > 1, "{chunks:?}");
        assert_bounded(&chunks, 20);
        assert_eq!(chunks.join(" "), "a at b at c at d at e at f at g at h at i at j.");
    }

    #[test]
    fn test_normalized_drops_empty_paragraphs() {
        let chunks = chunk_normalized("Hello there.\n\n\u{1F680}\u{1F680}\n\nBye now.", 100);
        assert_eq!(chunks, vec!["Hello there.", "Bye now."]);
        assert_eq!(chunk_normalized("\u{1F680}", 100), vec![String::new()]);
    }

    #[test]
    fn test_normalized_keeps_paragraph_breaks() {
        let chunks = chunk_normalized("First para\n\nSecond para", 100);
        assert_eq!(chunks, vec!["First para.", "Second para."]);
    }
}
