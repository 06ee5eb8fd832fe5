//! Text normalisation: canonicalises raw input before tokenisation.
//!
//! The model's vocabulary is a flat Unicode-scalar table, so anything it was
//! not trained on (emoji, typographic quotes, combining accents) is folded or
//! dropped here. Steps run in a fixed order; later steps consume whitespace
//! and characters produced by earlier ones.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ─────────────────────────────────────────────────────────────────────────────
// Character tables
// ─────────────────────────────────────────────────────────────────────────────

/// Typographic characters folded to a plain equivalent.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2013}', "-"), // en dash
    ('\u{2011}', "-"), // non-breaking hyphen
    ('\u{2010}', "-"), // hyphen; NFKD folds U+2011 to this
    ('\u{2014}', "-"), // em dash
    ('_', " "),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{00B4}', "'"), // acute accent
    ('`', "'"),
    ('[', " "),
    (']', " "),
    ('|', " "),
    ('/', " "),
    ('#', " "),
    ('\u{2192}', " "), // →
    ('\u{2190}', " "), // ←
];

/// Symbols dropped outright.
const REMOVALS: &[char] = &['\u{2665}', '\u{2606}', '\u{2661}', '\u{00A9}', '\\'];

/// Literal phrases rewritten to their spoken form.
const EXPRESSIONS: &[(&str, &str)] = &[
    ("@", " at "),
    ("e.g.,", "for example, "),
    ("i.e.,", "that is, "),
];

/// Characters accepted as the end of a sentence. Anything else gets a `.`.
const TERMINALS: &str = ".!?;:,'\"\u{201C}\u{201D}\u{2018}\u{2019})]}\u{2026}\u{3002}\u{300D}\u{300F}\u{3011}\u{3009}\u{300B}\u{203A}\u{00BB}";

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes (lazily initialised once)
// ─────────────────────────────────────────────────────────────────────────────

static RE_EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}",
        r"\x{1F700}-\x{1F77F}\x{1F780}-\x{1F7FF}\x{1F800}-\x{1F8FF}",
        r"\x{1F900}-\x{1F9FF}\x{1FA00}-\x{1FA6F}\x{1FA70}-\x{1FAFF}",
        r"\x{2600}-\x{26FF}\x{2700}-\x{27BF}\x{1F1E6}-\x{1F1FF}]+",
    ))
    .unwrap()
});
static RE_DIACRITICS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{0300}-\x{036F}]").unwrap());
static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.!?;:'])").unwrap());
static RE_DOUBLE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#""{2,}"#).unwrap());
static RE_SINGLE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"'{2,}").unwrap());
static RE_BACKTICKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"`{2,}").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Individual steps
// ─────────────────────────────────────────────────────────────────────────────

/// Compatibility decomposition: ligatures, full-width forms and precomposed
/// accented letters are split into base characters plus combining marks.
pub fn fold_unicode(text: &str) -> String {
    text.nfkd().collect()
}

pub fn remove_emoji(text: &str) -> String {
    RE_EMOJI.replace_all(text, "").into_owned()
}

/// Apply [`SUBSTITUTIONS`] and drop [`REMOVALS`] in a single pass.
pub fn replace_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if REMOVALS.contains(&c) {
            continue;
        }
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

pub fn remove_diacritics(text: &str) -> String {
    RE_DIACRITICS.replace_all(text, "").into_owned()
}

pub fn expand_expressions(text: &str) -> String {
    EXPRESSIONS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

pub fn tighten_punctuation(text: &str) -> String {
    RE_SPACE_BEFORE_PUNCT.replace_all(text, "$1").into_owned()
}

pub fn collapse_quotes(text: &str) -> String {
    let text = RE_DOUBLE_QUOTES.replace_all(text, "\"");
    let text = RE_SINGLE_QUOTES.replace_all(&text, "'");
    RE_BACKTICKS.replace_all(&text, "`").into_owned()
}

pub fn remove_extra_whitespace(text: &str) -> String {
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

/// `true` when `text` already ends in a recognised terminal or closing mark.
pub fn ends_with_terminal(text: &str) -> bool {
    text.chars().last().is_some_and(|c| TERMINALS.contains(c))
}

pub fn ensure_terminal_punctuation(mut text: String) -> String {
    if !text.is_empty() && !ends_with_terminal(&text) {
        text.push('.');
    }
    text
}

// ─────────────────────────────────────────────────────────────────────────────
// Full pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Normalise `text` for the Unicode indexer. Total: never fails, and the
/// result of a non-blank input always ends in terminal punctuation.
pub fn normalize(text: &str) -> String {
    let text = fold_unicode(text);
    let text = remove_emoji(&text);
    let text = replace_symbols(&text);
    let text = remove_diacritics(&text);
    let text = expand_expressions(&text);
    let text = tighten_punctuation(&text);
    let text = collapse_quotes(&text);
    let text = remove_extra_whitespace(&text);
    ensure_terminal_punctuation(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_period() {
        assert_eq!(normalize("Hello world"), "Hello world.");
    }

    #[test]
    fn test_keeps_existing_terminal() {
        assert_eq!(normalize("Really?"), "Really?");
        assert_eq!(normalize("He said \u{201C}hi\u{201D}"), "He said \"hi\"");
        assert_eq!(normalize("(aside)"), "(aside)");
    }

    #[test]
    fn test_empty_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
        assert_eq!(normalize("\u{1F600}\u{1F680}"), "");
    }

    #[test]
    fn test_strips_emoji() {
        assert_eq!(normalize("Launch \u{1F680} now"), "Launch now.");
    }

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize("Caf\u{00E9} na\u{00EF}ve r\u{00E9}sum\u{00E9}"), "Cafe naive resume.");
    }

    #[test]
    fn test_symbol_table() {
        assert_eq!(normalize("A\u{2014}B"), "A-B.");
        assert_eq!(normalize("path/to_file"), "path to file.");
        assert_eq!(normalize("I \u{2665} Rust \u{00A9}"), "I Rust.");
        assert_eq!(normalize("it\u{2019}s"), "it's.");
    }

    #[test]
    fn test_expressions() {
        assert_eq!(normalize("mail me @ home"), "mail me at home.");
        assert_eq!(normalize("fruit, e.g., apples"), "fruit, for example, apples.");
        assert_eq!(normalize("one, i.e., this"), "one, that is, this.");
    }

    #[test]
    fn test_space_before_punctuation() {
        assert_eq!(normalize("Wait , what ?"), "Wait, what?");
        assert_eq!(normalize("end ."), "end.");
    }

    #[test]
    fn test_duplicate_quotes() {
        assert_eq!(normalize("say \"\"hi\"\""), "say \"hi\"");
        assert_eq!(collapse_quotes("``x``"), "`x`");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize("  many   spaces\n\nhere  "), "many spaces here.");
    }

    #[test]
    fn test_compatibility_forms() {
        // Full-width letters and the "fi" ligature fold to ASCII.
        assert_eq!(normalize("\u{FF21}\u{FF22} \u{FB01}ne"), "AB fine.");
    }

    #[test]
    fn test_non_empty_always_terminal() {
        let inputs = [
            "plain",
            "trailing space ",
            "emoji end \u{1F600}",
            "dash end \u{2014}",
            "hash #",
            "x",
            "\u{00E9}",
            "quote \u{2018}",
        ];
        for input in inputs {
            let out = normalize(input);
            assert!(!out.is_empty(), "input {input:?}");
            assert!(ends_with_terminal(&out), "input {input:?} → {out:?}");
        }
    }
}
