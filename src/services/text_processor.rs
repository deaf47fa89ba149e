// Text Processing Service
// Normalization, sentence/paragraph splitting and char-safe context windows

use crate::models::TextUnit;
use regex::Regex;
use std::sync::OnceLock;

/// Abbreviations whose trailing period never ends a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "gen", "gov", "sen", "rep", "rev",
    "inc", "ltd", "co", "corp", "llc", "dept", "univ", "assn", "vs", "etc", "e.g", "i.e", "u.s",
    "u.k", "u.n", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov",
    "dec", "no", "fig", "approx", "est",
];

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b[a-z][a-z0-9+.\-]*://\S+").expect("url regex"))
}

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph regex"))
}

/// Cleans raw article text before analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Strip URLs, straighten curly quotes and collapse every whitespace run to one space.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let s = raw
            .replace(['\u{201c}', '\u{201d}'], "\"")
            .replace(['\u{2018}', '\u{2019}'], "'");

        let s = url_re().replace_all(&s, "");

        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Expand the byte span `start..end` by `radius` characters on each side, clamped to the text.
pub fn char_window(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (from, to)
}

/// Slice of `text` around `start..end` with `radius` characters of context.
pub fn context_snippet(text: &str, start: usize, end: usize, radius: usize) -> String {
    let (from, to) = char_window(text, start, end, radius);
    text[from..to].to_string()
}

fn is_abbreviation(text: &str, period_pos: usize) -> bool {
    let head = &text[..period_pos];
    let word_start = head
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == '(' || *c == '"')
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let word = &head[word_start..];
    if word.is_empty() {
        return false;
    }

    // Single initials: "J. Smith"
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_uppercase() {
            return true;
        }
    }

    let lower = word.to_ascii_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

/// Split text into sentences with byte offsets into `text`.
///
/// A boundary is a run of `.`, `!` or `?` (plus any closing quotes or brackets) followed by
/// whitespace and then an uppercase letter, digit or opening quote, or by the end of text.
pub fn split_sentences(text: &str) -> Vec<TextUnit> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut current_start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if !matches!(ch, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && matches!(chars[j].1, '.' | '!' | '?') {
            j += 1;
        }
        while j < chars.len() && matches!(chars[j].1, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}') {
            j += 1;
        }
        let boundary = chars.get(j).map(|(p, _)| *p).unwrap_or(text.len());

        let at_end = j >= chars.len();
        let followed_by_space = !at_end && chars[j].1.is_whitespace();
        let next_starts_sentence = if followed_by_space {
            chars[j..]
                .iter()
                .find(|(_, c)| !c.is_whitespace())
                .map(|(_, c)| c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\u{201c}' | '\'' | '('))
                .unwrap_or(true)
        } else {
            false
        };

        let is_end = at_end
            || (followed_by_space
                && next_starts_sentence
                && !(ch == '.' && j == i + 1 && is_abbreviation(text, pos)));

        if is_end {
            push_trimmed(text, current_start, boundary, &mut sentences);
            current_start = boundary;
        }
        i = j;
    }

    if current_start < text.len() {
        push_trimmed(text, current_start, text.len(), &mut sentences);
    }

    sentences
}

/// Split text into paragraphs on blank lines (`\n\n`, `\r\n\r\n`, whitespace-only lines).
pub fn split_paragraphs(text: &str) -> Vec<TextUnit> {
    let mut paragraphs = Vec::new();
    if text.is_empty() {
        return paragraphs;
    }

    let mut cursor = 0usize;
    for m in paragraph_break_re().find_iter(text) {
        push_trimmed(text, cursor, m.start(), &mut paragraphs);
        cursor = m.end();
    }
    push_trimmed(text, cursor, text.len(), &mut paragraphs);

    paragraphs
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<TextUnit>) {
    let piece = &text[start..end];
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = piece.len() - piece.trim_start().len();
    let s = start + lead;
    out.push(TextUnit::new(trimmed, s, s + trimmed.len()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_removes_urls() {
        let n = TextNormalizer::new();
        let cleaned = n.normalize("Check out https://example.com/a?b=1 for more info");
        assert!(!cleaned.contains("example.com"));
        assert_eq!(cleaned, "Check out for more info");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize("This   has \n\n extra\t spaces  "), "This has extra spaces");
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize(" \n\t "), "");
    }

    #[test]
    fn test_normalize_quotes() {
        let n = TextNormalizer::new();
        let out = n.normalize("She said \u{201c}hello\u{201d} to the \u{2018}world\u{2019}");
        assert_eq!(out, "She said \"hello\" to the 'world'");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = TextNormalizer::new();
        let samples = [
            "",
            "plain",
            "  a  http://x.y/z  b ",
            "\u{201c}Quote\u{201d}\n\nftp://host/file more\u{00a0}text",
            "(see https://a.b)next",
            "line one\r\nline two",
        ];
        for s in samples {
            let once = n.normalize(s);
            assert_eq!(n.normalize(&once), once, "input: {:?}", s);
        }
    }

    #[test]
    fn test_split_sentences_basic() {
        let text = "This is sentence one. This is sentence two! Is this sentence three?";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].text, "This is sentence one.");
        assert_eq!(sentences[1].text, "This is sentence two!");
        assert_eq!(sentences[2].text, "Is this sentence three?");
        for s in &sentences {
            assert_eq!(&text[s.start..s.end], s.text);
        }
    }

    #[test]
    fn test_split_sentences_keeps_abbreviations_and_decimals() {
        let text = "Dr. Smith earned 3.5 times more. Ms. Lee was named CEO of Acme Inc. in May.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].text.starts_with("Dr. Smith"));
        assert!(sentences[1].text.ends_with("in May."));
    }

    #[test]
    fn test_split_sentences_multibyte_space_before_abbreviation() {
        let text = "The board met with\u{a0}Dr. Smith yesterday afternoon. Appointed by\u{2003}J. Smith, she now chairs it.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].text.ends_with("afternoon."));
        assert!(sentences[0].text.contains("\u{a0}Dr. Smith"));
        assert!(sentences[1].text.contains("\u{2003}J. Smith"));
        for s in &sentences {
            assert_eq!(&text[s.start..s.end], s.text);
        }
        assert!(is_abbreviation("met with\u{a0}Dr.", "met with\u{a0}Dr".len()));
    }

    #[test]
    fn test_split_sentences_quote_closing() {
        let text = "\"We are not done yet.\" The board agreed. \"Is it fair?\" she asked.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].text, "\"We are not done yet.\"");
        assert_eq!(sentences[2].text, "\"Is it fair?\" she asked.");
    }

    #[test]
    fn test_split_paragraphs_variants() {
        let text = "First paragraph.\n\nSecond paragraph.\r\n\r\nThird one.\n   \nFourth.";
        let paras = split_paragraphs(text);
        assert_eq!(paras.len(), 4);
        assert_eq!(paras[1].text, "Second paragraph.");
        for p in &paras {
            assert_eq!(&text[p.start..p.end], p.text);
        }
    }

    #[test]
    fn test_char_window_multibyte() {
        let text = "ééé KEY ééé";
        let start = text.find("KEY").unwrap();
        let (from, to) = char_window(text, start, start + 3, 2);
        assert_eq!(&text[from..to], "é KEY é");
        let (from, to) = char_window(text, start, start + 3, 100);
        assert_eq!((from, to), (0, text.len()));
    }
}
