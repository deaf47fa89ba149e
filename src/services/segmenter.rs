// Segmenter
// Splits article text into sentences, paragraphs, overlapping sentence windows,
// keyword-anchored contexts and quotations.

use crate::models::{
    Article, KeywordContext, Quote, SegmentationMetadata, SegmentationResult, TextUnit, Window,
};
use crate::services::lexicon::{whole_word_pattern, LEADERSHIP_KEYWORDS};
use crate::services::text_processor::{char_window, split_paragraphs, split_sentences};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Sentences of this many characters or fewer are treated as headline/caption noise.
const SENTENCE_MIN_CHARS: usize = 10;
const PARAGRAPH_MIN_CHARS: usize = 20;
pub const DEFAULT_WINDOW_SIZE: usize = 3;
pub const DEFAULT_OVERLAP: usize = 1;
pub const DEFAULT_LEADERSHIP_RADIUS: usize = 150;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("overlap ({overlap}) must be smaller than window size ({window_size})")]
    OverlapTooLarge { window_size: usize, overlap: usize },
}

// Quote patterns accept straight and curly double quotes.

fn said_after_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)["“”]([^"“”]+)["“”]\s*,?\s*(?:said|says|according to)\s+([^,.]+)"#)
            .expect("said-after quote regex")
    })
}

fn said_before_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)([^,."“”]+?)\s+(?:said|says|stated)\s*,?\s*["“”]([^"“”]+)["“”]"#)
            .expect("said-before quote regex")
    })
}

fn bare_quote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["“”]([^"“”]{20,})["“”]"#).expect("bare quote regex"))
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    window_size: usize,
    overlap: usize,
    leadership_radius: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_OVERLAP,
            leadership_radius: DEFAULT_LEADERSHIP_RADIUS,
        }
    }
}

impl Segmenter {
    pub fn new(window_size: usize, overlap: usize) -> Result<Self, SegmentError> {
        if window_size == 0 {
            return Err(SegmentError::ZeroWindow);
        }
        if overlap >= window_size {
            return Err(SegmentError::OverlapTooLarge { window_size, overlap });
        }
        Ok(Self {
            window_size,
            overlap,
            leadership_radius: DEFAULT_LEADERSHIP_RADIUS,
        })
    }

    pub fn with_leadership_radius(mut self, radius: usize) -> Self {
        self.leadership_radius = radius;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn sentences(&self, text: &str) -> Vec<TextUnit> {
        split_sentences(text)
            .into_iter()
            .filter(|s| s.text.chars().count() > SENTENCE_MIN_CHARS)
            .collect()
    }

    pub fn paragraphs(&self, text: &str) -> Vec<TextUnit> {
        split_paragraphs(text)
            .into_iter()
            .filter(|p| p.text.chars().count() > PARAGRAPH_MIN_CHARS)
            .collect()
    }

    /// Overlapping windows of `window_size` sentences, stepping by `window_size - overlap`.
    ///
    /// Every sentence index is covered. When the stride leaves a tail uncovered, one extra
    /// window starts `overlap` sentences before the tail and runs to the last sentence, so
    /// it may be shorter than `window_size`. An empty sentence list yields no windows.
    pub fn windows(&self, sentences: &[TextUnit]) -> Vec<Window> {
        let n = sentences.len();
        if n == 0 {
            return Vec::new();
        }
        if n <= self.window_size {
            return vec![make_window(0, sentences, 0)];
        }

        let step = self.window_size - self.overlap;
        let mut windows: Vec<Window> = (0..=n - self.window_size)
            .step_by(step)
            .enumerate()
            .map(|(id, start)| make_window(id, &sentences[start..start + self.window_size], start))
            .collect();

        let last_end = windows.last().map(|w| w.end_idx).unwrap_or(0);
        if last_end < n - 1 {
            let start = last_end + 1 - self.overlap;
            windows.push(make_window(windows.len(), &sentences[start..], start));
        }

        windows
    }

    /// Context around every case-insensitive whole-word occurrence of each keyword.
    ///
    /// The span is `radius` characters either side of the match, tightened to the nearest
    /// period inside that span on each side.
    pub fn keyword_contexts(&self, text: &str, keywords: &[&str], radius: usize) -> Vec<KeywordContext> {
        let mut segments = Vec::new();

        for keyword in keywords {
            let re = match Regex::new(&whole_word_pattern(keyword)) {
                Ok(re) => re,
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "segmenter.keyword_pattern_invalid");
                    continue;
                }
            };

            for m in re.find_iter(text) {
                let (mut start, mut end) = char_window(text, m.start(), m.end(), radius);

                if let Some(p) = text[start..m.start()].rfind('.') {
                    start += p + 1;
                }
                if let Some(p) = text[m.end()..end].find('.') {
                    end = m.end() + p + 1;
                }

                let piece = &text[start..end];
                let lead = piece.len() - piece.trim_start().len();
                let trimmed = piece.trim();
                let unit_start = start + lead;

                segments.push(KeywordContext {
                    segment_id: segments.len(),
                    keyword: keyword.to_string(),
                    text: trimmed.to_string(),
                    keyword_position: m.start() - unit_start,
                    start: unit_start,
                    end: unit_start + trimmed.len(),
                });
            }
        }

        segments
    }

    /// Quotations from three overlapping patterns; every match of every pattern is kept.
    pub fn quotes(&self, text: &str) -> Vec<Quote> {
        let mut quotes = Vec::new();

        for caps in said_after_re().captures_iter(text) {
            let full = caps.get(0).expect("group 0");
            quotes.push(Quote {
                text: caps[1].trim().to_string(),
                attribution: Some(caps[2].trim().to_string()),
                full_match: full.as_str().to_string(),
                start: full.start(),
                end: full.end(),
            });
        }

        for caps in said_before_re().captures_iter(text) {
            let full = caps.get(0).expect("group 0");
            let attribution = caps[1].trim();
            quotes.push(Quote {
                text: caps[2].trim().to_string(),
                attribution: (!attribution.is_empty()).then(|| attribution.to_string()),
                full_match: full.as_str().to_string(),
                start: full.start(),
                end: full.end(),
            });
        }

        for caps in bare_quote_re().captures_iter(text) {
            let full = caps.get(0).expect("group 0");
            quotes.push(Quote {
                text: caps[1].trim().to_string(),
                attribution: None,
                full_match: full.as_str().to_string(),
                start: full.start(),
                end: full.end(),
            });
        }

        quotes
    }

    /// Every segmentation view of `text` at once.
    pub fn segment_text(&self, text: &str) -> SegmentationResult {
        let sentences = self.sentences(text);
        let paragraphs = self.paragraphs(text);
        let windows = self.windows(&sentences);
        let quotes = self.quotes(text);
        let leadership_segments =
            self.keyword_contexts(text, LEADERSHIP_KEYWORDS, self.leadership_radius);

        let avg_sentence_length = if sentences.is_empty() {
            0.0
        } else {
            sentences.iter().map(|s| s.word_count()).sum::<usize>() as f64 / sentences.len() as f64
        };

        let metadata = SegmentationMetadata {
            total_sentences: sentences.len(),
            total_paragraphs: paragraphs.len(),
            total_windows: windows.len(),
            total_quotes: quotes.len(),
            avg_sentence_length,
        };

        debug!(
            sentences = metadata.total_sentences,
            paragraphs = metadata.total_paragraphs,
            windows = metadata.total_windows,
            quotes = metadata.total_quotes,
            "segmenter.segmented"
        );

        SegmentationResult {
            sentences,
            paragraphs,
            windows,
            quotes,
            leadership_segments,
            metadata,
        }
    }

    pub fn segment_for_analysis(&self, article: &Article) -> SegmentationResult {
        self.segment_text(&article.content)
    }
}

fn make_window(window_id: usize, sentences: &[TextUnit], start_idx: usize) -> Window {
    let texts: Vec<String> = sentences.iter().map(|s| s.text.clone()).collect();
    Window {
        window_id,
        start_idx,
        end_idx: start_idx + sentences.len().saturating_sub(1),
        text: texts.join(" "),
        sentences: texts,
        start: sentences.first().map(|s| s.start).unwrap_or(0),
        end: sentences.last().map(|s| s.end).unwrap_or(0),
    }
}
