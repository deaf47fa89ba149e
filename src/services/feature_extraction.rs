// Feature Extraction
// Flat numeric features over a text unit: lexical, demographic, linguistic,
// statistical and leadership-context groups, each under its own name prefix.

use crate::models::{FeatureVector, Frame, UnknownFrame};
use crate::services::lexicon::{
    whole_word_pattern, COMPARISON_PATTERN, DEMOGRAPHIC_TERMS, FRAME_LEXICONS,
    LEADERSHIP_POSITIONS, LINGUISTIC_PATTERNS, PERCENTAGE_PATTERN, STRONG_CATEGORY,
};
use crate::services::text_processor::{char_window, word_count};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

const CONTEXT_WINDOW_CHARS: usize = 50;
const STRONG_WEIGHT: f64 = 2.0;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error(transparent)]
    UnknownFrame(#[from] UnknownFrame),
    #[error("got {labels} label sets for {texts} texts")]
    LabelCountMismatch { texts: usize, labels: usize },
}

/// Dense training matrix. Columns follow `feature_names`; label columns follow `Frame::ALL`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMatrix {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Option<Vec<[u8; 4]>>,
}

impl TrainingMatrix {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }
}

struct LexiconGroup {
    frame: Frame,
    categories: Vec<(&'static str, Vec<Regex>)>,
    /// Raw terms, substring-matched inside leadership contexts.
    terms: Vec<&'static str>,
}

#[derive(Debug, Clone)]
struct TermCounter {
    name: String,
    patterns: Vec<Regex>,
}

impl TermCounter {
    fn count(&self, text: &str) -> usize {
        self.patterns.iter().map(|re| re.find_iter(text).count()).sum()
    }
}

pub struct FeatureExtractor {
    lexicons: Vec<LexiconGroup>,
    demographics: Vec<TermCounter>,
    linguistic: Vec<(String, Regex)>,
    leadership: Vec<Regex>,
    percent_re: Regex,
    comparison_re: Regex,
    number_re: Regex,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn term_regexes(terms: &[&str]) -> Vec<Regex> {
    terms
        .iter()
        .map(|t| Regex::new(&whole_word_pattern(t)).expect("lexicon term"))
        .collect()
}

impl FeatureExtractor {
    pub fn new() -> Self {
        let lexicons = FRAME_LEXICONS
            .iter()
            .map(|(frame, categories)| LexiconGroup {
                frame: *frame,
                categories: categories
                    .iter()
                    .map(|(name, terms)| (*name, term_regexes(terms)))
                    .collect(),
                terms: categories.iter().flat_map(|(_, terms)| terms.iter().copied()).collect(),
            })
            .collect();

        let demographics = DEMOGRAPHIC_TERMS
            .iter()
            .flat_map(|(category, groups)| {
                groups.iter().map(move |(group, terms)| TermCounter {
                    name: format!("demo_{}_{}", category, group),
                    patterns: term_regexes(terms),
                })
            })
            .collect();

        let linguistic = LINGUISTIC_PATTERNS
            .iter()
            .map(|(name, pattern)| {
                let re = Regex::new(&format!("(?i){}", pattern)).expect("linguistic pattern");
                (format!("ling_{}_count", name), re)
            })
            .collect();

        Self {
            lexicons,
            demographics,
            linguistic,
            leadership: term_regexes(LEADERSHIP_POSITIONS),
            percent_re: Regex::new(PERCENTAGE_PATTERN).expect("percentage pattern"),
            comparison_re: Regex::new(COMPARISON_PATTERN).expect("comparison pattern"),
            number_re: Regex::new(r"\b\d+\b").expect("number pattern"),
        }
    }

    /// All feature groups merged into one vector. Empty text yields zero counts and ratios.
    pub fn extract(&self, text: &str) -> FeatureVector {
        let mut fv = FeatureVector::default();

        self.lexical_features(text, &mut fv.values);
        self.demographic_features(text, &mut fv.values);
        self.linguistic_features(text, &mut fv.values);
        fv.percentage_values = self.statistical_features(text, &mut fv.values);
        self.context_features(text, &mut fv.values);

        fv.values.insert("text_length".to_string(), text.chars().count() as f64);
        fv.values.insert("word_count".to_string(), word_count(text) as f64);

        fv
    }

    fn lexical_features(&self, text: &str, out: &mut BTreeMap<String, f64>) {
        let mut raw = BTreeMap::new();

        for group in &self.lexicons {
            let mut total = 0.0;
            for (category, patterns) in &group.categories {
                let count: usize = patterns.iter().map(|re| re.find_iter(text).count()).sum();
                let weight = if *category == STRONG_CATEGORY { STRONG_WEIGHT } else { 1.0 };
                total += count as f64 * weight;
                raw.insert(format!("{}_{}_count", group.frame, category), count as f64);
            }
            raw.insert(format!("{}_total_score", group.frame), total);
        }

        let words = word_count(text);
        for (name, value) in raw {
            let normalized = if words > 0 { value / words as f64 } else { 0.0 };
            out.insert(format!("{}_normalized", name), normalized);
            out.insert(name, value);
        }
    }

    fn demographic_features(&self, text: &str, out: &mut BTreeMap<String, f64>) {
        for counter in &self.demographics {
            out.insert(counter.name.clone(), counter.count(text) as f64);
        }

        let present = |name: &str| out.get(name).copied().unwrap_or(0.0) > 0.0;
        let black_women = present("demo_gender_women") && present("demo_race_black");
        let white_men = present("demo_gender_men") && present("demo_race_white");

        out.insert("demo_intersect_black_women".to_string(), flag(black_women));
        out.insert("demo_intersect_white_men".to_string(), flag(white_men));
    }

    fn linguistic_features(&self, text: &str, out: &mut BTreeMap<String, f64>) {
        for (name, re) in &self.linguistic {
            out.insert(name.clone(), re.find_iter(text).count() as f64);
        }

        let lengths: Vec<usize> = text
            .split('.')
            .filter(|s| !s.trim().is_empty())
            .map(word_count)
            .collect();
        let avg = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };

        out.insert("ling_avg_sentence_length".to_string(), avg);
        out.insert("ling_num_sentences".to_string(), lengths.len() as f64);
        out.insert("ling_questions".to_string(), text.matches('?').count() as f64);
        out.insert("ling_exclamations".to_string(), text.matches('!').count() as f64);
    }

    /// Returns the raw percentage figures, which stay out of the named features.
    fn statistical_features(&self, text: &str, out: &mut BTreeMap<String, f64>) -> Vec<f64> {
        let percentages: Vec<f64> = self
            .percent_re
            .captures_iter(text)
            .filter_map(|caps| caps[1].parse::<f64>().ok())
            .collect();

        out.insert("stats_has_percentages".to_string(), flag(!percentages.is_empty()));
        if !percentages.is_empty() {
            let min = percentages.iter().copied().fold(f64::INFINITY, f64::min);
            let max = percentages.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            out.insert("stats_min_percentage".to_string(), min);
            out.insert("stats_max_percentage".to_string(), max);
        }

        let numbers = self.number_re.find_iter(text).count();
        out.insert("stats_has_numbers".to_string(), flag(numbers > 0));
        out.insert("stats_count_numbers".to_string(), numbers as f64);
        out.insert(
            "stats_has_comparisons".to_string(),
            flag(self.comparison_re.is_match(text)),
        );

        percentages
    }

    fn context_features(&self, text: &str, out: &mut BTreeMap<String, f64>) {
        let contexts: Vec<&str> = self
            .leadership
            .iter()
            .flat_map(|re| re.find_iter(text))
            .map(|m| {
                let (from, to) = char_window(text, m.start(), m.end(), CONTEXT_WINDOW_CHARS);
                &text[from..to]
            })
            .collect();

        out.insert("context_leadership_mentions".to_string(), contexts.len() as f64);

        let joined = contexts.join(" ").to_lowercase();
        for group in &self.lexicons {
            // Distinct terms present, not occurrences.
            let hits = if joined.is_empty() {
                0
            } else {
                group.terms.iter().filter(|t| joined.contains(*t)).count()
            };
            out.insert(format!("context_{}_near_leadership", group.frame), hits as f64);
        }
    }

    /// Vectorize texts into a dense matrix over the union of feature names, zero-filled,
    /// with optional one-hot labels over the four frames.
    pub fn extract_for_training(
        &self,
        texts: &[&str],
        labels: Option<&[Vec<String>]>,
    ) -> Result<TrainingMatrix, FeatureError> {
        if let Some(labels) = labels {
            if labels.len() != texts.len() {
                return Err(FeatureError::LabelCountMismatch {
                    texts: texts.len(),
                    labels: labels.len(),
                });
            }
        }

        let vectors: Vec<FeatureVector> = texts.iter().map(|t| self.extract(t)).collect();

        let names: BTreeSet<&String> = vectors.iter().flat_map(|v| v.values.keys()).collect();
        let feature_names: Vec<String> = names.into_iter().cloned().collect();

        let rows = vectors
            .iter()
            .map(|v| feature_names.iter().map(|n| v.get(n)).collect())
            .collect();

        let labels = match labels {
            Some(sets) => Some(
                sets.iter()
                    .map(|set| one_hot(set))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(TrainingMatrix {
            feature_names,
            rows,
            labels,
        })
    }
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

fn one_hot(names: &[String]) -> Result<[u8; 4], UnknownFrame> {
    let mut row = [0u8; 4];
    for name in names {
        let frame: Frame = name.parse()?;
        row[frame.index()] = 1;
    }
    Ok(row)
}
