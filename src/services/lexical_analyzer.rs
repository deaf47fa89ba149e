// Lexical Analyzer
// Rule-based detection of demographic mentions, statistics and frame indicators,
// plus the article preprocessing pass that bundles them.

use crate::models::{
    coded_frames, Article, DemographicGroup, DemographicSet, Frame, LeadershipContext,
    PreprocessedArticle, StatisticKind, StatisticMention, TrainingExample, UnknownFrame,
};
use crate::services::lexicon::{
    whole_word_pattern, COMPARISON_PATTERN, DEMOGRAPHIC_PATTERNS, FRAME_INDICATORS,
    LEADERSHIP_TERMS, PERCENTAGE_PATTERN,
};
use crate::services::segmenter::Segmenter;
use crate::services::text_processor::{char_window, context_snippet, word_count, TextNormalizer};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

const STAT_CONTEXT_CHARS: usize = 50;
const CANDIDATE_CONTEXT_CHARS: usize = 50;
const LEADERSHIP_CONTEXT_CHARS: usize = 100;

/// Stateless pattern matcher over the fixed lexicon tables. Regexes are compiled once in `new`.
#[derive(Debug, Clone)]
pub struct LexicalAnalyzer {
    normalizer: TextNormalizer,
    segmenter: Segmenter,
    demographic_res: Vec<(DemographicGroup, Regex)>,
    leadership_res: Vec<(&'static str, Regex)>,
    indicator_res: Vec<(Frame, Vec<Regex>)>,
    percent_re: Regex,
    comparison_re: Regex,
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        let demographic_res = DEMOGRAPHIC_PATTERNS
            .iter()
            .map(|(group, pattern)| {
                let re = Regex::new(&format!("(?i){}", pattern)).expect("demographic pattern");
                (*group, re)
            })
            .collect();

        let leadership_res = LEADERSHIP_TERMS
            .iter()
            .map(|term| (*term, Regex::new(&whole_word_pattern(term)).expect("leadership term")))
            .collect();

        // Indicators match anywhere, including inside longer words.
        let indicator_res = FRAME_INDICATORS
            .iter()
            .map(|(frame, terms)| {
                let res = terms
                    .iter()
                    .map(|t| Regex::new(&format!("(?i){}", regex::escape(t))).expect("indicator term"))
                    .collect();
                (*frame, res)
            })
            .collect();

        Self {
            normalizer: TextNormalizer::new(),
            segmenter: Segmenter::default(),
            demographic_res,
            leadership_res,
            indicator_res,
            percent_re: Regex::new(PERCENTAGE_PATTERN).expect("percentage pattern"),
            comparison_re: Regex::new(COMPARISON_PATTERN).expect("comparison pattern"),
        }
    }

    /// Matched surface terms per demographic group, with intersectional groups derived
    /// from gender/race co-presence.
    pub fn demographic_matches(&self, text: &str) -> BTreeMap<DemographicGroup, Vec<String>> {
        let mut found: BTreeMap<DemographicGroup, Vec<String>> = BTreeMap::new();

        for (group, re) in &self.demographic_res {
            let matches: Vec<String> = re.find_iter(text).map(|m| m.as_str().to_lowercase()).collect();
            if !matches.is_empty() {
                found.insert(*group, matches);
            }
        }

        let has = |g: DemographicGroup| found.contains_key(&g);
        let of_color = found.keys().any(|g| g.is_race_of_color());
        let women = has(DemographicGroup::Women);
        let men = has(DemographicGroup::Men);
        let white = has(DemographicGroup::White);

        let mut derived = Vec::new();
        if women && of_color {
            derived.push((DemographicGroup::WomenOfColor, "women of color"));
        }
        if men && white {
            derived.push((DemographicGroup::WhiteMen, "white men"));
        }
        if women && white {
            derived.push((DemographicGroup::WhiteWomen, "white women"));
        }
        if men && of_color {
            derived.push((DemographicGroup::MenOfColor, "men of color"));
        }
        for (group, label) in derived {
            found.insert(group, vec![label.to_string()]);
        }

        found
    }

    pub fn demographics(&self, text: &str) -> DemographicSet {
        self.demographic_matches(text).into_keys().collect()
    }

    /// Percentages ("21%", "21 percent") and multiplicative comparisons ("3 times less").
    pub fn statistics(&self, text: &str) -> Vec<StatisticMention> {
        let mut stats = Vec::new();

        for caps in self.percent_re.captures_iter(text) {
            let full = caps.get(0).expect("group 0");
            stats.push(StatisticMention {
                kind: StatisticKind::Percentage,
                value: caps[1].to_string(),
                direction: None,
                context: context_snippet(text, full.start(), full.end(), STAT_CONTEXT_CHARS),
            });
        }

        for caps in self.comparison_re.captures_iter(text) {
            let full = caps.get(0).expect("group 0");
            stats.push(StatisticMention {
                kind: StatisticKind::Comparison,
                value: caps[1].to_string(),
                direction: Some(caps[2].to_lowercase()),
                context: context_snippet(text, full.start(), full.end(), STAT_CONTEXT_CHARS),
            });
        }

        stats
    }

    /// Context snippets for every indicator hit, keyed by frame. Frames without hits are absent.
    pub fn frame_candidates(&self, text: &str) -> BTreeMap<Frame, Vec<String>> {
        let mut candidates = BTreeMap::new();

        for (frame, res) in &self.indicator_res {
            let found: Vec<String> = res
                .iter()
                .flat_map(|re| re.find_iter(text))
                .map(|m| context_snippet(text, m.start(), m.end(), CANDIDATE_CONTEXT_CHARS))
                .collect();
            if !found.is_empty() {
                candidates.insert(*frame, found);
            }
        }

        candidates
    }

    pub fn leadership_contexts(&self, text: &str) -> Vec<LeadershipContext> {
        let mut contexts = Vec::new();
        for (term, re) in &self.leadership_res {
            for m in re.find_iter(text) {
                let (start, end) = char_window(text, m.start(), m.end(), LEADERSHIP_CONTEXT_CHARS);
                contexts.push(LeadershipContext {
                    term: term.to_string(),
                    start,
                    end,
                    context: text[start..end].to_string(),
                });
            }
        }
        contexts
    }

    fn mentions_leadership(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        LEADERSHIP_TERMS.iter().any(|term| lower.contains(term))
    }

    /// Full preprocessing pass. Paragraphs come from the raw content so blank-line breaks survive.
    pub fn preprocess_article(&self, article: &Article) -> PreprocessedArticle {
        let cleaned = self.normalizer.normalize(&article.content);

        let sentences: Vec<String> = self
            .segmenter
            .sentences(&cleaned)
            .into_iter()
            .map(|s| s.text)
            .collect();
        let paragraphs: Vec<String> = self
            .segmenter
            .paragraphs(&article.content)
            .into_iter()
            .map(|p| self.normalizer.normalize(&p.text))
            .collect();

        let preprocessed = PreprocessedArticle {
            article_id: article.id.clone(),
            source: article.source.clone(),
            date: article.date.clone(),
            title: article.title.clone(),
            original_content: article.content.clone(),
            leadership_contexts: self.leadership_contexts(&cleaned),
            demographics_found: self.demographic_matches(&cleaned),
            statistics: self.statistics(&cleaned),
            frame_candidates: self.frame_candidates(&cleaned),
            word_count: word_count(&cleaned),
            sentence_count: sentences.len(),
            sentences,
            paragraphs,
            cleaned_content: cleaned,
            human_coding: article.human_coding.clone(),
        };

        debug!(
            article_id = %preprocessed.article_id,
            words = preprocessed.word_count,
            sentences = preprocessed.sentence_count,
            demographics = preprocessed.demographics_found.len(),
            "lexical.preprocessed"
        );

        preprocessed
    }

    /// One example per paragraph that mentions leadership; labels come from the human coding.
    pub fn training_examples(&self, article: &PreprocessedArticle) -> Result<Vec<TrainingExample>, UnknownFrame> {
        let labels = match &article.human_coding {
            Some(coding) => Some(coded_frames(coding)?.into_iter().collect::<Vec<_>>()),
            None => None,
        };

        Ok(article
            .paragraphs
            .iter()
            .filter(|p| self.mentions_leadership(p))
            .map(|p| TrainingExample {
                text: p.clone(),
                article_id: article.article_id.clone(),
                demographics: self.demographics(p).into_iter().collect(),
                labels: labels.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_article() -> Article {
        let mut coding = BTreeMap::new();
        coding.insert("underrepresentation".to_string(), BTreeMap::from([("women".to_string(), 1)]));
        coding.insert("obstacles".to_string(), BTreeMap::from([("women".to_string(), 1)]));
        Article {
            id: "test_001".to_string(),
            source: "Test News".to_string(),
            date: "2021-01-01".to_string(),
            title: "Women in Leadership".to_string(),
            content: "Despite making up nearly half of the workforce, women hold only 21% of C-suite positions.\n\nThis underrepresentation highlights barriers that women face on the path to CEO."
                .to_string(),
            human_coding: Some(coding),
        }
    }

    #[test]
    fn test_demographics_basic() {
        let lex = LexicalAnalyzer::new();
        let demos = lex.demographics("Women and men work together");
        assert!(demos.contains(&DemographicGroup::Women));
        assert!(demos.contains(&DemographicGroup::Men));
        assert!(!demos.contains(&DemographicGroup::WhiteMen));
    }

    #[test]
    fn test_demographics_intersectional() {
        let lex = LexicalAnalyzer::new();
        let demos = lex.demographics("Black women face barriers");
        assert!(demos.contains(&DemographicGroup::Women));
        assert!(demos.contains(&DemographicGroup::Black));
        assert!(demos.contains(&DemographicGroup::WomenOfColor));

        let demos = lex.demographics("Black women face unique challenges compared to white men");
        assert!(demos.contains(&DemographicGroup::WomenOfColor));
        assert!(demos.contains(&DemographicGroup::WhiteMen));
        assert!(demos.contains(&DemographicGroup::WhiteWomen));
        assert!(demos.contains(&DemographicGroup::MenOfColor));
    }

    #[test]
    fn test_demographics_race_and_whole_words() {
        let lex = LexicalAnalyzer::new();
        let demos = lex.demographics("Hispanic and Asian leaders are increasing");
        assert!(demos.contains(&DemographicGroup::Hispanic));
        assert!(demos.contains(&DemographicGroup::Asian));
        // "women" must not register as "men"
        assert!(!lex.demographics("Women lead").contains(&DemographicGroup::Men));
        assert!(lex.demographics("").is_empty());
    }

    #[test]
    fn test_demographic_matches_keep_terms() {
        let lex = LexicalAnalyzer::new();
        let found = lex.demographic_matches("A Woman and two girls met Latina founders.");
        assert_eq!(found[&DemographicGroup::Women], vec!["woman", "girls"]);
        assert_eq!(found[&DemographicGroup::WomenOfColor], vec!["women of color"]);
    }

    #[test]
    fn test_statistics() {
        let lex = LexicalAnalyzer::new();
        let stats = lex.statistics("Women hold only 21% of leadership positions.");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].kind, StatisticKind::Percentage);
        assert_eq!(stats[0].value, "21");
        assert_eq!(stats[0].context, "Women hold only 21% of leadership positions.");

        let stats = lex.statistics("Men are 3 times more likely, and 12.5 percent say so.");
        let pct: Vec<_> = stats.iter().filter(|s| s.kind == StatisticKind::Percentage).collect();
        let cmp: Vec<_> = stats.iter().filter(|s| s.kind == StatisticKind::Comparison).collect();
        assert_eq!(pct[0].value, "12.5");
        assert_eq!(cmp[0].value, "3");
        assert_eq!(cmp[0].direction.as_deref(), Some("more"));
        assert!(lex.statistics("").is_empty());
    }

    #[test]
    fn test_frame_candidates() {
        let lex = LexicalAnalyzer::new();
        let text = "Women are underrepresented in leadership, facing barriers to advancement, but some have achieved breakthrough successes.";
        let candidates = lex.frame_candidates(text);
        assert!(candidates.contains_key(&Frame::Underrepresentation));
        assert!(candidates.contains_key(&Frame::Obstacles));
        assert!(candidates.contains_key(&Frame::Successes));
        assert!(!candidates.contains_key(&Frame::Overrepresentation));
        assert!(candidates[&Frame::Underrepresentation].iter().any(|c| c.contains("underrepresented")));
        assert!(candidates[&Frame::Obstacles].iter().any(|c| c.contains("barriers")));
        assert!(candidates[&Frame::Successes].iter().any(|c| c.contains("breakthrough")));
    }

    #[test]
    fn test_frame_candidates_match_substrings() {
        let lex = LexicalAnalyzer::new();
        // "first" inside "firsthand" still counts
        let candidates = lex.frame_candidates("She saw it firsthand.");
        assert!(candidates.contains_key(&Frame::Successes));
        assert!(lex.frame_candidates("").is_empty());
    }

    #[test]
    fn test_leadership_contexts() {
        let lex = LexicalAnalyzer::new();
        let contexts = lex.leadership_contexts("She became the first female CEO of the firm.");
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].term, "ceo");
        assert_eq!(contexts[0].start, 0);
    }

    #[test]
    fn test_preprocess_article() {
        let lex = LexicalAnalyzer::new();
        let article = sample_article();
        let processed = lex.preprocess_article(&article);
        assert_eq!(processed.article_id, "test_001");
        assert!(!processed.cleaned_content.contains('\n'));
        assert_eq!(processed.sentence_count, 2);
        assert_eq!(processed.paragraphs.len(), 2);
        assert!(processed.demographics_found.contains_key(&DemographicGroup::Women));
        assert!(processed.frame_candidates.contains_key(&Frame::Underrepresentation));
        assert!(processed.frame_candidates.contains_key(&Frame::Obstacles));
        assert_eq!(processed.statistics[0].value, "21");
        assert!(processed.human_coding.is_some());
    }

    #[test]
    fn test_training_examples() {
        let lex = LexicalAnalyzer::new();
        let processed = lex.preprocess_article(&sample_article());
        let examples = lex.training_examples(&processed).unwrap();
        assert_eq!(examples.len(), 2);
        let labels = examples[0].labels.clone().unwrap();
        assert_eq!(labels, vec![Frame::Underrepresentation, Frame::Obstacles]);
        assert!(examples[1].demographics.contains(&DemographicGroup::Women));
    }

    #[test]
    fn test_training_examples_reject_unknown_frame() {
        let lex = LexicalAnalyzer::new();
        let mut article = sample_article();
        article
            .human_coding
            .as_mut()
            .unwrap()
            .insert("tokenism".to_string(), BTreeMap::from([("women".to_string(), 2)]));
        let processed = lex.preprocess_article(&article);
        assert!(lex.training_examples(&processed).is_err());
    }
}
