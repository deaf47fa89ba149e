// LeadFrame Data Models
// Records exchanged between the loader, the pipeline stages and reporting

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============ Frames ============

/// One of the four narrative frames. Declaration order is the canonical label order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    Underrepresentation,
    Overrepresentation,
    Obstacles,
    Successes,
}

impl Frame {
    pub const ALL: [Frame; 4] = [
        Frame::Underrepresentation,
        Frame::Overrepresentation,
        Frame::Obstacles,
        Frame::Successes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frame::Underrepresentation => "underrepresentation",
            Frame::Overrepresentation => "overrepresentation",
            Frame::Obstacles => "obstacles",
            Frame::Successes => "successes",
        }
    }

    /// Position in the canonical label order.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown frame name: {0}")]
pub struct UnknownFrame(pub String);

impl FromStr for Frame {
    type Err = UnknownFrame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "underrepresentation" => Ok(Frame::Underrepresentation),
            "overrepresentation" => Ok(Frame::Overrepresentation),
            "obstacles" => Ok(Frame::Obstacles),
            "successes" => Ok(Frame::Successes),
            _ => Err(UnknownFrame(s.to_string())),
        }
    }
}

// ============ Demographics ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemographicGroup {
    Women,
    Men,
    White,
    Black,
    Hispanic,
    Asian,
    Indigenous,
    Poc,
    WomenOfColor,
    WhiteWomen,
    WhiteMen,
    MenOfColor,
}

impl DemographicGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemographicGroup::Women => "women",
            DemographicGroup::Men => "men",
            DemographicGroup::White => "white",
            DemographicGroup::Black => "black",
            DemographicGroup::Hispanic => "hispanic",
            DemographicGroup::Asian => "asian",
            DemographicGroup::Indigenous => "indigenous",
            DemographicGroup::Poc => "poc",
            DemographicGroup::WomenOfColor => "women_of_color",
            DemographicGroup::WhiteWomen => "white_women",
            DemographicGroup::WhiteMen => "white_men",
            DemographicGroup::MenOfColor => "men_of_color",
        }
    }

    /// Race groups other than white; any of these paired with a gender yields a "of color" group.
    pub fn is_race_of_color(&self) -> bool {
        matches!(
            self,
            DemographicGroup::Black
                | DemographicGroup::Hispanic
                | DemographicGroup::Asian
                | DemographicGroup::Indigenous
                | DemographicGroup::Poc
        )
    }
}

impl fmt::Display for DemographicGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type DemographicSet = BTreeSet<DemographicGroup>;

// ============ Articles ============

/// frame -> demographic group name -> count
pub type HumanCoding = BTreeMap<String, BTreeMap<String, i64>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "article_id")]
    pub id: String,
    pub source: String,
    pub date: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_coding: Option<HumanCoding>,
}

/// Frames a coding marks with at least one positive count.
pub fn coded_frames(coding: &HumanCoding) -> Result<BTreeSet<Frame>, UnknownFrame> {
    let mut frames = BTreeSet::new();
    for (frame_name, groups) in coding {
        if groups.values().any(|&count| count > 0) {
            frames.insert(frame_name.parse::<Frame>()?);
        }
    }
    Ok(frames)
}

impl Article {
    /// Frames the human coders marked; empty when the article is uncoded.
    pub fn coded_frames(&self) -> Result<BTreeSet<Frame>, UnknownFrame> {
        match &self.human_coding {
            Some(coding) => coded_frames(coding),
            None => Ok(BTreeSet::new()),
        }
    }
}

// ============ Text Units ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    pub text: String,
    /// UTF-8 byte offset (0-based) into the segmented text.
    pub start: usize,
    /// UTF-8 byte offset (end-exclusive) into the segmented text.
    pub end: usize,
}

impl TextUnit {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub window_id: usize,
    /// Inclusive index of the first sentence.
    pub start_idx: usize,
    /// Inclusive index of the last sentence.
    pub end_idx: usize,
    pub text: String,
    pub sentences: Vec<String>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordContext {
    pub segment_id: usize,
    pub keyword: String,
    pub text: String,
    /// Byte offset of the keyword inside `text`.
    pub keyword_position: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub attribution: Option<String>,
    pub full_match: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentationMetadata {
    pub total_sentences: usize,
    pub total_paragraphs: usize,
    pub total_windows: usize,
    pub total_quotes: usize,
    pub avg_sentence_length: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub sentences: Vec<TextUnit>,
    pub paragraphs: Vec<TextUnit>,
    pub windows: Vec<Window>,
    pub quotes: Vec<Quote>,
    pub leadership_segments: Vec<KeywordContext>,
    pub metadata: SegmentationMetadata,
}

// ============ Lexical Findings ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    Percentage,
    Comparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticMention {
    #[serde(rename = "type")]
    pub kind: StatisticKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipContext {
    pub term: String,
    pub start: usize,
    pub end: usize,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessedArticle {
    pub article_id: String,
    pub source: String,
    pub date: String,
    pub title: String,
    pub original_content: String,
    pub cleaned_content: String,
    pub sentences: Vec<String>,
    pub paragraphs: Vec<String>,
    pub leadership_contexts: Vec<LeadershipContext>,
    pub demographics_found: BTreeMap<DemographicGroup, Vec<String>>,
    pub statistics: Vec<StatisticMention>,
    pub frame_candidates: BTreeMap<Frame, Vec<String>>,
    pub word_count: usize,
    pub sentence_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_coding: Option<HumanCoding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub article_id: String,
    pub demographics: Vec<DemographicGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Frame>>,
}

// ============ Features ============

/// Named numeric features. Names absent from `values` are implicitly zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: BTreeMap<String, f64>,
    /// Raw percentage figures; kept beside the numeric features, never vectorized.
    #[serde(default)]
    pub percentage_values: Vec<f64>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============ Predictions ============

pub type FrameScores = BTreeMap<Frame, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePrediction {
    pub scores: FrameScores,
    pub frames: Vec<Frame>,
}

impl FramePrediction {
    /// Select every frame whose score reaches the threshold; frames are not mutually exclusive.
    pub fn from_scores(scores: FrameScores, threshold: f64) -> Self {
        let frames = scores
            .iter()
            .filter(|(_, &score)| score >= threshold)
            .map(|(frame, _)| *frame)
            .collect();
        Self { scores, frames }
    }
}

// ============ Article Analysis ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameCounts {
    pub frames: BTreeMap<Frame, usize>,
    pub demographics: BTreeMap<DemographicGroup, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub text: String,
    pub frames: Vec<Frame>,
    pub scores: FrameScores,
    pub demographics: Vec<DemographicGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub article_id: String,
    pub frames_detected: Vec<Frame>,
    pub frame_scores: FrameScores,
    pub demographics: Vec<DemographicGroup>,
    pub frame_counts: FrameCounts,
    pub segments_analyzed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_results: Option<Vec<SegmentResult>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_round_trip_names() {
        for frame in Frame::ALL {
            assert_eq!(frame.as_str().parse::<Frame>().unwrap(), frame);
        }
        assert_eq!(Frame::Obstacles.index(), 2);
    }

    #[test]
    fn test_unknown_frame_is_error() {
        let err = "tokenism".parse::<Frame>().unwrap_err();
        assert_eq!(err, UnknownFrame("tokenism".to_string()));
    }

    #[test]
    fn test_prediction_threshold_is_inclusive() {
        let mut scores = FrameScores::new();
        scores.insert(Frame::Underrepresentation, 0.5);
        scores.insert(Frame::Successes, 0.49);
        let pred = FramePrediction::from_scores(scores, 0.5);
        assert_eq!(pred.frames, vec![Frame::Underrepresentation]);
    }

    #[test]
    fn test_article_schema() {
        let json = r#"{
            "article_id": "a1",
            "source": "Daily",
            "date": "2021-01-01",
            "title": "T",
            "content": "C",
            "human_coding": {"obstacles": {"women": 2}, "successes": {"men": 0}}
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.id, "a1");
        let coded = article.coded_frames().unwrap();
        assert!(coded.contains(&Frame::Obstacles));
        assert!(!coded.contains(&Frame::Successes));
    }

    #[test]
    fn test_analysis_serializes_frame_keys_as_names() {
        let mut scores = FrameScores::new();
        scores.insert(Frame::Obstacles, 0.7);
        let analysis = ArticleAnalysis {
            article_id: "a1".to_string(),
            frames_detected: vec![Frame::Obstacles],
            frame_scores: scores,
            demographics: vec![DemographicGroup::WomenOfColor],
            frame_counts: FrameCounts::default(),
            segments_analyzed: 1,
            detailed_results: None,
        };
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["frames_detected"][0], "obstacles");
        assert_eq!(value["frame_scores"]["obstacles"], 0.7);
        assert_eq!(value["demographics"][0], "women_of_color");
        assert!(value.get("detailed_results").is_none());
    }
}
