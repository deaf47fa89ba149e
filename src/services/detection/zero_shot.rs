// Zero-shot Frame Detection
// Scores each frame through an NLI-style classifier over human-readable descriptions

use super::{validate_threshold, DetectorError, FrameDetector, DEFAULT_THRESHOLD};
use crate::models::{Frame, FrameScores};
use crate::services::lexicon::FRAME_DESCRIPTIONS;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Parallel label/score vectors, the shape zero-shot pipelines answer with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZeroShotOutput {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

pub trait ZeroShotClassifier {
    fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        multi_label: bool,
    ) -> Result<ZeroShotOutput, DetectorError>;
}

/// Frame <-> description lookup in both directions, in a fixed candidate order.
#[derive(Debug, Clone)]
pub struct FrameLabelTable {
    order: Vec<Frame>,
    descriptions: BTreeMap<Frame, String>,
    frames: HashMap<String, Frame>,
}

impl Default for FrameLabelTable {
    fn default() -> Self {
        Self::for_frames(&Frame::ALL)
    }
}

impl FrameLabelTable {
    pub fn new<I, S>(entries: I) -> Result<Self, DetectorError>
    where
        I: IntoIterator<Item = (Frame, S)>,
        S: Into<String>,
    {
        let mut table = Self {
            order: Vec::new(),
            descriptions: BTreeMap::new(),
            frames: HashMap::new(),
        };

        for (frame, description) in entries {
            let description = description.into();
            if table.descriptions.contains_key(&frame) {
                return Err(DetectorError::InvalidLabels(format!("frame {} listed twice", frame)));
            }
            if table.frames.contains_key(&description) {
                return Err(DetectorError::InvalidLabels(format!(
                    "description '{}' used for two frames",
                    description
                )));
            }
            table.order.push(frame);
            table.frames.insert(description.clone(), frame);
            table.descriptions.insert(frame, description);
        }

        if table.order.is_empty() {
            return Err(DetectorError::InvalidLabels("no frames".to_string()));
        }
        Ok(table)
    }

    /// Default descriptions for the given frames, in the given order.
    pub fn for_frames(frames: &[Frame]) -> Self {
        let mut order = Vec::new();
        let mut descriptions = BTreeMap::new();
        let mut lookup = HashMap::new();
        for frame in frames {
            if descriptions.contains_key(frame) {
                continue;
            }
            let description = FRAME_DESCRIPTIONS
                .iter()
                .find(|(f, _)| f == frame)
                .map(|(_, d)| d.to_string())
                .unwrap_or_else(|| frame.as_str().to_string());
            order.push(*frame);
            lookup.insert(description.clone(), *frame);
            descriptions.insert(*frame, description);
        }
        Self {
            order,
            descriptions,
            frames: lookup,
        }
    }

    pub fn description(&self, frame: Frame) -> Option<&str> {
        self.descriptions.get(&frame).map(String::as_str)
    }

    pub fn frame_for(&self, description: &str) -> Option<Frame> {
        self.frames.get(description).copied()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.order
    }

    pub fn candidate_labels(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|f| self.description(*f))
            .collect()
    }
}

pub struct ZeroShotFrameDetector<C: ZeroShotClassifier> {
    classifier: C,
    labels: FrameLabelTable,
    threshold: f64,
    name: String,
}

impl<C: ZeroShotClassifier> ZeroShotFrameDetector<C> {
    pub fn new(classifier: C, labels: FrameLabelTable) -> Self {
        Self {
            classifier,
            labels,
            threshold: DEFAULT_THRESHOLD,
            name: "zero-shot".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn labels(&self) -> &FrameLabelTable {
        &self.labels
    }
}

impl<C: ZeroShotClassifier> FrameDetector for ZeroShotFrameDetector<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<(), DetectorError> {
        self.threshold = validate_threshold(threshold)?;
        Ok(())
    }

    fn predict_proba(&self, text: &str) -> Result<FrameScores, DetectorError> {
        // An empty premise entails nothing.
        if text.trim().is_empty() {
            return Ok(self.labels.frames().iter().map(|f| (*f, 0.0)).collect());
        }

        let candidates = self.labels.candidate_labels();
        let output = self.classifier.classify(text, &candidates, true)?;

        if output.labels.len() != output.scores.len() {
            return Err(DetectorError::MalformedResponse(format!(
                "{} labels but {} scores",
                output.labels.len(),
                output.scores.len()
            )));
        }

        let mut scores = FrameScores::new();
        for (label, score) in output.labels.iter().zip(&output.scores) {
            let frame = self
                .labels
                .frame_for(label)
                .ok_or_else(|| DetectorError::UnmappedLabel(label.clone()))?;
            scores.insert(frame, *score);
        }

        debug!(detector = %self.name, ?scores, "zero_shot.scored");
        Ok(scores)
    }
}
