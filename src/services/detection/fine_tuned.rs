// Fine-tuned Frame Detection
// Multi-label logit models; every output unit gets its own sigmoid (labels are not exclusive)

use super::{validate_threshold, DetectorError, FrameDetector, DEFAULT_THRESHOLD};
use crate::models::{Frame, FrameScores};
use crate::services::feature_extraction::FeatureExtractor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A trained multi-label classifier: one raw logit per configured frame, in label order.
pub trait LogitModel {
    fn logits(&self, text: &str) -> Result<Vec<f64>, DetectorError>;
}

pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub struct FineTunedFrameDetector<M: LogitModel> {
    model: M,
    labels: Vec<Frame>,
    threshold: f64,
    name: String,
}

impl<M: LogitModel> FineTunedFrameDetector<M> {
    /// `labels` fixes the meaning of each model output position.
    pub fn new(model: M, labels: Vec<Frame>) -> Result<Self, DetectorError> {
        let distinct: BTreeSet<Frame> = labels.iter().copied().collect();
        if labels.is_empty() || distinct.len() != labels.len() {
            return Err(DetectorError::InvalidLabels(
                "labels must be non-empty and distinct".to_string(),
            ));
        }
        Ok(Self {
            model,
            labels,
            threshold: DEFAULT_THRESHOLD,
            name: "fine-tuned".to_string(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn labels(&self) -> &[Frame] {
        &self.labels
    }
}

impl<M: LogitModel> FrameDetector for FineTunedFrameDetector<M> {
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
        let logits = self.model.logits(text)?;
        if logits.len() != self.labels.len() {
            return Err(DetectorError::OutputMismatch {
                expected: self.labels.len(),
                got: logits.len(),
            });
        }

        let scores: FrameScores = self
            .labels
            .iter()
            .zip(logits)
            .map(|(frame, logit)| (*frame, sigmoid(logit)))
            .collect();

        debug!(detector = %self.name, ?scores, "fine_tuned.scored");
        Ok(scores)
    }
}

/// On-disk form of a linear frame head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub features: Vec<String>,
    /// One row per output frame, one column per entry of `features`.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

/// Linear head over `FeatureExtractor` features:
/// `logit[i] = bias[i] + sum_j weights[i][j] * feature(features[j])`.
pub struct LinearFrameModel {
    weights: LinearWeights,
    extractor: FeatureExtractor,
}

impl LinearFrameModel {
    pub fn from_weights(weights: LinearWeights) -> Result<Self, DetectorError> {
        let rows = weights.weights.len();
        if rows == 0 || rows != weights.bias.len() {
            return Err(DetectorError::MalformedResponse(format!(
                "linear model has {} weight rows and {} biases",
                rows,
                weights.bias.len()
            )));
        }
        if let Some(bad) = weights.weights.iter().position(|r| r.len() != weights.features.len()) {
            return Err(DetectorError::MalformedResponse(format!(
                "weight row {} has {} columns, expected {}",
                bad,
                weights.weights[bad].len(),
                weights.features.len()
            )));
        }
        Ok(Self {
            weights,
            extractor: FeatureExtractor::new(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, DetectorError> {
        let load_err = |message: String| DetectorError::ModelLoad {
            path: path.to_path_buf(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let weights: LinearWeights =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        let model = Self::from_weights(weights).map_err(|e| load_err(e.to_string()))?;

        info!(
            path = %path.display(),
            outputs = model.outputs(),
            features = model.weights.features.len(),
            "linear_model.loaded"
        );
        Ok(model)
    }

    pub fn outputs(&self) -> usize {
        self.weights.bias.len()
    }
}

impl LogitModel for LinearFrameModel {
    fn logits(&self, text: &str) -> Result<Vec<f64>, DetectorError> {
        let fv = self.extractor.extract(text);
        let inputs: Vec<f64> = self.weights.features.iter().map(|n| fv.get(n)).collect();

        Ok(self
            .weights
            .weights
            .iter()
            .zip(&self.weights.bias)
            .map(|(row, b)| b + row.iter().zip(&inputs).map(|(w, x)| w * x).sum::<f64>())
            .collect())
    }
}
