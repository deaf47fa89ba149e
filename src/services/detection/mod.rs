// Detection Module
// Frame detection organized into specialized submodules:
// - zero_shot: NLI-style classifier over frame descriptions
// - fine_tuned: multi-label logit models with per-frame sigmoid
// - ensemble: weighted combination of member detectors
// - inference_client: blocking HTTP backends for hosted models
// - aggregation: folds per-window predictions into an article verdict
// - analyzer: runs segmentation and detection over whole articles

pub mod aggregation;
pub mod analyzer;
pub mod ensemble;
pub mod fine_tuned;
pub mod inference_client;
pub mod zero_shot;

use crate::models::{FramePrediction, FrameScores, UnknownFrame};
use std::path::PathBuf;
use thiserror::Error;

pub use aggregation::{aggregate_windows, WindowAggregate};
pub use analyzer::FrameAnalyzer;
pub use ensemble::EnsembleFrameDetector;
pub use fine_tuned::{sigmoid, FineTunedFrameDetector, LinearFrameModel, LinearWeights, LogitModel};
pub use inference_client::{HttpLogitModel, HttpZeroShotClassifier, InferenceClient};
pub use zero_shot::{FrameLabelTable, ZeroShotClassifier, ZeroShotFrameDetector, ZeroShotOutput};

pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
    #[error("Model label '{0}' maps to no frame")]
    UnmappedLabel(String),
    #[error("Model returned {got} outputs, expected {expected}")]
    OutputMismatch { expected: usize, got: usize },
    #[error("Threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("Invalid ensemble: {0}")]
    InvalidEnsemble(String),
    #[error("Invalid label set: {0}")]
    InvalidLabels(String),
    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error(transparent)]
    UnknownFrame(#[from] UnknownFrame),
}

pub fn validate_threshold(threshold: f64) -> Result<f64, DetectorError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(DetectorError::InvalidThreshold(threshold))
    }
}

/// Maps text to per-frame confidences and thresholded frame labels.
///
/// Only `threshold` is mutable between calls; everything else is fixed at construction.
pub trait FrameDetector {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    fn threshold(&self) -> f64;

    fn set_threshold(&mut self, threshold: f64) -> Result<(), DetectorError>;

    fn predict_proba(&self, text: &str) -> Result<FrameScores, DetectorError>;

    fn predict(&self, text: &str) -> Result<FramePrediction, DetectorError> {
        Ok(FramePrediction::from_scores(self.predict_proba(text)?, self.threshold()))
    }

    /// Sequential, in input order; the first failure aborts the batch.
    fn predict_proba_batch(&self, texts: &[&str]) -> Result<Vec<FrameScores>, DetectorError> {
        texts.iter().map(|t| self.predict_proba(t)).collect()
    }

    fn predict_batch(&self, texts: &[&str]) -> Result<Vec<FramePrediction>, DetectorError> {
        texts.iter().map(|t| self.predict(t)).collect()
    }
}

impl<D: FrameDetector + ?Sized> FrameDetector for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn threshold(&self) -> f64 {
        (**self).threshold()
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<(), DetectorError> {
        (**self).set_threshold(threshold)
    }

    fn predict_proba(&self, text: &str) -> Result<FrameScores, DetectorError> {
        (**self).predict_proba(text)
    }

    fn predict(&self, text: &str) -> Result<FramePrediction, DetectorError> {
        (**self).predict(text)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::Frame;
    use std::cell::RefCell;

    /// Returns scripted scores in call order, cycling when exhausted.
    pub struct ScriptedDetector {
        pub scripts: Vec<FrameScores>,
        pub threshold: f64,
        pub calls: RefCell<usize>,
        /// Every text passed to `predict_proba`, in call order.
        pub seen: RefCell<Vec<String>>,
    }

    impl ScriptedDetector {
        pub fn new(scripts: Vec<FrameScores>) -> Self {
            Self {
                scripts,
                threshold: DEFAULT_THRESHOLD,
                calls: RefCell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }

        pub fn constant(pairs: &[(Frame, f64)]) -> Self {
            Self::new(vec![pairs.iter().copied().collect()])
        }
    }

    impl FrameDetector for ScriptedDetector {
        fn name(&self) -> &str {
            "scripted"
        }

        fn threshold(&self) -> f64 {
            self.threshold
        }

        fn set_threshold(&mut self, threshold: f64) -> Result<(), DetectorError> {
            self.threshold = validate_threshold(threshold)?;
            Ok(())
        }

        fn predict_proba(&self, text: &str) -> Result<FrameScores, DetectorError> {
            self.seen.borrow_mut().push(text.to_string());
            let mut calls = self.calls.borrow_mut();
            let scores = self.scripts[*calls % self.scripts.len()].clone();
            *calls += 1;
            Ok(scores)
        }
    }

    /// Always fails, as an unreachable backend would.
    pub struct FailingDetector;

    impl FrameDetector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        fn threshold(&self) -> f64 {
            DEFAULT_THRESHOLD
        }

        fn set_threshold(&mut self, threshold: f64) -> Result<(), DetectorError> {
            validate_threshold(threshold).map(|_| ())
        }

        fn predict_proba(&self, _text: &str) -> Result<FrameScores, DetectorError> {
            Err(DetectorError::ApiError {
                status: 503,
                message: "model loading".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedDetector;
    use super::*;
    use crate::models::Frame;

    #[test]
    fn test_validate_threshold() {
        assert_eq!(validate_threshold(0.0).unwrap(), 0.0);
        assert_eq!(validate_threshold(1.0).unwrap(), 1.0);
        assert!(validate_threshold(-0.1).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_threshold_monotonicity() {
        let mut detector = ScriptedDetector::constant(&[
            (Frame::Underrepresentation, 0.9),
            (Frame::Overrepresentation, 0.1),
            (Frame::Obstacles, 0.55),
            (Frame::Successes, 0.3),
        ]);

        let mut previous: Option<Vec<Frame>> = None;
        for t in [0.95, 0.8, 0.55, 0.5, 0.3, 0.1, 0.0] {
            detector.set_threshold(t).unwrap();
            let frames = detector.predict("text").unwrap().frames;
            if let Some(prev) = &previous {
                assert!(prev.iter().all(|f| frames.contains(f)), "threshold {}", t);
            }
            previous = Some(frames);
        }
        assert_eq!(previous.unwrap().len(), 4);
    }

    #[test]
    fn test_boxed_detector_and_batch() {
        let mut boxed: Box<dyn FrameDetector> =
            Box::new(ScriptedDetector::constant(&[(Frame::Successes, 0.6)]));
        boxed.set_threshold(0.7).unwrap();
        let preds = boxed.predict_batch(&["a", "b"]).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| p.frames.is_empty()));
        assert!(boxed.set_threshold(2.0).is_err());
        assert_eq!(boxed.threshold(), 0.7);
    }
}
