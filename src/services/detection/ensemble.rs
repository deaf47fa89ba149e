// Ensemble Frame Detection
// Weighted sum of member scores; weights are validated once and never renormalized

use super::{validate_threshold, DetectorError, FrameDetector, DEFAULT_THRESHOLD};
use crate::models::{Frame, FrameScores};
use std::collections::BTreeSet;
use tracing::debug;

const WEIGHT_TOLERANCE: f64 = 1e-6;

pub struct EnsembleFrameDetector {
    members: Vec<Box<dyn FrameDetector>>,
    weights: Vec<f64>,
    threshold: f64,
}

impl std::fmt::Debug for EnsembleFrameDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleFrameDetector")
            .field("members", &self.members.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("weights", &self.weights)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl EnsembleFrameDetector {
    /// Without weights every member gets `1 / n`.
    pub fn new(
        members: Vec<Box<dyn FrameDetector>>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, DetectorError> {
        if members.is_empty() {
            return Err(DetectorError::InvalidEnsemble("no member detectors".to_string()));
        }

        let weights = match weights {
            None => vec![1.0 / members.len() as f64; members.len()],
            Some(weights) => {
                if weights.len() != members.len() {
                    return Err(DetectorError::InvalidEnsemble(format!(
                        "{} weights for {} detectors",
                        weights.len(),
                        members.len()
                    )));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(DetectorError::InvalidEnsemble(
                        "weights must be finite and non-negative".to_string(),
                    ));
                }
                let sum: f64 = weights.iter().sum();
                if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                    return Err(DetectorError::InvalidEnsemble(format!(
                        "weights sum to {}, expected 1.0",
                        sum
                    )));
                }
                weights
            }
        };

        Ok(Self {
            members,
            weights,
            threshold: DEFAULT_THRESHOLD,
        })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FrameDetector for EnsembleFrameDetector {
    fn name(&self) -> &str {
        "ensemble"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<(), DetectorError> {
        self.threshold = validate_threshold(threshold)?;
        Ok(())
    }

    fn predict_proba(&self, text: &str) -> Result<FrameScores, DetectorError> {
        let member_scores = self
            .members
            .iter()
            .map(|m| m.predict_proba(text))
            .collect::<Result<Vec<_>, _>>()?;

        let frames: BTreeSet<Frame> = member_scores.iter().flat_map(|s| s.keys().copied()).collect();

        let scores: FrameScores = frames
            .into_iter()
            .map(|frame| {
                let combined = member_scores
                    .iter()
                    .zip(&self.weights)
                    .map(|(s, w)| s.get(&frame).copied().unwrap_or(0.0) * w)
                    .sum();
                (frame, combined)
            })
            .collect();

        debug!(members = self.members.len(), ?scores, "ensemble.scored");
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::testing::{FailingDetector, ScriptedDetector};

    fn member(pairs: &[(Frame, f64)]) -> Box<dyn FrameDetector> {
        Box::new(ScriptedDetector::constant(pairs))
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let members = vec![member(&[]), member(&[])];
        let err = EnsembleFrameDetector::new(members, Some(vec![0.5, 0.4])).unwrap_err();
        assert!(matches!(err, DetectorError::InvalidEnsemble(_)));
    }

    #[test]
    fn test_weight_count_must_match() {
        let members = vec![member(&[]), member(&[])];
        assert!(EnsembleFrameDetector::new(members, Some(vec![1.0])).is_err());
        assert!(EnsembleFrameDetector::new(Vec::new(), None).is_err());
    }

    #[test]
    fn test_uniform_default_weights() {
        let det = EnsembleFrameDetector::new(vec![member(&[]), member(&[]), member(&[]), member(&[])], None).unwrap();
        assert_eq!(det.weights(), &[0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_weighted_sum_and_missing_frames() {
        let det = EnsembleFrameDetector::new(
            vec![
                member(&[(Frame::Obstacles, 0.9), (Frame::Successes, 0.2)]),
                member(&[(Frame::Obstacles, 0.3)]),
            ],
            Some(vec![0.75, 0.25]),
        )
        .unwrap();

        let scores = det.predict_proba("text").unwrap();
        assert!((scores[&Frame::Obstacles] - 0.75).abs() < 1e-12);
        // absent from the second member, counted as zero
        assert!((scores[&Frame::Successes] - 0.15).abs() < 1e-12);
        assert!(!scores.contains_key(&Frame::Underrepresentation));

        let pred = det.predict("text").unwrap();
        assert_eq!(pred.frames, vec![Frame::Obstacles]);
    }

    #[test]
    fn test_scores_are_convex_combinations() {
        let a = [(Frame::Underrepresentation, 0.1), (Frame::Overrepresentation, 0.95), (Frame::Obstacles, 0.4), (Frame::Successes, 0.0)];
        let b = [(Frame::Underrepresentation, 0.8), (Frame::Overrepresentation, 0.05), (Frame::Obstacles, 0.4), (Frame::Successes, 1.0)];
        for w in [0.0, 0.1, 0.33, 0.5, 0.9, 1.0] {
            let det = EnsembleFrameDetector::new(vec![member(&a), member(&b)], Some(vec![w, 1.0 - w])).unwrap();
            let scores = det.predict_proba("text").unwrap();
            for ((frame, sa), (_, sb)) in a.iter().zip(b.iter()) {
                let s = scores[frame];
                assert!(s >= sa.min(*sb) - 1e-12 && s <= sa.max(*sb) + 1e-12, "{} w={}", frame, w);
            }
        }
    }

    #[test]
    fn test_member_failure_propagates() {
        let det = EnsembleFrameDetector::new(vec![member(&[]), Box::new(FailingDetector)], None).unwrap();
        assert!(matches!(det.predict("text"), Err(DetectorError::ApiError { status: 503, .. })));
    }

    #[test]
    fn test_ensemble_threshold() {
        let mut det = EnsembleFrameDetector::new(vec![member(&[(Frame::Successes, 0.6)])], None).unwrap();
        assert_eq!(det.predict("t").unwrap().frames, vec![Frame::Successes]);
        det.set_threshold(0.65).unwrap();
        assert!(det.predict("t").unwrap().frames.is_empty());
    }
}
