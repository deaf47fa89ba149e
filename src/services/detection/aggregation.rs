// Aggregation Logic
// Folds per-window detection results into one article-level verdict

use crate::models::{DemographicGroup, Frame, FrameCounts, FrameScores, SegmentResult};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowAggregate {
    /// Union of every window's detected frames.
    pub frames: Vec<Frame>,
    /// Mean per frame over the windows that reported it; 0.0 when none did.
    pub scores: FrameScores,
    pub demographics: Vec<DemographicGroup>,
    pub counts: FrameCounts,
}

/// A frame detected in any window marks the whole article. Scores average only over
/// windows that reported the frame, so an absent entry does not pull the mean down.
pub fn aggregate_windows(results: &[SegmentResult]) -> WindowAggregate {
    let mut reported: BTreeMap<Frame, Vec<f64>> = Frame::ALL.iter().map(|f| (*f, Vec::new())).collect();
    let mut counts = FrameCounts::default();
    let mut frames = BTreeSet::new();
    let mut demographics = BTreeSet::new();

    for result in results {
        for frame in &result.frames {
            frames.insert(*frame);
            *counts.frames.entry(*frame).or_insert(0) += 1;
        }
        for group in &result.demographics {
            demographics.insert(*group);
            *counts.demographics.entry(*group).or_insert(0) += 1;
        }
        for (frame, score) in &result.scores {
            reported.entry(*frame).or_default().push(*score);
        }
    }

    let scores = reported
        .into_iter()
        .map(|(frame, values)| {
            if values.is_empty() {
                if !results.is_empty() {
                    warn!(frame = %frame, windows = results.len(), "aggregation.frame_unreported");
                }
                (frame, 0.0)
            } else {
                (frame, values.iter().sum::<f64>() / values.len() as f64)
            }
        })
        .collect();

    WindowAggregate {
        frames: frames.into_iter().collect(),
        scores,
        demographics: demographics.into_iter().collect(),
        counts,
    }
}
