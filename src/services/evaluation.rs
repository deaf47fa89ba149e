// Agreement Evaluation
// Compares predicted frame sets with human coding, per frame and overall

use crate::models::Frame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
    tn: usize,
}

impl Confusion {
    fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, true) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }

    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    fn kappa(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let observed = (self.tp + self.tn) as f64 / n;
        let pred_pos = (self.tp + self.fp) as f64;
        let true_pos = (self.tp + self.fn_) as f64;
        let expected = (pred_pos * true_pos + (n - pred_pos) * (n - true_pos)) / (n * n);
        if (1.0 - expected).abs() < f64::EPSILON {
            0.0
        } else {
            (observed - expected) / (1.0 - expected)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameAgreement {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub kappa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementMetrics {
    pub articles: usize,
    pub per_frame: BTreeMap<Frame, FrameAgreement>,
    pub overall_precision: f64,
    pub overall_recall: f64,
    pub overall_f1: f64,
    /// Share of (article, frame) cells where prediction and coding agree.
    pub overall_accuracy: f64,
}

/// Pairwise agreement between predicted and coded frame sets, matched by position.
pub fn agreement_metrics(predicted: &[BTreeSet<Frame>], truth: &[BTreeSet<Frame>]) -> AgreementMetrics {
    if predicted.len() != truth.len() {
        warn!(
            predicted = predicted.len(),
            truth = truth.len(),
            "evaluation.length_mismatch; extra entries ignored"
        );
    }

    let mut per_frame: BTreeMap<Frame, Confusion> =
        Frame::ALL.iter().map(|f| (*f, Confusion::default())).collect();
    let mut overall = Confusion::default();
    let mut articles = 0;

    for (pred, actual) in predicted.iter().zip(truth) {
        articles += 1;
        for frame in Frame::ALL {
            let (p, a) = (pred.contains(&frame), actual.contains(&frame));
            if let Some(c) = per_frame.get_mut(&frame) {
                c.record(p, a);
            }
            overall.record(p, a);
        }
    }

    AgreementMetrics {
        articles,
        per_frame: per_frame
            .into_iter()
            .map(|(frame, c)| {
                (
                    frame,
                    FrameAgreement {
                        precision: c.precision(),
                        recall: c.recall(),
                        f1: c.f1(),
                        kappa: c.kappa(),
                    },
                )
            })
            .collect(),
        overall_precision: overall.precision(),
        overall_recall: overall.recall(),
        overall_f1: overall.f1(),
        overall_accuracy: overall.accuracy(),
    }
}
