// Frame Analyzer
// Runs segmentation and detection over an article and aggregates the windows

use super::aggregation::aggregate_windows;
use super::{DetectorError, FrameDetector};
use crate::models::{Article, ArticleAnalysis, SegmentResult};
use crate::services::lexical_analyzer::LexicalAnalyzer;
use crate::services::segmenter::Segmenter;
use crate::services::text_processor::TextNormalizer;
use std::time::Instant;
use tracing::{debug, info};

/// Article-level frame analysis.
///
/// Without a segmenter, or when segmentation finds no sentences, the whole article is a single
/// analysis unit. The normalizer, when set, cleans each unit before detection; the lexical
/// analyzer, when set, tags each unit's demographic groups.
pub struct FrameAnalyzer<D: FrameDetector> {
    detector: D,
    segmenter: Option<Segmenter>,
    normalizer: Option<TextNormalizer>,
    lexical: Option<LexicalAnalyzer>,
}

impl<D: FrameDetector> FrameAnalyzer<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            segmenter: None,
            normalizer: None,
            lexical: None,
        }
    }

    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_lexical_analyzer(mut self, lexical: LexicalAnalyzer) -> Self {
        self.lexical = Some(lexical);
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    fn prepare(&self, text: &str) -> String {
        match &self.normalizer {
            Some(n) => n.normalize(text),
            None => text.to_string(),
        }
    }

    /// Window texts, or the whole article when there is no segmenter or no window survived.
    fn analysis_units(&self, article: &Article) -> Vec<String> {
        let windows = self
            .segmenter
            .as_ref()
            .map(|s| s.segment_for_analysis(article).windows)
            .unwrap_or_default();

        if windows.is_empty() {
            return vec![self.prepare(&article.content)];
        }
        windows.into_iter().map(|w| self.prepare(&w.text)).collect()
    }

    pub fn analyze_article(&self, article: &Article) -> Result<ArticleAnalysis, DetectorError> {
        let start = Instant::now();
        let units = self.analysis_units(article);
        info!(
            article_id = %article.id,
            units = units.len(),
            detector = self.detector.name(),
            "analyzer.start"
        );

        let mut results = Vec::with_capacity(units.len());
        for (idx, text) in units.into_iter().enumerate() {
            let prediction = self.detector.predict(&text)?;
            let demographics = self
                .lexical
                .as_ref()
                .map(|l| l.demographics(&text).into_iter().collect())
                .unwrap_or_default();

            debug!(
                article_id = %article.id,
                window = idx,
                scores = ?prediction.scores,
                frames = ?prediction.frames,
                "analyzer.window"
            );

            results.push(SegmentResult {
                text,
                frames: prediction.frames,
                scores: prediction.scores,
                demographics,
            });
        }

        let aggregate = aggregate_windows(&results);
        let segments_analyzed = results.len();

        info!(
            article_id = %article.id,
            frames = ?aggregate.frames,
            segments = segments_analyzed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analyzer.done"
        );

        Ok(ArticleAnalysis {
            article_id: article.id.clone(),
            frames_detected: aggregate.frames,
            frame_scores: aggregate.scores,
            demographics: aggregate.demographics,
            frame_counts: aggregate.counts,
            segments_analyzed,
            detailed_results: if segments_analyzed > 1 { Some(results) } else { None },
        })
    }
}
