// LeadFrame Core Services

pub mod text_processor;
pub mod lexicon;
pub mod segmenter;
pub mod lexical_analyzer;
pub mod feature_extraction;
pub mod config_store;
pub mod data_loader;
pub mod evaluation;
pub mod retention;
pub mod detection;

pub use text_processor::{TextNormalizer, word_count};
pub use segmenter::{SegmentError, Segmenter};
pub use lexical_analyzer::LexicalAnalyzer;
pub use feature_extraction::{FeatureError, FeatureExtractor, TrainingMatrix};
pub use config_store::{AppConfig, ConfigError, ConfigStore};
pub use data_loader::{coding_records, filter_by_source, load_articles, CodingRecord, DataError};
pub use evaluation::{agreement_metrics, AgreementMetrics, FrameAgreement};

// Re-export detection types
pub use detection::{
    DetectorError,
    EnsembleFrameDetector,
    FineTunedFrameDetector,
    FrameAnalyzer,
    FrameDetector,
    FrameLabelTable,
    HttpLogitModel,
    HttpZeroShotClassifier,
    InferenceClient,
    LinearFrameModel,
    ZeroShotFrameDetector,
};
