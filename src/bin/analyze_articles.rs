use anyhow::{anyhow, bail, Context, Result};
use leadframe_lib::init_logging;
use leadframe_lib::models::{Article, ArticleAnalysis, Frame};
use leadframe_lib::services::detection::{
    EnsembleFrameDetector, FineTunedFrameDetector, FrameDetector, FrameLabelTable, HttpLogitModel,
    HttpZeroShotClassifier, InferenceClient, LinearFrameModel, ZeroShotFrameDetector,
};
use leadframe_lib::services::{
    agreement_metrics, coding_records, filter_by_source, load_articles, AppConfig, ConfigStore, FrameAnalyzer, LexicalAnalyzer,
    Segmenter, TextNormalizer,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const USAGE: &str = "Usage:\n  analyze_articles <articles.json> [--config <dir>] [--detector zero-shot|fine-tuned|linear|ensemble] [--model <id>] [--threshold <t>] [--source <name>] [--no-segmenter] [--eval] [--out <json_path>]\n\nNotes:\n  - `--model` names the zero-shot model, the fine-tuned endpoint or the linear weight file, depending on `--detector`.\n  - Hosted inference reads its token from LEADFRAME_API_TOKEN (or HF_API_TOKEN).";

#[derive(Serialize)]
struct RunReport<'a> {
    run_id: String,
    generated_at: String,
    detector: &'a str,
    threshold: f64,
    results: &'a [ArticleAnalysis],
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn zero_shot(config: &AppConfig, client: &InferenceClient, model: Option<&str>) -> Box<dyn FrameDetector> {
    let model = model.unwrap_or(&config.detection.zero_shot_model);
    info!(model, "detector.zero_shot");
    let classifier = HttpZeroShotClassifier::new(client.clone(), model);
    let labels = FrameLabelTable::for_frames(&config.detection.frame_labels);
    Box::new(ZeroShotFrameDetector::new(classifier, labels).with_name(format!("zero-shot:{}", model)))
}

fn fine_tuned(config: &AppConfig, client: &InferenceClient, endpoint: &str) -> Result<Box<dyn FrameDetector>> {
    info!(endpoint, "detector.fine_tuned");
    let model = HttpLogitModel::new(client.clone(), endpoint, config.detection.frame_labels.clone());
    Ok(Box::new(FineTunedFrameDetector::new(model, config.detection.frame_labels.clone())?))
}

fn linear(config: &AppConfig, path: &Path) -> Result<Box<dyn FrameDetector>> {
    let model = LinearFrameModel::load(path)?;
    let detector = FineTunedFrameDetector::new(model, config.detection.frame_labels.clone())?.with_name("linear");
    Ok(Box::new(detector))
}

fn build_detector(kind: &str, model: Option<&str>, config: &AppConfig) -> Result<Box<dyn FrameDetector>> {
    let client = InferenceClient::from_config(config).context("failed to build inference client")?;
    let det = &config.detection;

    let detector: Box<dyn FrameDetector> = match kind {
        "zero-shot" => zero_shot(config, &client, model),
        "fine-tuned" => {
            let endpoint = model
                .map(str::to_string)
                .or_else(|| det.fine_tuned_endpoint.clone())
                .ok_or_else(|| anyhow!("fine-tuned detector needs --model or detection.fineTunedEndpoint"))?;
            fine_tuned(config, &client, &endpoint)?
        }
        "linear" => {
            let path = model
                .map(PathBuf::from)
                .or_else(|| det.linear_model_path.clone())
                .ok_or_else(|| anyhow!("linear detector needs --model or detection.linearModelPath"))?;
            linear(config, &path)?
        }
        "ensemble" => {
            let mut members = vec![zero_shot(config, &client, model)];
            if let Some(endpoint) = &det.fine_tuned_endpoint {
                members.push(fine_tuned(config, &client, endpoint)?);
            }
            if let Some(path) = &det.linear_model_path {
                members.push(linear(config, path)?);
            }
            info!(members = members.len(), "detector.ensemble");
            Box::new(EnsembleFrameDetector::new(members, det.ensemble_weights.clone())?)
        }
        other => bail!("unknown detector '{}'\n\n{}", other, USAGE),
    };

    Ok(detector)
}

fn print_summary(analysis: &ArticleAnalysis) {
    let frames: Vec<&str> = analysis.frames_detected.iter().map(Frame::as_str).collect();
    let scores: Vec<String> = analysis
        .frame_scores
        .iter()
        .map(|(f, s)| format!("{}={:.2}", f, s))
        .collect();
    println!(
        "[{}] windows={} frames=[{}] scores: {}",
        analysis.article_id,
        analysis.segments_analyzed,
        frames.join(", "),
        scores.join(" ")
    );
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let articles_path = PathBuf::from(&args[1]);
    let config_dir = parse_arg_value(&args, "--config")
        .map(PathBuf::from)
        .or_else(ConfigStore::default_config_dir)
        .ok_or_else(|| anyhow!("no config directory available; pass --config"))?;
    let detector_kind = parse_arg_value(&args, "--detector").unwrap_or_else(|| "zero-shot".to_string());
    let model = parse_arg_value(&args, "--model");
    let threshold_arg = parse_arg_value(&args, "--threshold");
    let use_segmenter = !has_flag(&args, "--no-segmenter");
    let evaluate = has_flag(&args, "--eval");
    let out_path = parse_arg_value(&args, "--out");
    let source = parse_arg_value(&args, "--source");

    let config = ConfigStore::new(config_dir.clone())
        .load()
        .with_context(|| format!("failed to load config from {}", config_dir.display()))?;

    let loaded = load_articles(&articles_path)?;
    let articles: Vec<Article> = match &source {
        Some(name) => {
            let kept: Vec<Article> = filter_by_source(&loaded, name).into_iter().cloned().collect();
            info!(source = %name, kept = kept.len(), total = loaded.len(), "articles.filtered");
            if kept.is_empty() {
                bail!("no article has source '{}'", name);
            }
            kept
        }
        None => loaded,
    };

    let mut detector = build_detector(&detector_kind, model.as_deref(), &config)?;
    let threshold = match threshold_arg {
        Some(t) => t.parse::<f64>().with_context(|| format!("invalid --threshold '{}'", t))?,
        None => config.detection.threshold,
    };
    detector.set_threshold(threshold)?;

    let seg = &config.segmentation;
    let mut analyzer = FrameAnalyzer::new(detector)
        .with_normalizer(TextNormalizer::new())
        .with_lexical_analyzer(LexicalAnalyzer::new());
    if use_segmenter {
        let segmenter = Segmenter::new(seg.window_size, seg.overlap)?
            .with_leadership_radius(seg.leadership_context_radius);
        analyzer = analyzer.with_segmenter(segmenter);
    }

    println!("Articles: {} ({})", articles.len(), articles_path.display());
    println!("Detector: {} (threshold {:.2})", analyzer.detector().name(), threshold);
    println!("Segmenter: {}", if use_segmenter { "on" } else { "off" });
    println!();

    let mut results = Vec::with_capacity(articles.len());
    for article in &articles {
        let analysis = analyzer
            .analyze_article(article)
            .with_context(|| format!("analysis failed for article {}", article.id))?;
        print_summary(&analysis);
        results.push(analysis);
    }

    if evaluate {
        let mut predicted = Vec::new();
        let mut truth = Vec::new();
        for (article, analysis) in articles.iter().zip(&results) {
            if article.human_coding.is_none() {
                continue;
            }
            truth.push(article.coded_frames()?);
            predicted.push(analysis.frames_detected.iter().copied().collect::<BTreeSet<Frame>>());
        }

        if truth.is_empty() {
            warn!("--eval requested but no article carries human coding");
        } else {
            let metrics = agreement_metrics(&predicted, &truth);
            let mut coded_mentions: BTreeMap<String, i64> = BTreeMap::new();
            for record in coding_records(&articles) {
                *coded_mentions.entry(record.frame_type).or_default() += record.count;
            }
            println!();
            println!("Agreement over {} coded articles:", metrics.articles);
            for (frame, count) in &coded_mentions {
                println!("  coded mentions {:<20} {}", frame, count);
            }
            for (frame, m) in &metrics.per_frame {
                println!(
                    "  {:<20} P={:.3} R={:.3} F1={:.3} kappa={:.3}",
                    frame.as_str(),
                    m.precision,
                    m.recall,
                    m.f1,
                    m.kappa
                );
            }
            println!(
                "  {:<20} P={:.3} R={:.3} F1={:.3} accuracy={:.3}",
                "overall", metrics.overall_precision, metrics.overall_recall, metrics.overall_f1, metrics.overall_accuracy
            );
        }
    }

    if let Some(out_path) = out_path {
        let report = RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            detector: analyzer.detector().name(),
            threshold,
            results: &results,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&out_path, json).with_context(|| format!("failed to write {}", out_path))?;
        println!();
        println!("Report written: {}", out_path);
    }

    info!(articles = results.len(), "run.finished");
    Ok(())
}
