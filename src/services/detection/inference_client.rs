// Inference Service
// Blocking HTTP backends for hosted zero-shot and text-classification models

use super::fine_tuned::LogitModel;
use super::zero_shot::{ZeroShotClassifier, ZeroShotOutput};
use super::DetectorError;
use crate::models::Frame;
use crate::services::config_store::{api_token_from_env, AppConfig};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Shared HTTP plumbing: one blocking client, base URL and optional bearer token.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl InferenceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DetectorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Base URL and timeout from config, token from the environment.
    pub fn from_config(config: &AppConfig) -> Result<Self, DetectorError> {
        Self::new(
            config.inference_base_url(),
            api_token_from_env(),
            Duration::from_secs(config.inference.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, DetectorError> {
        let start = Instant::now();

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DetectorError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data = response
            .json()
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;

        debug!(url, latency_ms = start.elapsed().as_millis() as u64, "inference.response");
        Ok(data)
    }
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

/// Zero-shot classification through a hosted NLI model at `<base>/<model>`.
pub struct HttpZeroShotClassifier {
    client: InferenceClient,
    model: String,
}

impl HttpZeroShotClassifier {
    pub fn new(client: InferenceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl ZeroShotClassifier for HttpZeroShotClassifier {
    fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        multi_label: bool,
    ) -> Result<ZeroShotOutput, DetectorError> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels,
                multi_label,
            },
        };
        let value: serde_json::Value = self.client.post_json(&self.client.endpoint(&self.model), &request)?;
        parse_zero_shot_response(value)
    }
}

/// Accepts `{labels, scores}` or a one-element list of it.
pub fn parse_zero_shot_response(value: serde_json::Value) -> Result<ZeroShotOutput, DetectorError> {
    let value = match value {
        serde_json::Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    };
    serde_json::from_value(value).map_err(|e| DetectorError::MalformedResponse(e.to_string()))
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    inputs: &'a str,
    raw_scores: bool,
    truncate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

/// Raw logits from a text-classification server's `/predict` route.
pub struct HttpLogitModel {
    client: InferenceClient,
    url: String,
    labels: Vec<Frame>,
}

impl HttpLogitModel {
    /// `labels` is the model's output order; `LABEL_<i>` answers index into it.
    pub fn new(client: InferenceClient, endpoint: &str, labels: Vec<Frame>) -> Self {
        let base = client.endpoint(endpoint);
        let url = if base.ends_with("/predict") {
            base
        } else {
            format!("{}/predict", base)
        };
        Self { client, url, labels }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LogitModel for HttpLogitModel {
    fn logits(&self, text: &str) -> Result<Vec<f64>, DetectorError> {
        let request = PredictRequest {
            inputs: text,
            raw_scores: true,
            truncate: true,
        };
        let value: serde_json::Value = self.client.post_json(&self.url, &request)?;
        let answers = parse_label_scores(value)?;
        order_logits(&answers, &self.labels)
    }
}

pub fn parse_label_scores(value: serde_json::Value) -> Result<Vec<LabelScore>, DetectorError> {
    let parsed: PredictResponse =
        serde_json::from_value(value).map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
    match parsed {
        PredictResponse::Flat(items) => Ok(items),
        PredictResponse::Nested(mut batches) => {
            if batches.len() != 1 {
                return Err(DetectorError::MalformedResponse(format!(
                    "expected one result set, got {}",
                    batches.len()
                )));
            }
            Ok(batches.remove(0))
        }
    }
}

/// Resolve a model label: a canonical frame name or `LABEL_<i>` into `labels`.
fn resolve_label(label: &str, labels: &[Frame]) -> Result<Frame, DetectorError> {
    if let Some(idx) = label.strip_prefix("LABEL_") {
        return idx
            .parse::<usize>()
            .ok()
            .and_then(|i| labels.get(i).copied())
            .ok_or_else(|| DetectorError::UnmappedLabel(label.to_string()));
    }
    label
        .parse::<Frame>()
        .map_err(|_| DetectorError::UnmappedLabel(label.to_string()))
}

/// Arrange answers into `labels` order; every configured label must be answered exactly once.
pub fn order_logits(answers: &[LabelScore], labels: &[Frame]) -> Result<Vec<f64>, DetectorError> {
    if answers.len() != labels.len() {
        return Err(DetectorError::OutputMismatch {
            expected: labels.len(),
            got: answers.len(),
        });
    }

    let mut logits: Vec<Option<f64>> = vec![None; labels.len()];
    for answer in answers {
        let frame = resolve_label(&answer.label, labels)?;
        let slot = labels
            .iter()
            .position(|f| *f == frame)
            .ok_or_else(|| DetectorError::UnmappedLabel(answer.label.clone()))?;
        if logits[slot].replace(answer.score).is_some() {
            return Err(DetectorError::MalformedResponse(format!(
                "label {} answered twice",
                answer.label
            )));
        }
    }

    // Lengths match and no slot was filled twice, so every slot is set.
    Ok(logits.into_iter().map(|l| l.unwrap_or(0.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> InferenceClient {
        InferenceClient::new("http://localhost:8080/", None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_joining() {
        let c = client();
        assert_eq!(c.base_url(), "http://localhost:8080");
        assert_eq!(c.endpoint("facebook/bart-large-mnli"), "http://localhost:8080/facebook/bart-large-mnli");
        assert_eq!(c.endpoint("https://other.host/m/"), "https://other.host/m");
    }

    #[test]
    fn test_logit_model_url() {
        let model = HttpLogitModel::new(client(), "http://tei:80", Frame::ALL.to_vec());
        assert_eq!(model.url(), "http://tei:80/predict");
        let model = HttpLogitModel::new(client(), "http://tei:80/predict", Frame::ALL.to_vec());
        assert_eq!(model.url(), "http://tei:80/predict");
    }

    #[test]
    fn test_zero_shot_request_shape() {
        let labels = ["a", "b"];
        let request = ZeroShotRequest {
            inputs: "text",
            parameters: ZeroShotParameters {
                candidate_labels: &labels,
                multi_label: true,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"inputs": "text", "parameters": {"candidate_labels": ["a", "b"], "multi_label": true}}));
    }

    #[test]
    fn test_parse_zero_shot_response() {
        let single = json!({"sequence": "s", "labels": ["x", "y"], "scores": [0.9, 0.1]});
        let out = parse_zero_shot_response(single).unwrap();
        assert_eq!(out.labels, vec!["x", "y"]);

        let listed = json!([{"labels": ["x"], "scores": [0.4]}]);
        assert_eq!(parse_zero_shot_response(listed).unwrap().scores, vec![0.4]);

        assert!(parse_zero_shot_response(json!({"error": "loading"})).is_err());
    }

    #[test]
    fn test_parse_and_order_logits() {
        let nested = json!([[
            {"label": "LABEL_2", "score": 1.5},
            {"label": "LABEL_0", "score": -0.5},
            {"label": "successes", "score": 0.25},
            {"label": "LABEL_1", "score": -3.0}
        ]]);
        let answers = parse_label_scores(nested).unwrap();
        let logits = order_logits(&answers, &Frame::ALL).unwrap();
        assert_eq!(logits, vec![-0.5, -3.0, 1.5, 0.25]);
    }

    #[test]
    fn test_order_logits_errors() {
        let answers = parse_label_scores(json!([{"label": "LABEL_9", "score": 1.0}])).unwrap();
        assert!(matches!(
            order_logits(&answers, &[Frame::Obstacles]),
            Err(DetectorError::UnmappedLabel(_))
        ));

        let answers = parse_label_scores(json!([{"label": "obstacles", "score": 1.0}])).unwrap();
        assert!(matches!(
            order_logits(&answers, &Frame::ALL),
            Err(DetectorError::OutputMismatch { expected: 4, got: 1 })
        ));

        let dup = parse_label_scores(json!([
            {"label": "obstacles", "score": 1.0},
            {"label": "LABEL_0", "score": 1.0}
        ]))
        .unwrap();
        assert!(order_logits(&dup, &[Frame::Obstacles, Frame::Successes]).is_err());
    }
}
