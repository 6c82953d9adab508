//! Keyword-to-image affinity scoring backed by the remote analysis service.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::remote::{call_with_timeout, RemotePolicy};

/// Per-keyword affinity returned by a scorer.
pub type AffinityScores = HashMap<String, f64>;

#[async_trait]
pub trait AffinityScorer: Send + Sync {
    async fn score(
        &self,
        image_url: &str,
        keywords: &[String],
    ) -> Result<AffinityScores, AffinityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AffinityError {
    #[error("affinity request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("affinity service returned HTTP {status}")]
    Status { status: u16 },
    #[error("malformed affinity response: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    image_url: &'a str,
    keywords: &'a [String],
}

/// The analysis service either answers with a bare score map or wraps it as
/// `{"scores": {...}}` alongside request metadata.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnalyzeResponse {
    Wrapped { scores: AffinityScores },
    Flat(AffinityScores),
}

impl AnalyzeResponse {
    fn into_scores(self) -> AffinityScores {
        match self {
            AnalyzeResponse::Wrapped { scores } | AnalyzeResponse::Flat(scores) => scores,
        }
    }
}

pub(crate) fn parse_scores(body: &[u8]) -> Result<AffinityScores, AffinityError> {
    serde_json::from_slice::<AnalyzeResponse>(body)
        .map(AnalyzeResponse::into_scores)
        .map_err(|err| AffinityError::Malformed(err.to_string()))
}

/// HTTP client for the `POST /analyze` endpoint.
#[derive(Debug, Clone)]
pub struct HttpAffinityScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAffinityScorer {
    /// `base_url` is the service root, e.g. `http://localhost:8000`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/analyze", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AffinityScorer for HttpAffinityScorer {
    async fn score(
        &self,
        image_url: &str,
        keywords: &[String],
    ) -> Result<AffinityScores, AffinityError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest {
                image_url,
                keywords,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AffinityError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        parse_scores(&body)
    }
}

/// Sum of affinity scores for the garment image, `0.0` when scoring fails.
pub(crate) async fn affinity_or_zero(
    scorer: &dyn AffinityScorer,
    policy: &RemotePolicy,
    image_url: &str,
    keywords: &[String],
) -> f64 {
    match call_with_timeout(policy.timeout, scorer.score(image_url, keywords)).await {
        Ok(scores) => scores.values().copied().filter(|value| value.is_finite()).sum(),
        Err(failure) => {
            warn!(image_url, error = %failure, "keyword affinity unavailable, scoring as zero");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_score_map() {
        let scores = parse_scores(br#"{"casual": 0.25, "elegant": 0.5}"#).expect("flat map");
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["elegant"], 0.5);
    }

    #[test]
    fn parses_wrapped_score_map() {
        let scores = parse_scores(br#"{"outfit_id": "abc", "scores": {"summer": 0.31}}"#)
            .expect("wrapped map");
        assert_eq!(scores.len(), 1);
        assert_eq!(scores["summer"], 0.31);
    }

    #[test]
    fn rejects_non_numeric_payloads() {
        match parse_scores(br#"{"casual": "high"}"#) {
            Err(AffinityError::Malformed(_)) => {}
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn endpoint_appends_analyze_path() {
        let scorer = HttpAffinityScorer::new(reqwest::Client::new(), "http://localhost:8000/");
        assert_eq!(scorer.endpoint(), "http://localhost:8000/analyze");
    }
}
