// Google Perspective API implementation.
//
// Perspective analyzes text for toxicity and is free but limited to ~1 QPS.
// It sits behind the ToxicityScorer trait as the fallback backend for hosts
// that can't run the ONNX model.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{ScoreError, ToxicityScorer};
use crate::output::truncate_chars;

const PERSPECTIVE_URL: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Perspective API toxicity scorer.
pub struct PerspectiveScorer {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveScorer {
    /// Create a new Perspective API scorer with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl ToxicityScorer for PerspectiveScorer {
    async fn score_text(&self, text: &str) -> Result<f64, ScoreError> {
        self.rate_limiter.acquire().await;

        let request = PerspectiveRequest {
            comment: Comment {
                text: text.to_string(),
            },
            requested_attributes: RequestedAttributes {
                toxicity: AttributeConfig {},
            },
        };

        let response = self
            .client
            .post(PERSPECTIVE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ScoreError::ModelUnavailable(format!("Perspective API: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            // Perspective rejects unsupported languages and empty comments with 400
            let body = response.text().await.unwrap_or_default();
            return Err(ScoreError::MalformedInput(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoreError::Backend(format!(
                "Perspective API returned {status}: {body}"
            )));
        }

        let result: PerspectiveResponse = response
            .json()
            .await
            .map_err(|e| ScoreError::Backend(format!("unparseable Perspective response: {e}")))?;

        let toxicity = extract_toxicity(&result)?;

        debug!(
            toxicity,
            text_preview = %truncate_chars(text, 50),
            "Perspective scored text"
        );

        Ok(toxicity)
    }
}

/// Pull the TOXICITY summary score out of the API response.
fn extract_toxicity(response: &PerspectiveResponse) -> Result<f64, ScoreError> {
    let score = response
        .attribute_scores
        .get("TOXICITY")
        .map(|score| score.summary_score.value)
        .ok_or_else(|| ScoreError::Backend("response has no TOXICITY score".to_string()))?;
    ScoreError::check_range(score)
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: RequestedAttributes,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RequestedAttributes {
    toxicity: AttributeConfig,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: std::collections::HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
