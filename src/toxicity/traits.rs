// Toxicity scorer trait — the swap-ready abstraction.
//
// The default implementation uses a local ONNX model. Google's Perspective
// API is available as a fallback. Scorers report failure as a ScoreError
// value; the decision engine decides what a failure means for the verdict.

use async_trait::async_trait;
use thiserror::Error;

/// Why a scorer could not produce a toxicity score.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// The model or remote service can't be reached or wasn't loaded.
    #[error("toxicity model unavailable: {0}")]
    ModelUnavailable(String),
    /// The text couldn't be turned into model input (tokenization etc).
    #[error("malformed scorer input: {0}")]
    MalformedInput(String),
    /// Inference ran but failed.
    #[error("inference failed: {0}")]
    Inference(String),
    /// A remote backend answered with something we can't use.
    #[error("scoring backend error: {0}")]
    Backend(String),
    /// The scorer produced a value outside [0, 1] (or NaN).
    #[error("toxicity score out of range: {0}")]
    OutOfRange(f64),
}

impl ScoreError {
    /// Check that a raw score is a probability, passing it through if so.
    pub fn check_range(score: f64) -> Result<f64, ScoreError> {
        if (0.0..=1.0).contains(&score) {
            Ok(score)
        } else {
            Err(ScoreError::OutOfRange(score))
        }
    }
}

/// Trait for scoring text toxicity. Implementations must be async because
/// most providers either call an HTTP API or offload inference to a
/// blocking thread.
///
/// Callers are expected to bound the input length themselves; the
/// decision engine hands over at most `max_input_chars` characters.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Score a single text. Returns a probability in [0, 1].
    async fn score_text(&self, text: &str) -> Result<f64, ScoreError>;
}

/// Scorer that always reports the model as unavailable.
///
/// Used by `check` when no backend is configured, so pattern checks still
/// run while the toxicity signal degrades to 0.0.
pub struct UnavailableScorer;

#[async_trait]
impl ToxicityScorer for UnavailableScorer {
    async fn score_text(&self, _text: &str) -> Result<f64, ScoreError> {
        Err(ScoreError::ModelUnavailable(
            "no toxicity backend configured".to_string(),
        ))
    }
}
