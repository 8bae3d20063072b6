// Local ONNX toxicity scorer.
//
// Runs a Detoxify-style multi-label classifier (unbiased-toxic-roberta) on the
// local CPU. The first output logit is the overall "toxicity" label; sigmoid
// turns it into the probability the decision engine compares against the
// threshold. The other labels (insult, threat, ...) are not used for the
// verdict.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::download::{TOXICITY_MODEL_FILE, TOXICITY_TOKENIZER_FILE};
use super::traits::{ScoreError, ToxicityScorer};
use crate::output::truncate_chars;

/// Number of labels the model emits per input, in this order:
/// toxicity, severe_toxicity, obscene, identity_attack, insult, threat, sexual_explicit
const LABEL_COUNT: usize = 7;

/// Index of the overall toxicity label in the output row.
const TOXICITY_LABEL: usize = 0;

/// RoBERTa's positional limit. Longer inputs are cut by the tokenizer.
const MAX_TOKENS: usize = 512;

/// RoBERTa pad token id.
const PAD_TOKEN_ID: i64 = 1;

/// Local ONNX-based toxicity scorer.
pub struct OnnxToxicityScorer {
    // Session::run takes &mut self, and spawn_blocking needs 'static.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxToxicityScorer {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Call `download::download_model()` first if the files aren't there.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(TOXICITY_MODEL_FILE);
        let tokenizer_path = model_dir.join(TOXICITY_TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `gatekeep download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `gatekeep download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;

        debug!("Loaded ONNX toxicity model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl ToxicityScorer for OnnxToxicityScorer {
    /// Tokenize, run one forward pass, and sigmoid the toxicity logit.
    ///
    /// The CPU-bound work is offloaded to spawn_blocking so it doesn't stall
    /// the dispatcher.
    async fn score_text(&self, text: &str) -> Result<f64, ScoreError> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || -> Result<f64, ScoreError> {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| ScoreError::MalformedInput(e.to_string()))?;

            let (input_ids, attention_mask) =
                to_model_inputs(encoding.get_ids(), encoding.get_attention_mask());
            let shape = [1_i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .map_err(|e| ScoreError::MalformedInput(e.to_string()))?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .map_err(|e| ScoreError::MalformedInput(e.to_string()))?;

            let logits = {
                let mut session = session.lock().map_err(|e| {
                    ScoreError::ModelUnavailable(format!("session lock poisoned: {e}"))
                })?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .map_err(|e| ScoreError::Inference(e.to_string()))?;

                // Output shape: [1, LABEL_COUNT], raw logits
                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| ScoreError::Inference(e.to_string()))?;

                data.to_vec()
            };

            let toxicity = toxicity_from_logits(&logits)?;

            debug!(
                toxicity,
                text_preview = %truncate_chars(&text, 50),
                "ONNX scored text"
            );

            Ok(toxicity)
        })
        .await
        .map_err(|e| ScoreError::Inference(format!("inference task failed: {e}")))?
    }
}

/// Widen token ids and mask to the i64 the model expects. An empty encoding
/// becomes a single pad token so the tensor shape stays valid.
fn to_model_inputs(ids: &[u32], mask: &[u32]) -> (Vec<i64>, Vec<i64>) {
    if ids.is_empty() {
        return (vec![PAD_TOKEN_ID], vec![0]);
    }
    (
        ids.iter().map(|&id| id as i64).collect(),
        mask.iter().map(|&m| m as i64).collect(),
    )
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Pull the toxicity probability out of one output row.
fn toxicity_from_logits(logits: &[f32]) -> Result<f64, ScoreError> {
    if logits.len() < LABEL_COUNT {
        return Err(ScoreError::Inference(format!(
            "expected {LABEL_COUNT} logits, model returned {}",
            logits.len()
        )));
    }
    ScoreError::check_range(sigmoid(logits[TOXICITY_LABEL] as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_zero() {
        let result = sigmoid(0.0);
        assert!((result - 0.5).abs() < 1e-10, "sigmoid(0) should be 0.5");
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [0.5, 1.0, 2.0, 5.0] {
            let sum = sigmoid(x) + sigmoid(-x);
            assert!(
                (sum - 1.0).abs() < 1e-10,
                "sigmoid({x}) + sigmoid(-{x}) should equal 1.0"
            );
        }
    }

    #[test]
    fn test_toxicity_from_logits_uses_first_label() {
        let logits = [4.0_f32, -3.0, -3.0, -3.0, -3.0, -3.0, -3.0];
        let toxicity = toxicity_from_logits(&logits).unwrap();
        assert!(toxicity > 0.98, "got {toxicity}");
    }

    #[test]
    fn test_toxicity_from_logits_short_row_is_error() {
        let err = toxicity_from_logits(&[0.3]).unwrap_err();
        assert!(matches!(err, ScoreError::Inference(_)));
    }

    #[test]
    fn test_empty_encoding_gets_pad_token() {
        let (ids, mask) = to_model_inputs(&[], &[]);
        assert_eq!(ids, vec![PAD_TOKEN_ID]);
        assert_eq!(mask, vec![0]);
    }

    #[test]
    fn test_model_inputs_widened() {
        let (ids, mask) = to_model_inputs(&[0, 42, 2], &[1, 1, 1]);
        assert_eq!(ids, vec![0, 42, 2]);
        assert_eq!(mask, vec![1, 1, 1]);
    }

    #[test]
    fn test_load_missing_dir_fails() {
        let dir = std::env::temp_dir().join("gatekeep-test-no-model");
        assert!(OnnxToxicityScorer::load(&dir).is_err());
    }
}
