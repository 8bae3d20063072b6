// Moderation policy — the knobs that turn signals into violations.

use thiserror::Error;

use crate::spam::patterns::{default_patterns, PatternError, PatternMatcher};

/// Default toxicity threshold. A score must be strictly above it.
pub const DEFAULT_TOXICITY_THRESHOLD: f64 = 0.85;

/// Default number of characters handed to the toxicity scorer.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 1000;

/// A policy that can't be used.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("toxicity threshold must be within [0.0, 1.0], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("max input length must be at least one character")]
    ZeroInputLength,
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
}

/// How the decision engine judges a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationPolicy {
    /// A `Toxicity` violation needs `score > toxicity_threshold`.
    pub toxicity_threshold: f64,
    /// Ordered regular expressions; any match flags spam.
    pub spam_patterns: Vec<String>,
    /// The scorer sees at most this many characters of the message.
    /// Spam patterns always see the whole text.
    pub max_input_chars: usize,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            toxicity_threshold: DEFAULT_TOXICITY_THRESHOLD,
            spam_patterns: default_patterns(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

impl ModerationPolicy {
    /// Default policy with a different threshold.
    pub fn with_threshold(toxicity_threshold: f64) -> Self {
        Self {
            toxicity_threshold,
            ..Self::default()
        }
    }

    /// Check every invariant. Patterns are compiled here too, so a bad
    /// pattern is caught before the bot starts.
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.check_limits()?;
        PatternMatcher::new(&self.spam_patterns)?;
        Ok(())
    }

    /// Validate and build the matcher for this policy's patterns.
    pub fn build_matcher(&self) -> Result<PatternMatcher, PolicyError> {
        self.check_limits()?;
        Ok(PatternMatcher::new(&self.spam_patterns)?)
    }

    fn check_limits(&self) -> Result<(), PolicyError> {
        // NaN fails contains(), so it's rejected here as well
        if !(0.0..=1.0).contains(&self.toxicity_threshold) {
            return Err(PolicyError::ThresholdOutOfRange(self.toxicity_threshold));
        }
        if self.max_input_chars == 0 {
            return Err(PolicyError::ZeroInputLength);
        }
        Ok(())
    }
}
