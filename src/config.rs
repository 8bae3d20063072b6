use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::moderation::policy::{
    ModerationPolicy, DEFAULT_MAX_INPUT_CHARS, DEFAULT_TOXICITY_THRESHOLD,
};
use crate::spam::patterns::default_patterns;

/// Which toxicity scoring backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerBackend {
    /// Local ONNX model (default) — no API key needed, no rate limits
    Onnx,
    /// Google Perspective API — requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Chat that receives enforcement failure alerts. `ADMIN_ID=0` or unset
    /// disables alerts.
    pub admin_chat_id: Option<i64>,
    pub toxicity_threshold: f64,
    pub max_input_chars: usize,
    /// One regex per line; replaces the built-in patterns when set.
    pub spam_patterns_file: Option<PathBuf>,
    /// Which toxicity scorer to use (default: Onnx)
    pub scorer_backend: ScorerBackend,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    pub perspective_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. `load()` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let scorer_backend = match var("GATEKEEP_SCORER").as_deref().map(str::trim) {
            Some("perspective") => ScorerBackend::Perspective,
            None | Some("onnx") => ScorerBackend::Onnx,
            Some(other) => anyhow::bail!(
                "GATEKEEP_SCORER must be `onnx` or `perspective`, got `{other}`"
            ),
        };

        let admin_chat_id = match var("ADMIN_ID") {
            Some(raw) => {
                let id: i64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("ADMIN_ID is not a chat id: {raw}"))?;
                (id != 0).then_some(id)
            }
            None => None,
        };

        let toxicity_threshold: f64 = match var("TOXICITY_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("TOXICITY_THRESHOLD is not a number: {raw}"))?,
            None => DEFAULT_TOXICITY_THRESHOLD,
        };

        let max_input_chars: usize = match var("MAX_INPUT_CHARS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_INPUT_CHARS is not a positive integer: {raw}"))?,
            None => DEFAULT_MAX_INPUT_CHARS,
        };

        let model_dir = var("GATEKEEP_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::toxicity::download::default_model_dir);

        Ok(Self {
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            admin_chat_id,
            toxicity_threshold,
            max_input_chars,
            spam_patterns_file: var("SPAM_PATTERNS_FILE").map(PathBuf::from),
            scorer_backend,
            model_dir,
            perspective_api_key: var("PERSPECTIVE_API_KEY").unwrap_or_default(),
        })
    }

    /// Build and validate the moderation policy this config describes.
    pub fn policy(&self) -> Result<ModerationPolicy> {
        let spam_patterns = match &self.spam_patterns_file {
            Some(path) => {
                let contents = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read spam patterns from {}", path.display())
                })?;
                parse_patterns(&contents)
            }
            None => default_patterns(),
        };

        let policy = ModerationPolicy {
            toxicity_threshold: self.toxicity_threshold,
            spam_patterns,
            max_input_chars: self.max_input_chars,
        };
        policy.validate().context("Invalid moderation policy")?;
        Ok(policy)
    }

    /// Check that the bot token is configured.
    /// Call this before starting the Telegram dispatcher.
    pub fn require_telegram(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            anyhow::bail!(
                "TELEGRAM_BOT_TOKEN not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that the Perspective API key is configured.
    pub fn require_perspective(&self) -> Result<()> {
        if self.perspective_api_key.is_empty() {
            anyhow::bail!(
                "PERSPECTIVE_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Validate that the chosen scorer backend has what it needs.
    /// For ONNX: model files must exist (or user should run download-model).
    /// For Perspective: API key must be set.
    pub fn require_scorer(&self) -> Result<()> {
        match self.scorer_backend {
            ScorerBackend::Onnx => {
                if !crate::toxicity::download::model_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "ONNX model files not found in {}\n\
                         Run `gatekeep download-model` to download them.\n\
                         Or set GATEKEEP_SCORER=perspective to use the Perspective API instead.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
            ScorerBackend::Perspective => self.require_perspective(),
        }
    }
}

/// Default tracing filter when RUST_LOG is unset, from LOG_LEVEL.
///
/// Accepts the usual level names in any case, plus `warning` and
/// `critical` as aliases for `warn` and `error`.
pub fn log_filter(log_level: Option<&str>) -> String {
    let level = match log_level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") | Some("critical") | Some("fatal") => "error",
        _ => "info",
    };
    format!("gatekeep={level}")
}

/// One pattern per line. Blank lines and lines starting with `#` are skipped;
/// everything else is taken verbatim (minus a trailing `\r`).
pub fn parse_patterns(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(str::to_string)
        .collect()
}
