// Decision engine — combines extractor signals into a verdict.
//
// Stateless and reentrant: every call reads the policy, the scorer and the
// matcher, and shares nothing mutable with other calls. Every failure below
// this boundary resolves to "no violation" (fail-open); what was absorbed is
// handed back as a Degradation so the caller can log it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::policy::{ModerationPolicy, PolicyError};
use super::verdict::AnalysisResult;
use crate::output::prefix_chars;
use crate::spam::SpamMatcher;
use crate::toxicity::traits::{ScoreError, ToxicityScorer};

/// A failure the engine absorbed instead of raising.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Degradation {
    /// The scorer failed; toxicity was taken as 0.0. Spam matching still ran.
    #[error("toxicity scoring failed, treated as non-toxic: {0}")]
    Extraction(#[source] ScoreError),
    /// Evaluation itself blew up; the whole result is neutral.
    #[error("evaluation aborted, treated as clean: {0}")]
    Engine(String),
}

impl Degradation {
    /// Log at a level matching how much signal was lost.
    pub fn log(&self) {
        match self {
            Degradation::Extraction(_) => warn!(error = %self, "Moderation degraded"),
            Degradation::Engine(_) => error!(error = %self, "Moderation degraded"),
        }
    }
}

/// The engine's answer: the verdict plus whatever failure was absorbed.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: AnalysisResult,
    pub degradation: Option<Degradation>,
}

impl Evaluation {
    fn clean(result: AnalysisResult) -> Self {
        Self {
            result,
            degradation: None,
        }
    }
}

/// Judge `text` under `policy`.
///
/// Whitespace-only text short-circuits to the neutral result without
/// touching either extractor. Otherwise the scorer gets the first
/// `max_input_chars` characters and the matcher gets the full text; the two
/// run concurrently and the verdict waits for both.
pub async fn evaluate(
    text: &str,
    policy: &ModerationPolicy,
    scorer: &dyn ToxicityScorer,
    matcher: &dyn SpamMatcher,
) -> Evaluation {
    if text.trim().is_empty() {
        return Evaluation::clean(AnalysisResult::neutral());
    }

    match AssertUnwindSafe(extract_and_combine(text, policy, scorer, matcher))
        .catch_unwind()
        .await
    {
        Ok(evaluation) => evaluation,
        Err(panic) => Evaluation {
            result: AnalysisResult::neutral(),
            degradation: Some(Degradation::Engine(panic_message(panic.as_ref()))),
        },
    }
}

async fn extract_and_combine(
    text: &str,
    policy: &ModerationPolicy,
    scorer: &dyn ToxicityScorer,
    matcher: &dyn SpamMatcher,
) -> Evaluation {
    let scored = prefix_chars(text, policy.max_input_chars);

    let (score, is_spam) = futures::join!(scorer.score_text(scored), async {
        matcher.is_spam(text)
    });

    let (toxicity, degradation) = match score.and_then(ScoreError::check_range) {
        Ok(toxicity) => (toxicity, None),
        Err(e) => (0.0, Some(Degradation::Extraction(e))),
    };

    let result = AnalysisResult::from_signals(toxicity, is_spam, policy.toxicity_threshold);

    debug!(
        toxicity = result.toxicity(),
        is_spam = result.is_spam(),
        violations = %result.violation_list(),
        "Evaluated message"
    );

    Evaluation {
        result,
        degradation,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// A policy bundled with its extractors, built once at startup and shared
/// by every handler.
#[derive(Clone)]
pub struct Moderator {
    policy: Arc<ModerationPolicy>,
    scorer: Arc<dyn ToxicityScorer>,
    matcher: Arc<dyn SpamMatcher>,
}

impl Moderator {
    /// Validate the policy and compile its spam patterns.
    pub fn new(
        policy: ModerationPolicy,
        scorer: Arc<dyn ToxicityScorer>,
    ) -> Result<Self, PolicyError> {
        let matcher = policy.build_matcher()?;
        Ok(Self {
            policy: Arc::new(policy),
            scorer,
            matcher: Arc::new(matcher),
        })
    }

    /// Use a caller-supplied matcher instead of the policy's patterns.
    /// The policy is still validated.
    pub fn with_matcher(
        policy: ModerationPolicy,
        scorer: Arc<dyn ToxicityScorer>,
        matcher: Arc<dyn SpamMatcher>,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self {
            policy: Arc::new(policy),
            scorer,
            matcher,
        })
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    /// Evaluate and return the verdict together with any absorbed failure.
    pub async fn evaluate(&self, text: &str) -> Evaluation {
        evaluate(text, &self.policy, self.scorer.as_ref(), self.matcher.as_ref()).await
    }

    /// Evaluate, log any absorbed failure, and return only the verdict.
    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        let evaluation = self.evaluate(text).await;
        if let Some(degradation) = &evaluation.degradation {
            degradation.log();
        }
        evaluation.result
    }
}
