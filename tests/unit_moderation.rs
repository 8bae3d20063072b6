// Unit tests for the moderation decision engine.
//
// Uses counting fakes for both extractors so the tests can check not just
// the verdict but which extractors were called and with what text.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gatekeep::moderation::{
    evaluate, AnalysisResult, Degradation, ModerationPolicy, Moderator, ViolationKind,
};
use gatekeep::spam::patterns::PatternMatcher;
use gatekeep::spam::SpamMatcher;
use gatekeep::toxicity::traits::{ScoreError, ToxicityScorer};

// ============================================================
// Fakes
// ============================================================

/// Returns a fixed score (or error) and records every text it was handed.
struct FakeScorer {
    outcome: Result<f64, ScoreError>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeScorer {
    fn returning(score: f64) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(score),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: ScoreError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_seen(&self) -> String {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ToxicityScorer for FakeScorer {
    async fn score_text(&self, text: &str) -> Result<f64, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_string());
        self.outcome.clone()
    }
}

/// Wraps the real pattern matcher and counts calls.
struct CountingMatcher {
    inner: PatternMatcher,
    calls: AtomicUsize,
    seen_len: AtomicUsize,
}

impl CountingMatcher {
    fn with_defaults() -> Arc<Self> {
        Arc::new(Self {
            inner: ModerationPolicy::default().build_matcher().unwrap(),
            calls: AtomicUsize::new(0),
            seen_len: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpamMatcher for CountingMatcher {
    fn is_spam(&self, text: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_len.store(text.chars().count(), Ordering::SeqCst);
        self.inner.is_spam(text)
    }
}

fn moderator(scorer: Arc<FakeScorer>, matcher: Arc<CountingMatcher>) -> Moderator {
    Moderator::with_matcher(ModerationPolicy::default(), scorer, matcher).unwrap()
}

// ============================================================
// Whitespace short-circuit
// ============================================================

#[tokio::test]
async fn blank_text_skips_both_extractors() {
    let scorer = FakeScorer::returning(0.99);
    let matcher = CountingMatcher::with_defaults();
    let m = moderator(scorer.clone(), matcher.clone());

    for text in ["", "   ", "\n\t  \r\n", "\u{3000}"] {
        let evaluation = m.evaluate(text).await;
        assert_eq!(evaluation.result, AnalysisResult::neutral(), "{text:?}");
        assert!(evaluation.degradation.is_none());
    }

    assert_eq!(scorer.calls(), 0);
    assert_eq!(matcher.calls(), 0);
}

#[tokio::test]
async fn non_blank_text_calls_each_extractor_once() {
    let scorer = FakeScorer::returning(0.2);
    let matcher = CountingMatcher::with_defaults();
    let m = moderator(scorer.clone(), matcher.clone());

    m.evaluate("  hello  ").await;

    assert_eq!(scorer.calls(), 1);
    assert_eq!(matcher.calls(), 1);
}

// ============================================================
// Threshold boundary (strict >)
// ============================================================

#[tokio::test]
async fn score_equal_to_threshold_is_not_a_violation() {
    let m = moderator(FakeScorer::returning(0.85), CountingMatcher::with_defaults());
    let result = m.analyze("borderline").await;
    assert_eq!(result.toxicity(), 0.85);
    assert!(result.violations().is_empty());
}

#[tokio::test]
async fn score_just_above_threshold_is_a_violation() {
    let m = moderator(FakeScorer::returning(0.8501), CountingMatcher::with_defaults());
    let result = m.analyze("borderline").await;
    assert_eq!(result.violations(), &[ViolationKind::Toxicity]);
}

#[tokio::test]
async fn threshold_one_never_flags_toxicity() {
    let policy = ModerationPolicy::with_threshold(1.0);
    let matcher = policy.build_matcher().unwrap();
    let scorer = FakeScorer::returning(1.0);
    let evaluation = evaluate("anything", &policy, scorer.as_ref(), &matcher).await;
    assert!(!evaluation.result.is_violation());
}

#[tokio::test]
async fn threshold_zero_flags_any_positive_score() {
    let policy = ModerationPolicy::with_threshold(0.0);
    let matcher = policy.build_matcher().unwrap();

    let low = FakeScorer::returning(0.001);
    let evaluation = evaluate("anything", &policy, low.as_ref(), &matcher).await;
    assert_eq!(evaluation.result.violations(), &[ViolationKind::Toxicity]);

    let zero = FakeScorer::returning(0.0);
    let evaluation = evaluate("anything", &policy, zero.as_ref(), &matcher).await;
    assert!(!evaluation.result.is_violation());
}

// ============================================================
// Spam and ordering
// ============================================================

#[tokio::test]
async fn spam_flags_regardless_of_score() {
    for score in [0.0, 0.5, 0.85] {
        let m = moderator(FakeScorer::returning(score), CountingMatcher::with_defaults());
        let result = m.analyze("limited offer https://deals.example").await;
        assert!(result.is_spam());
        assert_eq!(result.violations(), &[ViolationKind::Spam], "score {score}");
    }
}

#[tokio::test]
async fn both_violations_are_ordered_toxicity_then_spam() {
    let m = moderator(FakeScorer::returning(0.97), CountingMatcher::with_defaults());
    let result = m.analyze("you idiot, click http://bad.example").await;
    assert_eq!(
        result.violations(),
        &[ViolationKind::Toxicity, ViolationKind::Spam]
    );
}

// ============================================================
// Idempotence
// ============================================================

#[tokio::test]
async fn evaluating_twice_gives_identical_results() {
    let m = moderator(FakeScorer::returning(0.91), CountingMatcher::with_defaults());
    let text = "you are worthless, call 5551234567890";
    let first = m.evaluate(text).await;
    let second = m.evaluate(text).await;
    assert_eq!(first, second);
}

// ============================================================
// Fail-open
// ============================================================

#[tokio::test]
async fn scorer_failure_fails_open_even_for_toxic_text() {
    let scorer = FakeScorer::failing(ScoreError::ModelUnavailable("model not loaded".into()));
    let m = moderator(scorer.clone(), CountingMatcher::with_defaults());

    let evaluation = m.evaluate("you are worthless").await;

    // Degraded safety: the toxic message is let through.
    assert_eq!(evaluation.result.toxicity(), 0.0);
    assert!(!evaluation
        .result
        .violations()
        .contains(&ViolationKind::Toxicity));
    assert!(!evaluation.result.is_violation());
    assert_eq!(
        evaluation.degradation,
        Some(Degradation::Extraction(ScoreError::ModelUnavailable(
            "model not loaded".into()
        )))
    );
}

#[tokio::test]
async fn scorer_failure_still_applies_spam_patterns() {
    let scorer = FakeScorer::failing(ScoreError::Inference("boom".into()));
    let m = moderator(scorer, CountingMatcher::with_defaults());

    let evaluation = m.evaluate("http://scam.example").await;
    assert_eq!(evaluation.result.violations(), &[ViolationKind::Spam]);
    assert!(evaluation.degradation.is_some());
}

// ============================================================
// Truncation asymmetry
// ============================================================

#[tokio::test]
async fn scorer_sees_prefix_matcher_sees_everything() {
    let scorer = FakeScorer::returning(0.1);
    let matcher = CountingMatcher::with_defaults();
    let m = moderator(scorer.clone(), matcher.clone());

    // Spam marker sits past the 1000-char prefix.
    let text = format!("{} call 5551234567890", "a".repeat(1200));
    let result = m.analyze(&text).await;

    assert_eq!(scorer.last_seen().chars().count(), 1000);
    assert_eq!(
        matcher.seen_len.load(Ordering::SeqCst),
        text.chars().count()
    );
    assert_eq!(result.violations(), &[ViolationKind::Spam]);
}

#[tokio::test]
async fn truncation_respects_multibyte_characters() {
    let scorer = FakeScorer::returning(0.1);
    let policy = ModerationPolicy {
        max_input_chars: 5,
        ..ModerationPolicy::default()
    };
    let m = Moderator::with_matcher(policy, scorer.clone(), CountingMatcher::with_defaults())
        .unwrap();

    m.analyze("привет мир 🙂").await;
    assert_eq!(scorer.last_seen(), "приве");
}

#[tokio::test]
async fn short_text_is_passed_whole() {
    let scorer = FakeScorer::returning(0.1);
    let m = moderator(scorer.clone(), CountingMatcher::with_defaults());
    m.analyze("short and sweet").await;
    assert_eq!(scorer.last_seen(), "short and sweet");
}

// ============================================================
// Concrete scenarios
// ============================================================

#[tokio::test]
async fn scenario_scam_link() {
    let m = moderator(FakeScorer::returning(0.10), CountingMatcher::with_defaults());
    let result = m.analyze("Buy now http://scam.example/offer").await;
    assert!(result.is_spam());
    assert_eq!(result.violations(), &[ViolationKind::Spam]);
    assert!((result.toxicity() - 0.10).abs() < 1e-10);
}

#[tokio::test]
async fn scenario_insult() {
    let m = moderator(FakeScorer::returning(0.92), CountingMatcher::with_defaults());
    let result = m.analyze("you are worthless").await;
    assert!(!result.is_spam());
    assert_eq!(result.violations(), &[ViolationKind::Toxicity]);
}

#[tokio::test]
async fn scenario_whitespace_only() {
    let scorer = FakeScorer::returning(0.99);
    let matcher = CountingMatcher::with_defaults();
    let m = moderator(scorer.clone(), matcher.clone());
    let result = m.analyze("   ").await;
    assert!(result.violations().is_empty());
    assert_eq!(scorer.calls() + matcher.calls(), 0);
}

#[tokio::test]
async fn scenario_phone_number() {
    let m = moderator(FakeScorer::returning(0.01), CountingMatcher::with_defaults());
    let result = m.analyze("call me 5551234567890").await;
    assert_eq!(result.violations(), &[ViolationKind::Spam]);
}

// ============================================================
// Concurrency
// ============================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_evaluations_are_independent() {
    let m = moderator(FakeScorer::returning(0.5), CountingMatcher::with_defaults());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let m = m.clone();
            tokio::spawn(async move {
                let text = if i % 2 == 0 {
                    format!("message {i}")
                } else {
                    format!("message {i} https://spam.example/{i}")
                };
                (i, m.analyze(&text).await)
            })
        })
        .collect();

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        assert_eq!(result.is_spam(), i % 2 == 1, "message {i}");
    }
}
