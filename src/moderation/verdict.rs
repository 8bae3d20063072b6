// Verdict types produced by the decision engine.

use serde::Serialize;

/// A named reason a message is flagged for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Toxicity,
    Spam,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Toxicity => "toxicity",
            ViolationKind::Spam => "spam",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The engine's judgement of one piece of text.
///
/// Built once per message and never changed afterwards, so the fields are
/// only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    toxicity: f64,
    is_spam: bool,
    violations: Vec<ViolationKind>,
}

impl AnalysisResult {
    /// The "nothing found" result: zero toxicity, not spam, no violations.
    pub fn neutral() -> Self {
        Self {
            toxicity: 0.0,
            is_spam: false,
            violations: Vec::new(),
        }
    }

    /// Derive violations from the two signals. Order is fixed: toxicity
    /// first, then spam.
    pub fn from_signals(toxicity: f64, is_spam: bool, toxicity_threshold: f64) -> Self {
        let mut violations = Vec::with_capacity(2);
        if toxicity > toxicity_threshold {
            violations.push(ViolationKind::Toxicity);
        }
        if is_spam {
            violations.push(ViolationKind::Spam);
        }
        Self {
            toxicity,
            is_spam,
            violations,
        }
    }

    pub fn toxicity(&self) -> f64 {
        self.toxicity
    }

    pub fn is_spam(&self) -> bool {
        self.is_spam
    }

    pub fn violations(&self) -> &[ViolationKind] {
        &self.violations
    }

    /// True when the message should be removed.
    pub fn is_violation(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Violations as a comma-separated list, e.g. "toxicity, spam".
    pub fn violation_list(&self) -> String {
        self.violations
            .iter()
            .map(ViolationKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::neutral()
    }
}
