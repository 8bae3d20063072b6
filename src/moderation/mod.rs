// Content moderation — the policy layer between raw signals and enforcement.
//
// policy: thresholds and spam patterns (validated configuration)
// verdict: AnalysisResult and ViolationKind, the engine's output
// engine: evaluate() and the Moderator that bundles policy + extractors

pub mod engine;
pub mod policy;
pub mod verdict;

pub use engine::{evaluate, Degradation, Evaluation, Moderator};
pub use policy::{ModerationPolicy, PolicyError};
pub use verdict::{AnalysisResult, ViolationKind};
