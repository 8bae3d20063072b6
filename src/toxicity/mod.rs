// Toxicity scoring — trait-based abstraction for swappable providers.
//
// The ToxicityScorer trait defines the interface. OnnxToxicityScorer runs a
// local model (the default); PerspectiveScorer calls Google's API. The
// decision engine only ever sees the trait.

pub mod download;
pub mod onnx;
pub mod perspective;
pub mod rate_limiter;
pub mod traits;
