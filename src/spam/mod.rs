// Spam detection — pattern matching over message text.
//
// Patterns are configuration: an ordered list of regular expressions
// compiled once at startup. A message is spam if ANY of them matches
// anywhere in the text.

pub mod patterns;

/// Trait for deciding whether a text is spam. Implementations must be pure
/// with respect to shared state so the decision engine can call them from
/// any number of concurrent evaluations.
pub trait SpamMatcher: Send + Sync {
    fn is_spam(&self, text: &str) -> bool;
}
