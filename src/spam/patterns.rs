// Regex-backed spam matcher.

use regex::Regex;
use thiserror::Error;

use super::SpamMatcher;

/// Links: any http(s) URL.
pub const URL_PATTERN: &str =
    r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(\\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+";

/// Phone numbers and other long digit runs (10 or more digits). `\b` and
/// `\d` are Unicode-aware, so digits glued to Cyrillic letters are not a run.
pub const DIGIT_RUN_PATTERN: &str = r"\b\d{10,}\b";

/// The built-in pattern set, in evaluation order.
pub fn default_patterns() -> Vec<String> {
    vec![URL_PATTERN.to_string(), DIGIT_RUN_PATTERN.to_string()]
}

/// A configured pattern that doesn't compile.
#[derive(Debug, Error)]
#[error("invalid spam pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Matches text against an ordered set of compiled patterns.
///
/// Matching is an unanchored search and case-sensitive: no lowercasing or
/// unicode folding is applied to the text first.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<Regex>,
}

impl PatternMatcher {
    /// Compile every pattern, failing on the first one that doesn't compile.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| PatternError {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

}

impl SpamMatcher for PatternMatcher {
    fn is_spam(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}
