//! Pluggable text match strategies
use crate::query::SearchStrategy;
use memchr::memmem;

/// Decides whether a (case-normalized) query matches a (case-normalized) text.
pub trait MatchStrategy: Send + Sync {
    fn matches(&self, haystack: &str, query: &str) -> bool;
    fn name(&self) -> &'static str;
}

fn contains(haystack: &str, needle: &str) -> bool {
    memmem::find(haystack.as_bytes(), needle.as_bytes()).is_some()
}

/// The query as a whole phrase must be a substring of the text.
pub struct ExactPhrase;

impl MatchStrategy for ExactPhrase {
    fn matches(&self, haystack: &str, query: &str) -> bool {
        contains(haystack, query)
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Every whitespace-delimited token must be a substring of the text, in any
/// order. Substring, not word-boundary, matching.
pub struct AllTokens;

impl MatchStrategy for AllTokens {
    fn matches(&self, haystack: &str, query: &str) -> bool {
        let mut tokens = query.split_whitespace().peekable();
        tokens.peek().is_some() && tokens.all(|token| contains(haystack, token))
    }

    fn name(&self) -> &'static str {
        "fuzzy"
    }
}

pub fn for_strategy(strategy: SearchStrategy) -> Box<dyn MatchStrategy> {
    match strategy {
        SearchStrategy::Exact => Box::new(ExactPhrase),
        SearchStrategy::Fuzzy => Box::new(AllTokens),
    }
}
