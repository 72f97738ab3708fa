//! Record filtering and match highlighting
pub mod engine;
pub mod highlight;
pub mod strategy;

pub use engine::{SearchEngine, matches};
pub use highlight::{HighlightMode, Highlighter, MARKER_PLACEHOLDER, highlight};
pub use strategy::{AllTokens, ExactPhrase, MatchStrategy};
