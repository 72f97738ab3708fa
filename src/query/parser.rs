//! Reference grammar, first match wins:
//!
//! 1. `9`            → chapter
//! 2. `9:1`, `9 1`   → verse
//! 3. `9:1-5`        → verse range
//! 4. `9:1,9:3,2:1-5` → multiple verses (every element must be a verse or range)
//! 5. anything else  → free-text search
use super::options::{ParsedOptions, QueryParams, SearchOptions, SearchStrategy, flag};
use super::request::{ParsedQuery, ParsedRequest, VerseRef};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CHAPTER: Regex = Regex::new(r"^(\d+)$").unwrap();
    static ref VERSE: Regex = Regex::new(r"^(\d+)[:\s]+(\d+)$").unwrap();
    static ref VERSE_RANGE: Regex = Regex::new(r"^(\d+)[:\s]+(\d+)[-\s]+(\d+)$").unwrap();
    static ref LIST_RANGE: Regex = Regex::new(r"^(\d+):(\d+)-(\d+)$").unwrap();
}

/// Parses raw reference strings. Never rejects input: whatever does not look
/// like a reference becomes a search request.
#[derive(Debug, Clone)]
pub struct ReferenceParser {
    default_strategy: SearchStrategy,
    default_language: String,
}

impl Default for ReferenceParser {
    fn default() -> Self {
        Self {
            default_strategy: SearchStrategy::Fuzzy,
            default_language: "en".to_string(),
        }
    }
}

impl ReferenceParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(strategy: SearchStrategy, language: &str) -> Self {
        Self {
            default_strategy: strategy,
            default_language: language.to_string(),
        }
    }

    pub fn parse(&self, raw: &str, params: &QueryParams) -> ParsedRequest {
        let raw = raw.trim();
        let query = raw.to_lowercase();
        let mut options = ParsedOptions::universal(params);

        let parsed = match Self::parse_reference(&query) {
            Some(reference) => reference,
            None => {
                options.search = Some(self.search_options(params));
                ParsedQuery::Search(query)
            }
        };

        ParsedRequest::new(parsed, raw, options)
    }

    fn parse_reference(query: &str) -> Option<ParsedQuery> {
        if let Some(caps) = CHAPTER.captures(query) {
            if let Some(chapter) = number(&caps[1]) {
                return Some(ParsedQuery::Chapter { chapter });
            }
        }

        if let Some(caps) = VERSE.captures(query) {
            if let (Some(chapter), Some(verse)) = (number(&caps[1]), number(&caps[2])) {
                return Some(ParsedQuery::Verse { chapter, verse });
            }
        }

        if let Some(caps) = VERSE_RANGE.captures(query) {
            if let (Some(chapter), Some(verse), Some(verse_end)) =
                (number(&caps[1]), number(&caps[2]), number(&caps[3]))
            {
                return Some(ParsedQuery::VerseRange {
                    chapter,
                    verse,
                    verse_end,
                });
            }
        }

        if query.contains(',') {
            return Self::parse_list(query).map(ParsedQuery::MultipleVerses);
        }

        None
    }

    /// Every element must parse on its own; one bad element sends the whole
    /// query to search.
    fn parse_list(query: &str) -> Option<Vec<VerseRef>> {
        query
            .split(',')
            .map(str::trim)
            .map(|element| {
                if let Some(caps) = VERSE.captures(element) {
                    return Some(VerseRef::single(number(&caps[1])?, number(&caps[2])?));
                }
                let caps = LIST_RANGE.captures(element)?;
                Some(VerseRef::range(
                    number(&caps[1])?,
                    number(&caps[2])?,
                    number(&caps[3])?,
                ))
            })
            .collect()
    }

    fn search_options(&self, params: &QueryParams) -> SearchOptions {
        SearchOptions {
            search_strategy: params
                .get("search_strategy")
                .and_then(|v| SearchStrategy::from_param(v))
                .unwrap_or(self.default_strategy),
            search_language: params
                .get("search_language")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| self.default_language.clone()),
            search_case_sensitive: flag(params, "search_case_sensitive"),
            search_ignore_commentary: flag(params, "search_ignore_commentary"),
            search_apply_highlight: flag(params, "search_apply_highlight"),
        }
    }
}

fn number(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

/// Parse with the stock defaults (`fuzzy`, `en`).
pub fn parse(raw: &str, params: &QueryParams) -> ParsedRequest {
    ReferenceParser::default().parse(raw, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_whitespace_separators() {
        let req = parse("9 1", &QueryParams::new());
        assert_eq!(req.query, ParsedQuery::Verse { chapter: 9, verse: 1 });

        let req = parse("9 1 5", &QueryParams::new());
        assert_eq!(
            req.query,
            ParsedQuery::VerseRange {
                chapter: 9,
                verse: 1,
                verse_end: 5
            }
        );
    }

    #[test]
    fn test_overflowing_numbers_fall_through_to_search() {
        let req = parse("99999999999999999999", &QueryParams::new());
        assert!(matches!(req.query, ParsedQuery::Search(_)));
    }

    #[test]
    fn test_configured_defaults() {
        let parser = ReferenceParser::with_defaults(SearchStrategy::Exact, "fr");
        let req = parser.parse("lumière", &QueryParams::new());
        let opts = req.parsed_options.search.unwrap();
        assert_eq!(opts.search_strategy, SearchStrategy::Exact);
        assert_eq!(opts.search_language, "fr");

        let req = parser.parse("lumière", &params(&[("search_strategy", "fuzzy")]));
        assert_eq!(
            req.parsed_options.search.unwrap().search_strategy,
            SearchStrategy::Fuzzy
        );
    }

    #[test]
    fn test_search_options_absent_for_references() {
        let req = parse("2:255", &params(&[("search_strategy", "exact")]));
        assert!(req.parsed_options.search.is_none());
    }
}
