mod common;

use serde_json::json;
use versekeep::language::{Language, canonicalize};
use versekeep::query::{SearchOptions, SearchStrategy};
use versekeep::record::RowExt;
use versekeep::search::{MatchStrategy, matches};
use versekeep::{HighlightMode, Highlighter, Row, SearchEngine, highlight};

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn options(strategy: SearchStrategy) -> SearchOptions {
    SearchOptions {
        search_strategy: strategy,
        ..SearchOptions::default()
    }
}

fn light_verse() -> Row {
    row(json!({
        "verse_id": "24:35",
        "verse_text_english": "GOD is the light of the heavens and the earth.",
        "verse_subtitle_english": "Allegory",
        "verse_footnote_english": "*24:35 A niche holding a lamp.",
    }))
}

#[test]
fn test_fuzzy_requires_every_token_in_any_order() {
    let verse = light_verse();
    assert!(matches(&verse, "god light", &options(SearchStrategy::Fuzzy), None));
    assert!(matches(&verse, "light god", &options(SearchStrategy::Fuzzy), None));
    assert!(!matches(&verse, "god darkness", &options(SearchStrategy::Fuzzy), None));
}

#[test]
fn test_exact_requires_literal_phrase() {
    let verse = light_verse();
    assert!(!matches(&verse, "god light", &options(SearchStrategy::Exact), None));
    assert!(matches(&verse, "the light of", &options(SearchStrategy::Exact), None));

    let literal = row(json!({ "verse_text_english": "The god light shines" }));
    assert!(matches(&literal, "god light", &options(SearchStrategy::Exact), None));
}

#[test]
fn test_substring_not_word_matching() {
    let verse = row(json!({ "verse_text_english": "They delight in it" }));
    assert!(matches(&verse, "light", &options(SearchStrategy::Fuzzy), None));
}

#[test]
fn test_commentary_is_a_fallback() {
    let verse = light_verse();
    let mut opts = options(SearchStrategy::Fuzzy);
    assert!(matches(&verse, "lamp", &opts, None));
    assert!(matches(&verse, "allegory niche", &opts, None));

    opts.search_ignore_commentary = true;
    assert!(!matches(&verse, "lamp", &opts, None));
}

#[test]
fn test_case_sensitivity() {
    let verse = light_verse();
    let mut opts = options(SearchStrategy::Exact);
    assert!(matches(&verse, "god is", &opts, None));

    opts.search_case_sensitive = true;
    assert!(!matches(&verse, "god is", &opts, None));
    assert!(matches(&verse, "GOD is", &opts, None));
}

#[test]
fn test_search_language_uses_enrichment_then_english() {
    let verse = light_verse();
    let foreign = row(json!({ "verse_id": "24:35", "verse_text_french": "DIEU est la lumière" }));
    let mut opts = options(SearchStrategy::Fuzzy);
    opts.search_language = "fr".to_string();

    assert!(matches(&verse, "lumière", &opts, Some(&foreign)));
    // Falls back to the English text when the language field is absent.
    assert!(matches(&verse, "heavens", &opts, None));
}

#[test]
fn test_engine_run_preserves_order() {
    let records = common::verses();
    let engine = SearchEngine::new(&options(SearchStrategy::Fuzzy));
    let hits = engine.run(&records, "messenger", |_| None);
    let ids: Vec<String> = hits.iter().filter_map(|r| r.verse_id()).collect();
    assert_eq!(ids, vec!["9:1", "9:3"]);
    assert_eq!(engine.strategy_name(), "fuzzy");
}

struct Prefix;

impl MatchStrategy for Prefix {
    fn matches(&self, haystack: &str, query: &str) -> bool {
        haystack.starts_with(query)
    }

    fn name(&self) -> &'static str {
        "prefix"
    }
}

#[test]
fn test_custom_strategy() {
    let engine = SearchEngine::with_strategy(Box::new(Prefix), &SearchOptions::default());
    let verse = light_verse();
    assert!(engine.matches(&verse, "god is", None));
    assert!(!engine.matches(&verse, "light", None));
    assert_eq!(engine.strategy_name(), "prefix");
}

#[test]
fn test_empty_query_matches_nothing() {
    let verse = light_verse();
    assert!(!matches(&verse, "   ", &options(SearchStrategy::Fuzzy), None));
    assert!(!matches(&verse, "", &options(SearchStrategy::Exact), None));
}

#[test]
fn test_highlight_wraps_only_the_match() {
    assert_eq!(
        highlight("light", Some("In the light of day"), HighlightMode::Markdown).as_deref(),
        Some("In the **light** of day")
    );
    assert_eq!(highlight("light", None, HighlightMode::Markdown), None);
    assert_eq!(highlight("light", Some(""), HighlightMode::Markdown), None);
}

#[test]
fn test_highlight_without_matches_returns_text() {
    assert_eq!(
        highlight("darkness", Some("In the light of day"), HighlightMode::Markdown).as_deref(),
        Some("In the light of day")
    );
}

#[test]
fn test_highlight_every_token() {
    let h = Highlighter::default();
    assert_eq!(
        h.highlight("god light", Some("GOD is the Light"), HighlightMode::Markdown)
            .as_deref(),
        Some("**GOD** is the **Light**")
    );
    assert_eq!(
        h.highlight("light", Some("the light"), HighlightMode::Html).as_deref(),
        Some(r#"the <span class="text-red-800"><b>light</b></span>"#)
    );
}

#[test]
fn test_highlight_escapes_regex_syntax() {
    assert_eq!(
        highlight("a.l.m.", Some("A.L.M. and aXlXmX"), HighlightMode::Markdown).as_deref(),
        Some("**A.L.M.** and aXlXmX")
    );
}

#[test]
fn test_language_canonicalization() {
    assert_eq!(canonicalize("xx"), Language::English);
    assert_eq!(canonicalize("FR").name(), "french");
}
