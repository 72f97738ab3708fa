use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Raw query-string parameters accompanying a reference string.
pub type QueryParams = HashMap<String, String>;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// The whole query must appear as one phrase.
    Exact,
    /// Every whitespace-delimited token must appear somewhere.
    #[default]
    Fuzzy,
}

impl SearchStrategy {
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(SearchStrategy::Exact),
            "fuzzy" => Some(SearchStrategy::Fuzzy),
            _ => None,
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::Exact => write!(f, "exact"),
            SearchStrategy::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub search_strategy: SearchStrategy,
    pub search_language: String,
    pub search_case_sensitive: bool,
    pub search_ignore_commentary: bool,
    pub search_apply_highlight: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_strategy: SearchStrategy::Fuzzy,
            search_language: "en".to_string(),
            search_case_sensitive: false,
            search_ignore_commentary: false,
            search_apply_highlight: false,
        }
    }
}

/// Options normalized from the query parameters.
///
/// `search` is only populated for search requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOptions {
    pub sort_results: bool,
    pub normalize_god_casing: bool,
    pub include_word_by_word: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_language: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchOptions>,
}

/// `"true"` is true, anything else (including absence) is false.
pub(crate) fn flag(params: &QueryParams, key: &str) -> bool {
    params.get(key).is_some_and(|v| v == "true")
}

impl ParsedOptions {
    pub(crate) fn universal(params: &QueryParams) -> Self {
        Self {
            sort_results: flag(params, "sort_results"),
            normalize_god_casing: flag(params, "normalize_god_casing"),
            include_word_by_word: flag(params, "include_word_by_word"),
            include_language: params
                .get("include_language")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            search: None,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        self.search.clone().unwrap_or_default()
    }
}
