//! Search evaluation against verse records
use super::strategy::{MatchStrategy, for_strategy};
use crate::fields::{self, FieldFamily};
use crate::language::{self, Language};
use crate::query::SearchOptions;
use crate::record::Row;
use rayon::prelude::*;

/// Evaluates a search query against records with a configured strategy.
pub struct SearchEngine {
    strategy: Box<dyn MatchStrategy>,
    language: Language,
    case_sensitive: bool,
    ignore_commentary: bool,
}

impl SearchEngine {
    pub fn new(options: &SearchOptions) -> Self {
        Self::with_strategy(for_strategy(options.search_strategy), options)
    }

    pub fn with_strategy(strategy: Box<dyn MatchStrategy>, options: &SearchOptions) -> Self {
        Self {
            strategy,
            language: language::canonicalize(&options.search_language),
            case_sensitive: options.search_case_sensitive,
            ignore_commentary: options.search_ignore_commentary,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn normalize(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }

    /// True if the resolved text matches, or, unless commentary is ignored,
    /// if subtitle and footnote together match. Never both required.
    pub fn matches(&self, record: &Row, query: &str, enrichment: Option<&Row>) -> bool {
        let query = self.normalize(query.trim());
        if query.is_empty() {
            return false;
        }

        let text = fields::resolve(record, self.language, FieldFamily::Text, enrichment)
            .map(|t| self.normalize(&t))
            .unwrap_or_default();
        if self.strategy.matches(&text, &query) {
            return true;
        }
        if self.ignore_commentary {
            return false;
        }

        let subtitle = fields::resolve(record, self.language, FieldFamily::Subtitle, enrichment)
            .unwrap_or_default();
        let footnote = fields::resolve(record, self.language, FieldFamily::Footnote, enrichment)
            .unwrap_or_default();
        let commentary = format!("{subtitle} {footnote}");
        let commentary = commentary.trim();
        if commentary.is_empty() {
            return false;
        }
        self.strategy.matches(&self.normalize(commentary), &query)
    }

    /// Filter `records` in order, joining each one to its enrichment row.
    pub fn run<'a, F>(&self, records: &'a [Row], query: &str, join: F) -> Vec<&'a Row>
    where
        F: Fn(&Row) -> Option<&'a Row> + Sync,
    {
        records
            .par_iter()
            .filter(|record| self.matches(record, query, join(*record)))
            .collect()
    }
}

/// One-shot match with the strategy named in `options`.
pub fn matches(record: &Row, query: &str, options: &SearchOptions, enrichment: Option<&Row>) -> bool {
    SearchEngine::new(options).matches(record, query, enrichment)
}
