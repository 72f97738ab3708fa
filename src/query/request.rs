use super::options::ParsedOptions;
use serde::Serialize;
use std::ops::RangeInclusive;

/// One entry of a multiple-verses request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerseRef {
    pub chapter: u32,
    pub verse: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse_end: Option<u32>,
}

impl VerseRef {
    pub fn single(chapter: u32, verse: u32) -> Self {
        Self {
            chapter,
            verse,
            verse_end: None,
        }
    }

    pub fn range(chapter: u32, verse: u32, verse_end: u32) -> Self {
        Self {
            chapter,
            verse,
            verse_end: Some(verse_end),
        }
    }

    /// Verse numbers covered, ascending even when written backwards.
    pub fn verses(&self) -> RangeInclusive<u32> {
        let end = self.verse_end.unwrap_or(self.verse);
        self.verse.min(end)..=self.verse.max(end)
    }

    pub fn reference(&self) -> String {
        match self.verse_end {
            Some(end) => format!("{}:{}-{}", self.chapter, self.verse, end),
            None => format!("{}:{}", self.chapter, self.verse),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "parsed_query", rename_all = "snake_case")]
pub enum ParsedQuery {
    Chapter { chapter: u32 },
    Verse { chapter: u32, verse: u32 },
    VerseRange { chapter: u32, verse: u32, verse_end: u32 },
    MultipleVerses(Vec<VerseRef>),
    Search(String),
}

impl ParsedQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedQuery::Chapter { .. } => "chapter",
            ParsedQuery::Verse { .. } => "verse",
            ParsedQuery::VerseRange { .. } => "verse_range",
            ParsedQuery::MultipleVerses(_) => "multiple_verses",
            ParsedQuery::Search(_) => "search",
        }
    }

    /// Canonical query-string form, usable for redirects and permalinks.
    pub fn standard_url(&self) -> String {
        match self {
            ParsedQuery::Chapter { chapter } => format!("/?chapter={chapter}"),
            ParsedQuery::Verse { chapter, verse } => format!("/?chapter={chapter}&verse={verse}"),
            ParsedQuery::VerseRange {
                chapter,
                verse,
                verse_end,
            } => format!("/?chapter={chapter}&verse={verse}&verse_end={verse_end}"),
            ParsedQuery::MultipleVerses(refs) => {
                let joined: Vec<String> = refs.iter().map(VerseRef::reference).collect();
                format!("/?multiple_verses={}", joined.join(","))
            }
            ParsedQuery::Search(text) => {
                let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
                format!("/?q={encoded}")
            }
        }
    }
}

/// A typed request plus its normalized options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRequest {
    #[serde(flatten)]
    pub query: ParsedQuery,
    pub raw_query: String,
    pub parsed_options: ParsedOptions,
    pub standard_url: String,
}

impl ParsedRequest {
    pub fn new(query: ParsedQuery, raw_query: &str, parsed_options: ParsedOptions) -> Self {
        let standard_url = query.standard_url();
        Self {
            query,
            raw_query: raw_query.to_string(),
            parsed_options,
            standard_url,
        }
    }

    pub fn search_text(&self) -> Option<&str> {
        match &self.query {
            ParsedQuery::Search(text) => Some(text),
            _ => None,
        }
    }

    /// Swap the typed query, keeping the canonical URL in step.
    pub(crate) fn replace_query(&mut self, query: ParsedQuery) {
        self.standard_url = query.standard_url();
        self.query = query;
    }
}
