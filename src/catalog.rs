//! Application context: one [`DataStore`] per dataset, query execution over
//! the current snapshots, and bulk export.
use crate::error::{Result, VerseError};
use crate::fields::{self, FieldFamily};
use crate::language::{self, Language};
use crate::metrics::Metrics;
use crate::query::{ParsedQuery, ParsedRequest, QueryParams, ReferenceParser, SearchOptions, SearchStrategy, VerseRef};
use crate::record::{self, CHAPTER_NUMBER, GLOBAL_INDEX, Row, RowExt, VERSE_ID, VERSE_INDEX};
use crate::search::{HighlightMode, Highlighter, SearchEngine};
use crate::sync::{DataStore, PendingRefresh, RemoteSync, Snapshot, SnapshotSource, StoreOptions};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info};
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const RANDOM_VERSE: &str = "random-verse";
pub const RANDOM_CHAPTER: &str = "random-chapter";
pub const CHAPTER_COUNT: u32 = 114;
const MIN_SEARCH_CHARS: usize = 3;

lazy_static! {
    static ref SHOUTED_GOD: Regex = Regex::new(r"\bGOD\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Quran,
    WordByWord,
    Chapters,
    Foreign,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Quran,
        DatasetKind::WordByWord,
        DatasetKind::Chapters,
        DatasetKind::Foreign,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            DatasetKind::Quran => "quran",
            DatasetKind::WordByWord => "quran-word-by-word",
            DatasetKind::Chapters => "quran-chapters",
            DatasetKind::Foreign => "quran-foreign",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            DatasetKind::Quran => "ws-quran",
            DatasetKind::WordByWord => "ws-quran-word-by-word",
            DatasetKind::Chapters => "ws-quran-chapters",
            DatasetKind::Foreign => "ws-quran-foreign",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == slug)
            .ok_or_else(|| VerseError::UnknownDataset(slug.to_string()))
    }

    fn store_options(self, resync_grace: Duration) -> StoreOptions {
        match self {
            DatasetKind::Quran => StoreOptions::sorted_by(VERSE_INDEX)
                .joined_on(VERSE_ID)
                .resync_after(resync_grace),
            DatasetKind::WordByWord => StoreOptions::sorted_by(GLOBAL_INDEX).joined_on(VERSE_ID),
            DatasetKind::Chapters => StoreOptions::sorted_by(CHAPTER_NUMBER),
            DatasetKind::Foreign => StoreOptions::sorted_by(GLOBAL_INDEX).joined_on(VERSE_ID),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub resync_grace: Duration,
    pub default_strategy: SearchStrategy,
    pub default_language: String,
    pub highlight_mode: HighlightMode,
    pub regex_cache_size: usize,
    pub preview_rows: usize,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            resync_grace: Duration::from_secs(60),
            default_strategy: SearchStrategy::Fuzzy,
            default_language: "en".to_string(),
            highlight_mode: HighlightMode::Markdown,
            regex_cache_size: 128,
            preview_rows: 19,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Copyright {
    pub text: &'static str,
    pub url: &'static str,
}

pub const COPYRIGHT: Copyright = Copyright {
    text: "© Rashad Khalifa, Ph.D.",
    url: "https://www.masjidtucson.org/submission/faq/rashad_khalifa_summary.html",
};

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub data: Vec<Row>,
    pub copyright: Copyright,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub message: String,
    pub request: ParsedRequest,
    pub response: QueryResponse,
}

/// A dataset dump. `filename` is set for full exports only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: Option<String>,
    pub body: String,
}

pub struct Catalog {
    quran: Arc<DataStore>,
    word_by_word: Arc<DataStore>,
    chapters: Arc<DataStore>,
    foreign: Arc<DataStore>,
    parser: ReferenceParser,
    highlighter: Highlighter,
    highlight_mode: HighlightMode,
    preview_rows: usize,
    metrics: Arc<Metrics>,
}

impl Catalog {
    /// Build every dataset store. Nothing is loaded until
    /// [`initialize_all`](Self::initialize_all).
    pub fn new(
        local: Arc<dyn SnapshotSource>,
        remote: Option<RemoteSync>,
        options: CatalogOptions,
        metrics: Arc<Metrics>,
    ) -> Self {
        let build = |kind: DatasetKind| {
            let store = DataStore::new(
                kind.table(),
                kind.store_options(options.resync_grace),
                Arc::clone(&local),
                Arc::clone(&metrics),
            );
            Arc::new(match &remote {
                Some(remote) => store.with_remote(remote.clone()),
                None => store,
            })
        };

        Self {
            quran: build(DatasetKind::Quran),
            word_by_word: build(DatasetKind::WordByWord),
            chapters: build(DatasetKind::Chapters),
            foreign: build(DatasetKind::Foreign),
            parser: ReferenceParser::with_defaults(options.default_strategy, &options.default_language),
            highlighter: Highlighter::new(options.regex_cache_size),
            highlight_mode: options.highlight_mode,
            preview_rows: options.preview_rows,
            metrics,
        }
    }

    /// Bootstrap every dataset from local data and queue their refreshes.
    pub fn initialize_all(&self) -> Vec<PendingRefresh> {
        let pending: Vec<PendingRefresh> = DatasetKind::ALL
            .iter()
            .map(|&kind| self.store(kind).initialize())
            .collect();
        info!("Initialized {} datasets", pending.len());
        pending
    }

    pub fn store(&self, kind: DatasetKind) -> &Arc<DataStore> {
        match kind {
            DatasetKind::Quran => &self.quran,
            DatasetKind::WordByWord => &self.word_by_word,
            DatasetKind::Chapters => &self.chapters,
            DatasetKind::Foreign => &self.foreign,
        }
    }

    pub fn dataset(&self, slug: &str) -> Result<&Arc<DataStore>> {
        DatasetKind::from_slug(slug).map(|kind| self.store(kind))
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn parse(&self, raw: &str, params: &QueryParams) -> ParsedRequest {
        self.parser.parse(raw, params)
    }

    pub fn execute(&self, raw: &str, params: &QueryParams) -> Result<QueryResult> {
        let mut request = self.parse(raw, params);
        let verses = self.quran.get();
        debug!("Executing {} query {:?}", request.query.kind(), request.raw_query);

        let mut data = match request.query.clone() {
            ParsedQuery::Chapter { chapter } => verses_in_chapter(&verses, chapter),
            ParsedQuery::Verse { chapter, verse } => {
                lookup(&verses, &VerseRef::single(chapter, verse))
            }
            ParsedQuery::VerseRange {
                chapter,
                verse,
                verse_end,
            } => lookup(&verses, &VerseRef::range(chapter, verse, verse_end)),
            ParsedQuery::MultipleVerses(refs) => {
                refs.iter().flat_map(|r| lookup(&verses, r)).collect()
            }
            ParsedQuery::Search(text) => {
                if text.chars().count() < MIN_SEARCH_CHARS {
                    return Err(VerseError::InvalidRequest(
                        "Query must be at least 3 characters".to_string(),
                    ));
                }
                match text.as_str() {
                    RANDOM_VERSE => match self.random_verse_from(&verses) {
                        Some(row) => {
                            if let (Some(chapter), Some(verse)) = (row.chapter_number(), row.verse_number()) {
                                request.replace_query(ParsedQuery::Verse { chapter, verse });
                            }
                            vec![row]
                        }
                        None => Vec::new(),
                    },
                    RANDOM_CHAPTER => {
                        let chapter = self.random_chapter();
                        request.replace_query(ParsedQuery::Chapter { chapter });
                        verses_in_chapter(&verses, chapter)
                    }
                    _ => self.search(&verses, &text, &request.parsed_options.search_options()),
                }
            }
        };

        let options = &request.parsed_options;
        if options.normalize_god_casing {
            data.iter_mut().for_each(normalize_god_casing);
        }
        if options.include_word_by_word {
            self.attach_word_by_word(&mut data);
        }
        if let Some(code) = &options.include_language {
            self.attach_language(&mut data, language::canonicalize(code));
        }
        if options.sort_results {
            data.sort_by_key(|row| row.verse_index().unwrap_or(i64::MAX));
        }

        self.metrics.queries_served.inc();
        Ok(QueryResult {
            message: summary(data.len(), &request.raw_query),
            request,
            response: QueryResponse {
                data,
                copyright: COPYRIGHT,
            },
        })
    }

    fn search(&self, verses: &Snapshot, text: &str, options: &SearchOptions) -> Vec<Row> {
        let foreign = self.foreign.get();
        let engine = SearchEngine::new(options);
        let join = |row: &Row| row.verse_id().and_then(|id| foreign.find(&id));

        let hits = engine.run(verses.rows(), text, join);
        debug!("{} search for {text:?} matched {} verses", engine.strategy_name(), hits.len());

        if !options.search_apply_highlight {
            return hits.into_iter().cloned().collect();
        }
        hits.into_iter()
            .map(|row| self.highlight_row(row, join(row), text, engine.language(), options))
            .collect()
    }

    /// Copy of `row` with the resolved text (and commentary, unless ignored)
    /// written back highlighted under the search language's field names.
    fn highlight_row(
        &self,
        row: &Row,
        enrichment: Option<&Row>,
        text: &str,
        lang: Language,
        options: &SearchOptions,
    ) -> Row {
        let mut copy = row.clone();
        let families: &[FieldFamily] = if options.search_ignore_commentary {
            &[FieldFamily::Text]
        } else {
            &[FieldFamily::Text, FieldFamily::Subtitle, FieldFamily::Footnote]
        };
        for &family in families {
            let resolved = fields::resolve(row, lang, family, enrichment);
            if let Some(marked) = self.highlighter.highlight(text, resolved.as_deref(), self.highlight_mode) {
                copy.insert(fields::field_name(lang, family).to_string(), Value::String(marked));
            }
        }
        copy
    }

    fn attach_word_by_word(&self, data: &mut [Row]) {
        let words = self.word_by_word.get();
        for row in data {
            let joined: Vec<Value> = row
                .verse_id()
                .map(|id| words.find_all(&id).cloned().map(Value::Object).collect())
                .unwrap_or_default();
            row.insert("word_by_word".to_string(), Value::Array(joined));
        }
    }

    /// Rows with no foreign counterpart are left untouched.
    fn attach_language(&self, data: &mut [Row], lang: Language) {
        let foreign = self.foreign.get();
        for row in data {
            let Some(enrichment) = row.verse_id().and_then(|id| foreign.find(&id)) else {
                continue;
            };
            for family in FieldFamily::ALL {
                let value = fields::resolve(row, lang, family, Some(enrichment))
                    .map_or(Value::Null, Value::String);
                row.insert(fields::field_name(lang, family).to_string(), value);
            }
        }
    }

    pub fn random_verse(&self) -> Option<Row> {
        self.random_verse_from(&self.quran.get())
    }

    fn random_verse_from(&self, verses: &Snapshot) -> Option<Row> {
        if verses.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..verses.len());
        verses.rows().get(idx).cloned()
    }

    /// A chapter number drawn from the chapter dataset, or from 1 to 114
    /// when it is not loaded.
    pub fn random_chapter(&self) -> u32 {
        let chapters = self.chapters.get();
        let mut rng = rand::rng();
        if !chapters.is_empty() {
            let idx = rng.random_range(0..chapters.len());
            if let Some(number) = chapters.rows().get(idx).and_then(RowExt::chapter_number) {
                return number;
            }
        }
        rng.random_range(1..=CHAPTER_COUNT)
    }

    /// Verses of one chapter in reading order.
    pub fn chapter_verses(&self, chapter: u32) -> Vec<Row> {
        verses_in_chapter(&self.quran.get(), chapter)
    }

    /// Pretty JSON of a whole dataset, or its first rows inline when previewing.
    pub fn export(&self, slug: &str, preview: bool, date: NaiveDate) -> Result<Export> {
        let kind = DatasetKind::from_slug(slug)?;
        let snapshot = self.store(kind).get();
        let rows = snapshot.rows();

        if preview {
            let end = rows.len().min(self.preview_rows);
            return Ok(Export {
                filename: None,
                body: serde_json::to_string_pretty(&rows[..end])?,
            });
        }
        Ok(Export {
            filename: Some(format!("{}_{}.json", kind.table(), date.format("%Y-%m-%d"))),
            body: serde_json::to_string_pretty(rows)?,
        })
    }
}

fn verses_in_chapter(verses: &Snapshot, chapter: u32) -> Vec<Row> {
    verses
        .rows()
        .iter()
        .filter(|row| row.chapter_number() == Some(chapter))
        .cloned()
        .collect()
}

/// Verses covered by `reference` in ascending verse order; missing ones are skipped.
///
/// Ranges scan the chapter's rows rather than the numbers in the range, so
/// the cost is bounded by the chapter length whatever the range end.
fn lookup(verses: &Snapshot, reference: &VerseRef) -> Vec<Row> {
    let range = reference.verses();
    if range.start() == range.end() {
        return verses
            .find(&record::verse_id(reference.chapter, *range.start()))
            .cloned()
            .into_iter()
            .collect();
    }
    let mut rows: Vec<Row> = verses
        .rows()
        .iter()
        .filter(|row| row.chapter_number() == Some(reference.chapter))
        .filter(|row| row.verse_number().is_some_and(|v| range.contains(&v)))
        .cloned()
        .collect();
    rows.sort_by_key(|row| row.verse_number());
    rows
}

fn normalize_god_casing(row: &mut Row) {
    for value in row.values_mut() {
        if let Value::String(s) = value {
            if SHOUTED_GOD.is_match(s) {
                *s = SHOUTED_GOD.replace_all(s, "God").into_owned();
            }
        }
    }
}

fn summary(count: usize, raw: &str) -> String {
    match count {
        0 => format!("No verses found with '{raw}'"),
        1 => format!("Found 1 verse with '{raw}'"),
        n => format!("Found {n} verses with '{raw}'"),
    }
}
