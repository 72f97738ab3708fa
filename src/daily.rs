//! Verse and chapter of the day: one pick per calendar date, created on
//! first request and reused afterwards.
use crate::catalog::{CHAPTER_COUNT, Catalog};
use crate::error::Result;
use crate::record::{CHAPTER_NUMBER, Row, RowExt, VERSE_ID};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub const VERSE_OF_THE_DAY: &str = "ws-verse-of-the-day";
pub const CHAPTER_OF_THE_DAY: &str = "ws-chapter-of-the-day";

/// Rows keyed by `year`, `month` and `day`.
#[async_trait]
pub trait DailyStore: Send + Sync {
    async fn get_by_date(&self, table: &str, date: NaiveDate) -> Result<Option<Row>>;
    async fn insert(&self, table: &str, row: Row) -> Result<()>;
}

fn dated_row(date: NaiveDate, key: &str, value: Value) -> Row {
    let mut row = Row::new();
    row.insert("year".to_string(), Value::from(date.year()));
    row.insert("month".to_string(), Value::from(date.month()));
    row.insert("day".to_string(), Value::from(date.day()));
    row.insert(key.to_string(), value);
    row
}

fn is_on(row: &Row, date: NaiveDate) -> bool {
    row.int("year") == Some(i64::from(date.year()))
        && row.int("month") == Some(i64::from(date.month()))
        && row.int("day") == Some(i64::from(date.day()))
}

/// One JSON array per table under `dir`.
#[derive(Debug, Clone)]
pub struct JsonDailyStore {
    dir: PathBuf,
}

impl JsonDailyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }

    async fn read_all(&self, table: &str) -> Result<Vec<Row>> {
        match tokio::fs::read_to_string(self.path_for(table)).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DailyStore for JsonDailyStore {
    async fn get_by_date(&self, table: &str, date: NaiveDate) -> Result<Option<Row>> {
        let rows = self.read_all(table).await?;
        Ok(rows.into_iter().find(|row| is_on(row, date)))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<()> {
        let mut rows = self.read_all(table).await?;
        rows.push(row);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(table), serde_json::to_string_pretty(&rows)?).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDailyStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemoryDailyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl DailyStore for MemoryDailyStore {
    async fn get_by_date(&self, table: &str, date: NaiveDate) -> Result<Option<Row>> {
        Ok(self
            .tables
            .lock()
            .get(table)
            .and_then(|rows| rows.iter().find(|row| is_on(row, date)).cloned()))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<()> {
        self.tables.lock().entry(table.to_string()).or_default().push(row);
        Ok(())
    }
}

pub struct DailyPicker<'a> {
    catalog: &'a Catalog,
    store: Arc<dyn DailyStore>,
}

impl<'a> DailyPicker<'a> {
    pub fn new(catalog: &'a Catalog, store: Arc<dyn DailyStore>) -> Self {
        Self { catalog, store }
    }

    /// The `verse_id` picked for `date`; `None` only if no verses are loaded
    /// and nothing was stored.
    pub async fn verse_of_the_day(&self, date: NaiveDate) -> Option<String> {
        match self.store.get_by_date(VERSE_OF_THE_DAY, date).await {
            Ok(Some(row)) => match row.verse_id() {
                Some(id) => return Some(id),
                None => warn!("{VERSE_OF_THE_DAY} row for {date} has no verse_id, picking again"),
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Could not read {VERSE_OF_THE_DAY}: {e}");
                return self.catalog.random_verse().and_then(|row| row.verse_id());
            }
        }

        let id = self.catalog.random_verse()?.verse_id()?;
        self.record(VERSE_OF_THE_DAY, dated_row(date, VERSE_ID, Value::from(id.clone())))
            .await;
        info!("Verse of the day for {date}: {id}");
        Some(id)
    }

    pub async fn chapter_of_the_day(&self, date: NaiveDate) -> u32 {
        match self.store.get_by_date(CHAPTER_OF_THE_DAY, date).await {
            Ok(Some(row)) => match row.chapter_number() {
                Some(chapter) => return chapter,
                None => warn!("{CHAPTER_OF_THE_DAY} row for {date} has no chapter_number, picking again"),
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Could not read {CHAPTER_OF_THE_DAY}: {e}");
                return rand::rng().random_range(1..=CHAPTER_COUNT);
            }
        }

        let chapter = rand::rng().random_range(1..=CHAPTER_COUNT);
        self.record(CHAPTER_OF_THE_DAY, dated_row(date, CHAPTER_NUMBER, Value::from(chapter)))
            .await;
        info!("Chapter of the day for {date}: {chapter}");
        chapter
    }

    async fn record(&self, table: &str, row: Row) {
        if let Err(e) = self.store.insert(table, row).await {
            warn!("Could not store {table} pick: {e}");
        }
    }
}
