//! Flat dataset rows and typed accessors over them
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One row of a dataset: a flat mapping of field name to scalar or null.
pub type Row = Map<String, Value>;

pub const VERSE_ID: &str = "verse_id";
pub const VERSE_INDEX: &str = "verse_index";
pub const VERSE_NUMBER: &str = "verse_number";
pub const CHAPTER_NUMBER: &str = "chapter_number";
pub const GLOBAL_INDEX: &str = "global_index";

/// Numeric value of a field, accepting numbers and numeric strings.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Text rendering of a scalar field; null and absent yield `None`.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Typed accessors shared by verse, word-by-word, foreign-language and chapter rows.
pub trait RowExt {
    fn int(&self, key: &str) -> Option<i64>;
    fn string(&self, key: &str) -> Option<String>;

    fn verse_id(&self) -> Option<String> {
        self.string(VERSE_ID)
    }

    fn chapter_number(&self) -> Option<u32> {
        self.int(CHAPTER_NUMBER).and_then(|n| u32::try_from(n).ok())
    }

    fn verse_number(&self) -> Option<u32> {
        self.int(VERSE_NUMBER).and_then(|n| u32::try_from(n).ok())
    }

    fn verse_index(&self) -> Option<i64> {
        self.int(VERSE_INDEX)
    }
}

impl RowExt for Row {
    fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(numeric).map(|v| v as i64)
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(text)
    }
}

/// Rebuild a row with its fields ordered lexicographically by name.
pub fn with_sorted_keys(row: Row) -> Row {
    row.into_iter()
        .collect::<BTreeMap<String, Value>>()
        .into_iter()
        .collect()
}

pub fn verse_id(chapter: u32, verse: u32) -> String {
    format!("{chapter}:{verse}")
}
