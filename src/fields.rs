//! Per-language field resolution with fallback to English
use crate::language::Language;
use crate::record::{Row, text};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// The closed set of per-language field families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldFamily {
    Text,
    Subtitle,
    Footnote,
    ChapterTitle,
}

impl FieldFamily {
    pub const ALL: [FieldFamily; 4] = [
        FieldFamily::Text,
        FieldFamily::Subtitle,
        FieldFamily::Footnote,
        FieldFamily::ChapterTitle,
    ];

    fn prefix(self) -> &'static str {
        match self {
            FieldFamily::Text => "verse_text",
            FieldFamily::Subtitle => "verse_subtitle",
            FieldFamily::Footnote => "verse_footnote",
            FieldFamily::ChapterTitle => "chapter_title",
        }
    }
}

lazy_static! {
    static ref FIELD_TABLE: HashMap<(Language, FieldFamily), String> = {
        let mut table = HashMap::new();
        for lang in Language::ALL {
            for family in FieldFamily::ALL {
                table.insert((lang, family), format!("{}_{}", family.prefix(), lang.name()));
            }
        }
        table
    };
}

/// Field name carrying `family` in `lang`, e.g. `verse_text_french`.
pub fn field_name(lang: Language, family: FieldFamily) -> &'static str {
    FIELD_TABLE
        .get(&(lang, family))
        .map(String::as_str)
        .unwrap_or_else(|| family.prefix())
}

/// Resolve `family` in `lang` for a record.
///
/// Order: the joined enrichment row (foreign-language record with the same
/// `verse_id`), then the record itself, then the record's English field.
/// Null values count as absent. The English fallback may itself be null for
/// subtitles and footnotes, in which case the result is `None`.
pub fn resolve(
    record: &Row,
    lang: Language,
    family: FieldFamily,
    enrichment: Option<&Row>,
) -> Option<String> {
    let key = field_name(lang, family);
    if let Some(value) = enrichment.and_then(|row| row.get(key)).and_then(text) {
        return Some(value);
    }
    if let Some(value) = record.get(key).and_then(text) {
        return Some(value);
    }
    record
        .get(field_name(Language::English, family))
        .and_then(text)
}
