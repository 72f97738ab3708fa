#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use versekeep::sync::{MemoryRemoteSource, MemorySnapshotSource};
use versekeep::{Catalog, CatalogOptions, DatasetKind, Metrics, Row};

pub fn rows(value: Value) -> Vec<Row> {
    serde_json::from_value(value).expect("fixture rows are objects")
}

/// Deliberately out of reading order.
pub fn verses() -> Vec<Row> {
    rows(json!([
        {
            "verse_id": "24:35", "verse_index": 2826, "chapter_number": 24, "verse_number": 35,
            "verse_text_english": "GOD is the light of the heavens and the earth. The allegory of His light is that of a concave niche. Light upon light.",
            "verse_subtitle_english": "GOD's Light",
            "verse_footnote_english": null,
            "chapter_title_english": "Light"
        },
        {
            "verse_id": "1:1", "verse_index": 1, "chapter_number": 1, "verse_number": 1,
            "verse_text_english": "In the name of GOD, Most Gracious, Most Merciful.",
            "verse_subtitle_english": "The Key",
            "verse_footnote_english": "*1:1 The first verse consists of 19 letters.",
            "chapter_title_english": "The Key"
        },
        {
            "verse_id": "1:3", "verse_index": 3, "chapter_number": 1, "verse_number": 3,
            "verse_text_english": "Most Gracious, Most Merciful.",
            "verse_subtitle_english": null,
            "verse_footnote_english": null,
            "chapter_title_english": "The Key"
        },
        {
            "verse_id": "1:2", "verse_index": 2, "chapter_number": 1, "verse_number": 2,
            "verse_text_english": "Praise be to GOD, Lord of the universe.",
            "verse_subtitle_english": null,
            "verse_footnote_english": null,
            "chapter_title_english": "The Key"
        },
        {
            "verse_id": "2:1", "verse_index": 8, "chapter_number": 2, "verse_number": 1,
            "verse_text_english": "A.L.M.",
            "verse_subtitle_english": null,
            "verse_footnote_english": "*2:1 These letters remained a divinely guarded secret for centuries.",
            "chapter_title_english": "The Heifer"
        },
        {
            "verse_id": "2:2", "verse_index": 9, "chapter_number": 2, "verse_number": 2,
            "verse_text_english": "This scripture is infallible; a beacon for the righteous;",
            "verse_subtitle_english": null,
            "verse_footnote_english": null,
            "chapter_title_english": "The Heifer"
        },
        {
            "verse_id": "9:1", "verse_index": 1236, "chapter_number": 9, "verse_number": 1,
            "verse_text_english": "An ultimatum is hereby issued from GOD and His messenger.",
            "verse_subtitle_english": "No Basmalah",
            "verse_footnote_english": null,
            "chapter_title_english": "Ultimatum"
        },
        {
            "verse_id": "9:2", "verse_index": 1237, "chapter_number": 9, "verse_number": 2,
            "verse_text_english": "Therefore, roam the earth freely for four months.",
            "verse_subtitle_english": null,
            "verse_footnote_english": null,
            "chapter_title_english": "Ultimatum"
        },
        {
            "verse_id": "9:3", "verse_index": 1238, "chapter_number": 9, "verse_number": 3,
            "verse_text_english": "A proclamation is hereby issued from GOD and His messenger to all the people.",
            "verse_subtitle_english": null,
            "verse_footnote_english": null,
            "chapter_title_english": "Ultimatum"
        }
    ]))
}

pub fn foreign() -> Vec<Row> {
    rows(json!([
        {
            "verse_id": "1:1", "global_index": 1,
            "verse_text_french": "Au nom de DIEU, Le Très Gracieux, Le Très Miséricordieux.",
            "verse_subtitle_french": "La Clé",
            "verse_footnote_french": null,
            "chapter_title_french": "La Clé",
            "verse_text_turkish": null
        },
        {
            "verse_id": "24:35", "global_index": 2826,
            "verse_text_french": "DIEU est la lumière des cieux et de la terre. Lumière sur lumière.",
            "verse_subtitle_french": null,
            "verse_footnote_french": null,
            "chapter_title_french": "La Lumière",
            "verse_text_turkish": "TANRI göklerin ve yerin ışığıdır."
        }
    ]))
}

pub fn word_by_word() -> Vec<Row> {
    rows(json!([
        { "verse_id": "1:2", "global_index": 5, "word_english": "praise" },
        { "verse_id": "1:1", "global_index": 2, "word_english": "name" },
        { "verse_id": "1:1", "global_index": 1, "word_english": "in" },
        { "verse_id": "1:1", "global_index": 3, "word_english": "GOD" },
        { "verse_id": "99:99", "global_index": 9999, "word_english": "orphan" }
    ]))
}

pub fn chapters() -> Vec<Row> {
    rows(json!([
        { "chapter_number": 9, "chapter_title_english": "Ultimatum" },
        { "chapter_number": 1, "chapter_title_english": "The Key" },
        { "chapter_number": 24, "chapter_title_english": "Light" },
        { "chapter_number": 2, "chapter_title_english": "The Heifer" }
    ]))
}

fn tables() -> Vec<(DatasetKind, Vec<Row>)> {
    vec![
        (DatasetKind::Quran, verses()),
        (DatasetKind::WordByWord, word_by_word()),
        (DatasetKind::Chapters, chapters()),
        (DatasetKind::Foreign, foreign()),
    ]
}

pub fn memory_snapshots() -> MemorySnapshotSource {
    tables()
        .into_iter()
        .fold(MemorySnapshotSource::new(), |source, (kind, rows)| {
            source.with_table(kind.table(), rows)
        })
}

/// Remote answering every table with the fixture rows.
pub fn memory_remote() -> MemoryRemoteSource {
    tables()
        .into_iter()
        .fold(MemoryRemoteSource::new(), |remote, (kind, rows)| {
            remote.with_table(kind.table(), rows)
        })
}

/// Write every fixture table as `<dir>/<table>.json`.
pub fn write_snapshot_dir(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (kind, rows) in tables() {
        let body = serde_json::to_string_pretty(&rows).unwrap();
        fs::write(dir.join(format!("{}.json", kind.table())), body).unwrap();
    }
}

/// A bootstrapped catalog over the fixture corpus with no remote.
pub fn local_catalog() -> Catalog {
    local_catalog_with(CatalogOptions::default())
}

pub fn local_catalog_with(options: CatalogOptions) -> Catalog {
    let catalog = Catalog::new(
        Arc::new(memory_snapshots()),
        None,
        options,
        Arc::new(Metrics::new()),
    );
    catalog.initialize_all();
    catalog
}
