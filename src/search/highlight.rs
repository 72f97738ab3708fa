//! Marks query terms inside resolved text for markdown or HTML rendering
use clap::ValueEnum;
use lazy_static::lazy_static;
use lru::LruCache;
use parking_lot::Mutex;
use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Stands in for emphasis markers already present in the source text so
/// they cannot collide with the markers inserted here.
pub const MARKER_PLACEHOLDER: &str = "±";

const HTML_OPEN: &str = r#"<span class="text-red-800"><b>"#;
const HTML_CLOSE: &str = "</b></span>";

lazy_static! {
    static ref ASTERISKS: Regex = Regex::new(r"\*+").unwrap();
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightMode {
    #[default]
    Markdown,
    Html,
}

/// Highlighter with a bounded cache of compiled query patterns.
pub struct Highlighter {
    patterns: Mutex<LruCache<String, Arc<Option<Regex>>>>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(128)
    }
}

impl Highlighter {
    pub fn new(cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            patterns: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Wrap every occurrence of the query's tokens in `text`.
    ///
    /// Returns `None` for absent or empty text; otherwise always returns the
    /// marker-normalized text, even if nothing matched.
    pub fn highlight(&self, query: &str, text: Option<&str>, mode: HighlightMode) -> Option<String> {
        let text = text.filter(|t| !t.is_empty())?;
        let normalized = normalize_markers(text, mode);

        let pattern = self.pattern(query);
        let Some(regex) = &*pattern else {
            return Some(normalized);
        };

        let highlighted = regex.replace_all(&normalized, |caps: &Captures| match mode {
            HighlightMode::Markdown => format!("**{}**", &caps[0]),
            HighlightMode::Html => format!("{HTML_OPEN}{}{HTML_CLOSE}", &caps[0]),
        });
        Some(highlighted.into_owned())
    }

    fn pattern(&self, query: &str) -> Arc<Option<Regex>> {
        let mut cache = self.patterns.lock();
        if let Some(found) = cache.get(query) {
            return found.clone();
        }
        let compiled = Arc::new(compile(query));
        cache.put(query.to_string(), compiled.clone());
        compiled
    }
}

/// Tokens at word boundaries, or the whole query starting at a word boundary.
fn compile(query: &str) -> Option<Regex> {
    let tokens: Vec<String> = query.split_whitespace().map(regex::escape).collect();
    if tokens.is_empty() {
        return None;
    }
    let phrase = regex::escape(query.trim());
    let pattern = format!(r"\b(?:{})\b|\b(?:{phrase})", tokens.join("|"));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::warn!("Could not compile highlight pattern for {query:?}: {e}");
            None
        }
    }
}

/// Replace existing single or double asterisk runs; longer runs are left alone.
fn normalize_markers(text: &str, mode: HighlightMode) -> String {
    let replacement = match mode {
        HighlightMode::Markdown => MARKER_PLACEHOLDER,
        HighlightMode::Html => "*",
    };
    let replaced = ASTERISKS.replace_all(text, |caps: &Captures| {
        if caps[0].len() <= 2 {
            replacement.to_string()
        } else {
            caps[0].to_string()
        }
    });

    match mode {
        HighlightMode::Markdown => replaced.into_owned(),
        HighlightMode::Html => escape_html(&replaced),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Uncached convenience wrapper around [`Highlighter::highlight`].
pub fn highlight(query: &str, text: Option<&str>, mode: HighlightMode) -> Option<String> {
    Highlighter::new(1).highlight(query, text, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_markers_are_replaced() {
        let out = highlight("light", Some("*Light* upon **light**"), HighlightMode::Markdown).unwrap();
        assert_eq!(out, "±**Light**± upon ±**light**±");
    }

    #[test]
    fn test_long_asterisk_runs_untouched() {
        let out = highlight("zzz", Some("a *** b"), HighlightMode::Markdown).unwrap();
        assert_eq!(out, "a *** b");
    }

    #[test]
    fn test_word_boundaries() {
        let out = highlight("light", Some("delight and light"), HighlightMode::Markdown).unwrap();
        assert_eq!(out, "delight and **light**");
    }

    #[test]
    fn test_html_mode_escapes_source() {
        let out = highlight("light", Some("<light> & dark"), HighlightMode::Html).unwrap();
        assert_eq!(
            out,
            r#"&lt;<span class="text-red-800"><b>light</b></span>&gt; &amp; dark"#
        );
    }

    #[test]
    fn test_cache_reuses_patterns() {
        let h = Highlighter::new(2);
        let a = h.highlight("god", Some("GOD is great"), HighlightMode::Markdown);
        let b = h.highlight("god", Some("GOD is great"), HighlightMode::Markdown);
        assert_eq!(a, b);
        assert_eq!(a.as_deref(), Some("**GOD** is great"));
        assert_eq!(h.patterns.lock().len(), 1);
    }
}
