//! Rendering of query results for the terminal
use crate::catalog::QueryResult;
use crate::error::Result;
use crate::fields::{self, FieldFamily};
use crate::language::{self, Language};
use crate::record::RowExt;
use crate::search::MARKER_PLACEHOLDER;
use clap::ValueEnum;
use colored::Colorize;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref EMPHASIS: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub struct OutputFormatter {
    format: OutputFormat,
    use_color: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            use_color: is_terminal::is_terminal(&std::io::stdout()),
        }
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn format_result(&self, result: &QueryResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
            OutputFormat::Text => Ok(self.format_text(result)),
        }
    }

    fn format_text(&self, result: &QueryResult) -> String {
        let lang = display_language(result);
        let mut output = String::new();

        if self.use_color {
            output.push_str(&format!("{}\n\n", result.message.bold()));
        } else {
            output.push_str(&format!("{}\n\n", result.message));
        }

        for row in &result.response.data {
            if let Some(subtitle) = fields::resolve(row, lang, FieldFamily::Subtitle, None) {
                output.push_str(&format!("  {}\n", self.paint_subtitle(&subtitle)));
            }

            let reference = row.verse_id().unwrap_or_else(|| "?".to_string());
            let text = fields::resolve(row, lang, FieldFamily::Text, None).unwrap_or_default();
            output.push_str(&format!(
                "[{}] {}\n",
                self.paint_reference(&reference),
                self.emphasize(&text)
            ));

            if let Some(footnote) = fields::resolve(row, lang, FieldFamily::Footnote, None) {
                output.push_str(&format!("  {}\n", self.paint_footnote(&footnote)));
            }
            if let Some(words) = row.get("word_by_word").and_then(|v| v.as_array()) {
                output.push_str(&format!("  ({} words)\n", words.len()));
            }
        }

        output.push_str(&format!("\n{}\n", result.response.copyright.text));
        output
    }

    fn paint_reference(&self, reference: &str) -> String {
        if self.use_color {
            reference.cyan().to_string()
        } else {
            reference.to_string()
        }
    }

    fn paint_subtitle(&self, subtitle: &str) -> String {
        let subtitle = self.emphasize(subtitle);
        if self.use_color {
            subtitle.italic().to_string()
        } else {
            subtitle
        }
    }

    fn paint_footnote(&self, footnote: &str) -> String {
        let footnote = self.emphasize(footnote);
        if self.use_color {
            footnote.dimmed().to_string()
        } else {
            footnote
        }
    }

    /// Turn `**term**` highlight markers into terminal color, and put back
    /// the source text's own asterisks.
    fn emphasize(&self, text: &str) -> String {
        let text = if self.use_color {
            EMPHASIS
                .replace_all(text, |caps: &Captures| caps[1].yellow().bold().to_string())
                .into_owned()
        } else {
            text.to_string()
        };
        text.replace(MARKER_PLACEHOLDER, "*")
    }
}

/// Search results are shown in the search language, anything else in the
/// included language if one was requested.
fn display_language(result: &QueryResult) -> Language {
    let options = &result.request.parsed_options;
    if let Some(search) = &options.search {
        return language::canonicalize(&search.search_language);
    }
    options
        .include_language
        .as_deref()
        .map(language::canonicalize)
        .unwrap_or_default()
}
