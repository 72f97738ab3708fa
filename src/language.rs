//! Language code/name canonicalization
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every language the corpus carries fields for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Turkish,
    French,
    German,
    Bahasa,
    Persian,
    Tamil,
    Swedish,
    Russian,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::English,
        Language::Turkish,
        Language::French,
        Language::German,
        Language::Bahasa,
        Language::Persian,
        Language::Tamil,
        Language::Swedish,
        Language::Russian,
    ];

    /// Canonical lowercase full name, also the suffix of per-language fields.
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Turkish => "turkish",
            Language::French => "french",
            Language::German => "german",
            Language::Bahasa => "bahasa",
            Language::Persian => "persian",
            Language::Tamil => "tamil",
            Language::Swedish => "swedish",
            Language::Russian => "russian",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Turkish => "tr",
            Language::French => "fr",
            Language::German => "de",
            Language::Bahasa => "id",
            Language::Persian => "fa",
            Language::Tamil => "ta",
            Language::Swedish => "se",
            Language::Russian => "ru",
        }
    }

    fn lookup(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == value || lang.name() == value)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a short code (`fr`) or full name (`French`) to a [`Language`].
///
/// Unknown, empty or malformed input resolves to English; this never fails.
pub fn canonicalize(code_or_name: &str) -> Language {
    let needle = code_or_name.trim().to_lowercase();
    Language::lookup(&needle).unwrap_or_default()
}
