//! Language type and its stored option representation.

use serde::{Deserialize, Deserializer, Serialize};

/// A language the site can serve.
///
/// Keyed by `locale` in the catalog. The `slug` is what appears in URLs and
/// cookies and must be unique among enabled languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Full locale identifier (e.g., "en_US", "fr_FR")
    pub locale: String,

    /// Short URL-safe code (e.g., "en", "fr")
    pub slug: String,

    /// Human readable name, usually the native name (e.g., "Français")
    pub name: String,

    /// Flag icon identifier
    pub flag: String,

    /// Whether this language is served
    pub enabled: bool,
}

impl Language {
    /// Build the language from its stored option entry.
    pub fn from_option(locale: &str, option: &LanguageOption) -> Self {
        Self {
            locale: locale.to_string(),
            slug: option.slug.clone(),
            name: option.name.clone(),
            flag: option.flag.clone(),
            enabled: option.enable,
        }
    }

    /// Stored option entry for this language.
    pub fn to_option(&self) -> LanguageOption {
        LanguageOption {
            name: self.name.clone(),
            slug: self.slug.clone(),
            flag: self.flag.clone(),
            enable: self.enabled,
        }
    }
}

/// One entry of the `wpm_languages` option.
///
/// `enable` is accepted either as a boolean or as `0`/`1`, since older
/// option records store it as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    #[serde(default)]
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub enable: bool,
}

fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Str(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
    })
}
