//! Metadata about installable translations.
//!
//! Used when an installed locale has no stored language option yet: its
//! slug, flag and display name are derived from this table.

use serde::Deserialize;
use std::collections::HashMap;

/// Metadata for one installable locale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslationInfo {
    /// Name of the language in that language (e.g., "Deutsch")
    pub native_name: String,

    /// ISO 639 codes, most specific first (e.g., ["de"])
    pub iso: Vec<String>,
}

impl TranslationInfo {
    /// First ISO code, used as slug and flag for newly discovered locales.
    pub fn primary_iso(&self) -> Option<&str> {
        self.iso.first().map(String::as_str)
    }
}

/// Locale → metadata lookup.
#[derive(Debug, Clone, Default)]
pub struct AvailableTranslations {
    entries: HashMap<String, TranslationInfo>,
}

impl AvailableTranslations {
    /// Build from explicit entries. `en_US` is always present.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, TranslationInfo)>,
    {
        let mut entries: HashMap<_, _> = entries.into_iter().collect();
        entries.insert("en_US".to_string(), english_us());
        Self { entries }
    }

    /// The built-in table of common locales.
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN
                .iter()
                .map(|(locale, native_name, iso)| {
                    (
                        locale.to_string(),
                        TranslationInfo {
                            native_name: native_name.to_string(),
                            iso: vec![iso.to_string()],
                        },
                    )
                }),
        )
    }

    pub fn get(&self, locale: &str) -> Option<&TranslationInfo> {
        self.entries.get(locale)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn english_us() -> TranslationInfo {
    TranslationInfo {
        native_name: "English (US)".to_string(),
        iso: vec!["en".to_string()],
    }
}

const BUILTIN: &[(&str, &str, &str)] = &[
    ("ar", "العربية", "ar"),
    ("bg_BG", "Български", "bg"),
    ("ca", "Català", "ca"),
    ("cs_CZ", "Čeština", "cs"),
    ("da_DK", "Dansk", "da"),
    ("de_DE", "Deutsch", "de"),
    ("el", "Ελληνικά", "el"),
    ("en_GB", "English (UK)", "en"),
    ("es_ES", "Español", "es"),
    ("fi", "Suomi", "fi"),
    ("fr_FR", "Français", "fr"),
    ("he_IL", "עִבְרִית", "he"),
    ("hu_HU", "Magyar", "hu"),
    ("it_IT", "Italiano", "it"),
    ("ja", "日本語", "ja"),
    ("ko_KR", "한국어", "ko"),
    ("nl_NL", "Nederlands", "nl"),
    ("pl_PL", "Polski", "pl"),
    ("pt_BR", "Português do Brasil", "pt"),
    ("pt_PT", "Português", "pt"),
    ("ro_RO", "Română", "ro"),
    ("ru_RU", "Русский", "ru"),
    ("sv_SE", "Svenska", "sv"),
    ("tr_TR", "Türkçe", "tr"),
    ("uk", "Українська", "uk"),
    ("zh_CN", "简体中文", "zh"),
];
