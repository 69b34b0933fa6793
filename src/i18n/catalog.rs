//! Language catalog: the set of languages the site serves.
//!
//! Built explicitly from stored options plus installed locale packs. When
//! installed locales are discovered that have no stored option, they are
//! added and the option record is written back once.

use crate::error::{Result, RouterError};
use crate::i18n::{AvailableTranslations, Language, LanguageOption};
use crate::store::{OptionStore, DEFAULT_LOCALE_OPTION, LANGUAGES_OPTION};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Locale used when no default has been configured.
pub const SYSTEM_DEFAULT_LOCALE: &str = "en_US";

/// Ordered locale → language mapping plus the default locale.
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    languages: Vec<Language>,
    default_locale: String,
}

/// Result of merging stored options with installed locales.
#[derive(Debug, Clone)]
pub struct CatalogLoad {
    pub catalog: LanguageCatalog,

    /// Updated option record, present only when the merge added entries.
    pub updated_options: Option<Map<String, Value>>,
}

impl LanguageCatalog {
    /// Merge stored options with installed locales.
    ///
    /// Every stored option keeps its `enable` flag. Installed locales missing
    /// from the options are added as enabled languages with metadata from
    /// `translations` (or the locale code itself when nothing is known).
    pub fn load(
        options: &Map<String, Value>,
        installed_locales: &[String],
        translations: &AvailableTranslations,
        default_locale: Option<&str>,
    ) -> Result<CatalogLoad> {
        let default_locale = default_locale
            .filter(|locale| !locale.is_empty())
            .unwrap_or(SYSTEM_DEFAULT_LOCALE)
            .to_string();

        let mut languages = Vec::with_capacity(options.len() + installed_locales.len());
        for (locale, raw) in options {
            let option: LanguageOption =
                serde_json::from_value(raw.clone()).map_err(|e| RouterError::MalformedOption {
                    key: format!("{}[{}]", LANGUAGES_OPTION, locale),
                    reason: e.to_string(),
                })?;
            languages.push(Language::from_option(locale, &option));
        }

        let mut added = Vec::new();
        for locale in installed_locales {
            if languages.iter().any(|lang| &lang.locale == locale) {
                continue;
            }
            let language = discovered_language(locale, translations);
            debug!("Discovered installed locale {} (slug {})", locale, language.slug);
            languages.push(language);
            added.push(locale.as_str());
        }

        let mut catalog = LanguageCatalog {
            languages,
            default_locale,
        };
        catalog.enforce_invariants(translations);

        // Written back after the invariants so the stored flags match the catalog
        let updated_options = if added.is_empty() {
            None
        } else {
            let mut updated = options.clone();
            for lang in catalog
                .languages
                .iter()
                .filter(|lang| added.contains(&lang.locale.as_str()))
            {
                updated.insert(lang.locale.clone(), serde_json::to_value(lang.to_option())?);
            }
            Some(updated)
        };

        Ok(CatalogLoad {
            catalog,
            updated_options,
        })
    }

    /// Load from an option store, persisting newly discovered locales.
    ///
    /// A failed write is logged and ignored: the computed catalog is the
    /// same regardless, and the next load retries the write.
    pub fn load_from_store(
        store: &dyn OptionStore,
        installed_locales: &[String],
        translations: &AvailableTranslations,
    ) -> Result<LanguageCatalog> {
        let options = match store.get_option(LANGUAGES_OPTION)? {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RouterError::MalformedOption {
                    key: LANGUAGES_OPTION.to_string(),
                    reason: "expected an object keyed by locale".to_string(),
                })
            }
        };

        let default_locale = store
            .get_option(DEFAULT_LOCALE_OPTION)?
            .and_then(|value| value.as_str().map(str::to_string));

        let load = Self::load(
            &options,
            installed_locales,
            translations,
            default_locale.as_deref(),
        )?;

        if let Some(updated) = load.updated_options {
            info!(
                "Persisting {} language options after merging installed locales",
                updated.len()
            );
            if let Err(e) = store.set_option(LANGUAGES_OPTION, Value::Object(updated)) {
                warn!("Failed to persist merged language options: {}", e);
            }
        }

        Ok(load.catalog)
    }

    /// Default locale, guaranteed to name an enabled language.
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// The default language.
    pub fn default_language(&self) -> &Language {
        // enforce_invariants guarantees presence
        self.languages
            .iter()
            .find(|lang| lang.locale == self.default_locale)
            .unwrap_or(&self.languages[0])
    }

    /// Slug of the default language; never shown in URLs.
    pub fn default_slug(&self) -> &str {
        &self.default_language().slug
    }

    /// All languages in catalog order, including disabled ones.
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Enabled languages in catalog order.
    pub fn enabled(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter().filter(|lang| lang.enabled)
    }

    /// Slugs of every enabled language.
    pub fn enabled_slugs(&self) -> HashSet<&str> {
        self.enabled().map(|lang| lang.slug.as_str()).collect()
    }

    pub fn is_enabled_slug(&self, slug: &str) -> bool {
        self.enabled().any(|lang| lang.slug == slug)
    }

    pub fn by_locale(&self, locale: &str) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.locale == locale)
    }

    /// Enabled language with the given slug.
    pub fn by_slug(&self, slug: &str) -> Option<&Language> {
        self.enabled().find(|lang| lang.slug == slug)
    }

    /// A language with this slug exists but is switched off.
    pub fn is_disabled_slug(&self, slug: &str) -> bool {
        !self.is_enabled_slug(slug) && self.languages.iter().any(|lang| lang.slug == slug)
    }

    fn enforce_invariants(&mut self, translations: &AvailableTranslations) {
        match self
            .languages
            .iter_mut()
            .find(|lang| lang.locale == self.default_locale)
        {
            Some(lang) if !lang.enabled => {
                warn!(
                    "Default locale {} is disabled in options; serving it anyway",
                    lang.locale
                );
                lang.enabled = true;
            }
            Some(_) => {}
            None => {
                debug!(
                    "Default locale {} has no language entry, adding a pseudo-language",
                    self.default_locale
                );
                let pseudo = discovered_language(&self.default_locale, translations);
                self.languages.insert(0, pseudo);
            }
        }

        // Slugs must be unique among enabled languages; the default wins,
        // then catalog order.
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(self.default_slug().to_string());
        let default_locale = self.default_locale.clone();
        for lang in self.languages.iter_mut().filter(|lang| lang.enabled) {
            if lang.locale == default_locale {
                continue;
            }
            if !seen.insert(lang.slug.clone()) {
                warn!(
                    "Slug '{}' of {} is already used by another language; disabling it",
                    lang.slug, lang.locale
                );
                lang.enabled = false;
            }
        }
    }
}

fn discovered_language(locale: &str, translations: &AvailableTranslations) -> Language {
    match translations.get(locale) {
        Some(info) => {
            let iso = info.primary_iso().unwrap_or(locale).to_string();
            Language {
                locale: locale.to_string(),
                slug: iso.clone(),
                name: info.native_name.clone(),
                flag: iso,
                enabled: true,
            }
        }
        None => Language {
            locale: locale.to_string(),
            slug: locale.to_string(),
            name: locale.to_string(),
            flag: locale.to_string(),
            enabled: true,
        },
    }
}
