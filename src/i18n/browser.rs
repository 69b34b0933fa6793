//! Browser language detection from the `Accept-Language` header.

use crate::i18n::LanguageCatalog;
use regex::Regex;
use std::sync::OnceLock;

static ACCEPT_LANGUAGE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Step between synthetic priorities of entries without a `q` value.
const SYNTHETIC_STEP: f64 = 0.001;

/// A language tag from `Accept-Language` with its priority.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    /// Tag with `-` normalized to `_` (e.g., "fr_CA")
    pub tag: String,
    pub priority: f64,
}

/// Parse an `Accept-Language` header into preferences, highest first.
///
/// Entries without an explicit `q` get `1.0, 0.999, 0.998, …` in header
/// order. Equal priorities keep header order. A header with no usable
/// entry yields an empty list.
pub fn parse_accept_language(header: &str) -> Vec<LanguagePreference> {
    let regex = ACCEPT_LANGUAGE_REGEX
        .get_or_init(|| Regex::new(r"([^;,]+)(;[^,0-9]*([0-9.]+)[^,]*)?").unwrap());

    let mut synthetic = 1.0_f64;
    let mut preferences: Vec<LanguagePreference> = Vec::new();

    for captures in regex.captures_iter(header) {
        let tag = captures[1].trim();
        if tag.is_empty() {
            continue;
        }

        let priority = match captures.get(3) {
            Some(q) => parse_quality(q.as_str()),
            None => {
                let p = synthetic;
                synthetic -= SYNTHETIC_STEP;
                p
            }
        };

        let tag = tag.replace('-', "_");
        // A repeated tag keeps its latest priority, at its first position
        if let Some(existing) = preferences.iter_mut().find(|p| p.tag == tag) {
            existing.priority = priority;
        } else {
            preferences.push(LanguagePreference { tag, priority });
        }
    }

    // sort_by is stable, so header order breaks ties
    preferences.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    preferences
}

/// Leading numeric prefix of a quality value; anything unparsable is 0.
fn parse_quality(raw: &str) -> f64 {
    let end = raw
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .nth(1)
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().unwrap_or(0.0)
}

/// Pick the first preferred tag the catalog can serve, as a slug.
///
/// A tag matches either an enabled slug directly ("fr") or the locale of an
/// enabled language ("fr_FR" → "fr").
pub fn detect_browser_language(header: Option<&str>, catalog: &LanguageCatalog) -> Option<String> {
    let header = header?;

    parse_accept_language(header)
        .into_iter()
        .find_map(|preference| {
            if let Some(lang) = catalog.by_slug(&preference.tag) {
                return Some(lang.slug.clone());
            }
            catalog
                .by_locale(&preference.tag)
                .filter(|lang| lang.enabled)
                .map(|lang| lang.slug.clone())
        })
}
