//! Small HTML fragments and admin redirect helpers emitted by the host.

use crate::i18n::LanguageCatalog;
use crate::request::LANG_PARAM;
use crate::rewrite::UrlRewriter;
use url::Url;

/// Query argument selecting the language being edited in the admin.
pub const EDIT_LANG_PARAM: &str = "edit_lang";

/// One `<link rel="alternate" hreflang>` tag per enabled language.
pub fn hreflang_links(catalog: &LanguageCatalog, rewriter: &UrlRewriter<'_>, current_url: &str) -> String {
    catalog
        .enabled()
        .map(|lang| {
            format!(
                r#"<link rel="alternate" hreflang="{}" href="{}"/>"#,
                escape_attr(&lang.slug),
                escape_attr(&rewriter.rewrite(current_url, &lang.slug))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hidden form field carrying the language of a content-edit form.
pub fn hidden_lang_field(slug: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        LANG_PARAM,
        escape_attr(slug)
    )
}

/// Keep the edited language selected after saving a post.
///
/// Adds (or replaces) `edit_lang` on `location` when a language was posted.
/// Locations that are not absolute URLs are returned unchanged.
pub fn redirect_after_save(location: &str, posted_lang: Option<&str>) -> String {
    let Some(lang) = posted_lang.map(str::trim).filter(|l| !l.is_empty()) else {
        return location.to_string();
    };
    let Ok(mut url) = Url::parse(location) else {
        return location.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != EDIT_LANG_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(EDIT_LANG_PARAM, lang);
    url.to_string()
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
