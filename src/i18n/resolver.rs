//! Per-request language resolution from competing signals.

use crate::i18n::LanguageCatalog;
use crate::request::{
    strip_home, CookieWrite, RequestContext, ADMIN_LANGUAGE_COOKIE, LANG_PARAM,
    MONTH_IN_SECONDS,
};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

static PATH_PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();

/// Which signal decided the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Param,
    Referrer,
    Path,
    Cookie,
    Default,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Param => "param",
            Signal::Referrer => "referrer",
            Signal::Path => "path",
            Signal::Cookie => "cookie",
            Signal::Default => "default",
        }
    }
}

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved slug; always an enabled slug of the catalog
    pub slug: String,

    pub source: Signal,

    /// Enabled language slug found as the first segment of the request path
    pub path_prefix: Option<String>,

    /// Path prefix naming a language that exists but is disabled
    pub unavailable: Option<String>,

    /// Background request issued from a front-end page
    pub frontend_origin: bool,

    pub cookies: Vec<CookieWrite>,
}

/// Two-letter language segment at the start of `path`, lowercased.
pub fn language_prefix(path: &str) -> Option<String> {
    let regex =
        PATH_PREFIX_REGEX.get_or_init(|| Regex::new(r"(?i)^/([a-z]{2})(?:[/?#]|$)").unwrap());
    regex
        .captures(path)
        .map(|captures| captures[1].to_ascii_lowercase())
}

/// Computes the requesting user's language.
#[derive(Debug, Clone, Copy)]
pub struct SignalResolver<'a> {
    catalog: &'a LanguageCatalog,
    home_url: &'a str,
    admin_path: &'a str,
}

impl<'a> SignalResolver<'a> {
    pub fn new(catalog: &'a LanguageCatalog, home_url: &'a str, admin_path: &'a str) -> Self {
        Self {
            catalog,
            home_url,
            admin_path,
        }
    }

    /// Resolve the language for `ctx`.
    ///
    /// Priority: valid `lang` parameter, then (background requests) the
    /// referrer's path prefix, then (front end) the request's own path
    /// prefix, then (admin) the `language` cookie, then the default.
    /// `now` is the current Unix time, used for cookie expiry.
    pub fn resolve(&self, ctx: &RequestContext, now: i64) -> Resolution {
        let mut cookies = Vec::new();
        let default_slug = self.catalog.default_slug().to_string();

        let own_prefix = if ctx.is_admin {
            None
        } else {
            language_prefix(&ctx.raw_path)
        };
        let path_prefix = own_prefix
            .clone()
            .filter(|slug| self.catalog.is_enabled_slug(slug));
        let disabled_prefix = own_prefix.filter(|slug| self.catalog.is_disabled_slug(slug));
        let mut unavailable = None;
        let frontend_origin = ctx.is_async && !self.referrer_is_admin(ctx);

        let mut resolved = None;

        if let Some(lang) = ctx.param(LANG_PARAM).map(str::trim) {
            if self.catalog.is_enabled_slug(lang) {
                if ctx.is_admin_page() {
                    cookies.push(CookieWrite::new(
                        ADMIN_LANGUAGE_COOKIE,
                        lang,
                        now + MONTH_IN_SECONDS,
                    ));
                }
                resolved = Some((lang.to_string(), Signal::Param));
            } else {
                debug!("Ignoring unknown lang parameter '{}'", lang);
            }
        }

        if resolved.is_none() && ctx.is_async {
            resolved = self
                .referrer_language(ctx)
                .map(|slug| (slug, Signal::Referrer));
        }

        if resolved.is_none() && !ctx.is_admin {
            resolved = path_prefix.clone().map(|slug| (slug, Signal::Path));
            // Only a disabled prefix that would have decided the request is unavailable
            unavailable = disabled_prefix;
        }

        if resolved.is_none() && ctx.is_admin_page() {
            match ctx.cookie(ADMIN_LANGUAGE_COOKIE) {
                Some(value) if self.catalog.is_enabled_slug(value.trim()) => {
                    resolved = Some((value.trim().to_string(), Signal::Cookie));
                }
                Some(value) => {
                    debug!("Ignoring stale admin language cookie '{}'", value);
                }
                None => {
                    cookies.push(CookieWrite::new(
                        ADMIN_LANGUAGE_COOKIE,
                        &default_slug,
                        now + MONTH_IN_SECONDS,
                    ));
                }
            }
        }

        let (slug, source) = resolved.unwrap_or((default_slug, Signal::Default));
        debug!("Resolved language '{}' from {}", slug, source.as_str());

        Resolution {
            slug,
            source,
            path_prefix,
            unavailable,
            frontend_origin,
            cookies,
        }
    }

    fn admin_url(&self) -> String {
        format!(
            "{}/{}",
            self.home_url.trim_end_matches('/'),
            self.admin_path.trim_start_matches('/')
        )
    }

    fn referrer_is_admin(&self, ctx: &RequestContext) -> bool {
        ctx.referrer
            .as_deref()
            .is_some_and(|referrer| referrer.starts_with(&self.admin_url()))
    }

    fn referrer_language(&self, ctx: &RequestContext) -> Option<String> {
        let referrer = ctx.referrer.as_deref()?;
        if self.referrer_is_admin(ctx) {
            return None;
        }
        let Some(rest) = strip_home(referrer, self.home_url.trim_end_matches('/')) else {
            debug!("Ignoring referrer outside the site: {}", referrer);
            return None;
        };
        language_prefix(rest).filter(|slug| self.catalog.is_enabled_slug(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::AvailableTranslations;
    use serde_json::{json, Value};

    const HOME: &str = "https://example.com";
    const ADMIN: &str = "/wp-admin";
    const NOW: i64 = 1_700_000_000;

    fn catalog() -> LanguageCatalog {
        let Value::Object(options) = json!({
            "en_US": {"name": "English", "slug": "en", "flag": "us", "enable": 1},
            "fr_FR": {"name": "Français", "slug": "fr", "flag": "fr", "enable": 1},
            "de_DE": {"name": "Deutsch", "slug": "de", "flag": "de", "enable": 0},
        }) else {
            unreachable!()
        };
        LanguageCatalog::load(&options, &[], &AvailableTranslations::builtin(), None)
            .unwrap()
            .catalog
    }

    fn resolve(ctx: &RequestContext) -> Resolution {
        let catalog = catalog();
        SignalResolver::new(&catalog, HOME, ADMIN).resolve(ctx, NOW)
    }

    fn url(path: &str) -> String {
        format!("{}{}", HOME, path)
    }

    // ==================== language_prefix Tests ====================

    #[test]
    fn test_language_prefix() {
        assert_eq!(language_prefix("/fr/about"), Some("fr".to_string()));
        assert_eq!(language_prefix("/fr"), Some("fr".to_string()));
        assert_eq!(language_prefix("/FR/"), Some("fr".to_string()));
        assert_eq!(language_prefix("/fr?x=1"), Some("fr".to_string()));
        assert_eq!(language_prefix("/fra/about"), None);
        assert_eq!(language_prefix("/about"), None);
        assert_eq!(language_prefix(""), None);
    }

    // ==================== Param Tests ====================

    #[test]
    fn test_param_beats_cookie() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/edit.php"))
            .with_param(LANG_PARAM, "fr")
            .with_cookie(ADMIN_LANGUAGE_COOKIE, "en");

        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert_eq!(resolution.source, Signal::Param);
        assert_eq!(
            resolution.cookies,
            vec![CookieWrite::new(ADMIN_LANGUAGE_COOKIE, "fr", NOW + MONTH_IN_SECONDS)]
        );
    }

    #[test]
    fn test_param_beats_path() {
        let ctx = RequestContext::frontend(HOME, &url("/en/about?lang=fr")).with_param(LANG_PARAM, "fr");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert!(resolution.cookies.is_empty(), "Front end never writes the admin cookie");
    }

    #[test]
    fn test_param_in_async_admin_sets_no_cookie() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/admin-ajax.php"))
            .asynchronous()
            .with_param(LANG_PARAM, "fr");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert!(resolution.cookies.is_empty());
    }

    #[test]
    fn test_unknown_param_falls_through() {
        let ctx = RequestContext::frontend(HOME, &url("/fr/about")).with_param(LANG_PARAM, "xx");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert_eq!(resolution.source, Signal::Path);
    }

    // ==================== Referrer Tests ====================

    #[test]
    fn test_async_uses_referrer_prefix() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/admin-ajax.php"))
            .asynchronous()
            .with_referrer(&url("/fr/shop/"));

        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert_eq!(resolution.source, Signal::Referrer);
        assert!(resolution.frontend_origin);
        assert!(resolution.cookies.is_empty(), "Referrer signal is not persisted");
    }

    #[test]
    fn test_async_ignores_admin_referrer() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/admin-ajax.php"))
            .asynchronous()
            .with_referrer(&url("/wp-admin/fr/"));

        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "en");
        assert_eq!(resolution.source, Signal::Default);
        assert!(!resolution.frontend_origin);
    }

    #[test]
    fn test_async_without_referrer_is_frontend_origin() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/admin-ajax.php")).asynchronous();
        let resolution = resolve(&ctx);
        assert!(resolution.frontend_origin);
        assert_eq!(resolution.slug, "en");
        assert!(resolution.cookies.is_empty(), "Async admin requests do not seed cookies");
    }

    #[test]
    fn test_async_ignores_foreign_referrer() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/admin-ajax.php"))
            .asynchronous()
            .with_referrer("https://google.com/fr/search?q=x");

        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "en");
        assert_eq!(resolution.source, Signal::Default);
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_frontend_path_prefix() {
        let resolution = resolve(&RequestContext::frontend(HOME, &url("/fr/about")));
        assert_eq!(resolution.slug, "fr");
        assert_eq!(resolution.source, Signal::Path);
        assert_eq!(resolution.path_prefix.as_deref(), Some("fr"));
        assert!(resolution.unavailable.is_none());
    }

    #[test]
    fn test_frontend_disabled_prefix_is_unavailable() {
        let resolution = resolve(&RequestContext::frontend(HOME, &url("/de/about")));
        assert_eq!(resolution.slug, "en");
        assert_eq!(resolution.unavailable.as_deref(), Some("de"));
        assert!(resolution.path_prefix.is_none());
    }

    #[test]
    fn test_param_clears_disabled_prefix() {
        let ctx = RequestContext::frontend(HOME, &url("/de/about?lang=fr")).with_param(LANG_PARAM, "fr");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert!(resolution.unavailable.is_none());
    }

    #[test]
    fn test_frontend_non_language_prefix_ignored() {
        let resolution = resolve(&RequestContext::frontend(HOME, &url("/us/about")));
        assert_eq!(resolution.slug, "en");
        assert!(resolution.unavailable.is_none());
        assert!(resolution.path_prefix.is_none());
    }

    #[test]
    fn test_frontend_ignores_cookie() {
        let ctx = RequestContext::frontend(HOME, &url("/about")).with_cookie(ADMIN_LANGUAGE_COOKIE, "fr");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "en");
        assert_eq!(resolution.source, Signal::Default);
    }

    // ==================== Cookie Tests ====================

    #[test]
    fn test_admin_cookie() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/")).with_cookie(ADMIN_LANGUAGE_COOKIE, "fr");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "fr");
        assert_eq!(resolution.source, Signal::Cookie);
        assert!(resolution.cookies.is_empty());
    }

    #[test]
    fn test_admin_stale_cookie_falls_back() {
        let ctx = RequestContext::admin(HOME, &url("/wp-admin/")).with_cookie(ADMIN_LANGUAGE_COOKIE, "de");
        let resolution = resolve(&ctx);
        assert_eq!(resolution.slug, "en");
        assert!(resolution.cookies.is_empty(), "Existing cookie is not reseeded");
    }

    // ==================== Default Tests ====================

    #[test]
    fn test_admin_without_cookie_seeds_default() {
        let resolution = resolve(&RequestContext::admin(HOME, &url("/wp-admin/")));
        assert_eq!(resolution.slug, "en");
        assert_eq!(resolution.source, Signal::Default);
        assert_eq!(
            resolution.cookies,
            vec![CookieWrite::new(ADMIN_LANGUAGE_COOKIE, "en", NOW + MONTH_IN_SECONDS)]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let ctx = RequestContext::frontend(HOME, &url("/fr/x")).with_accept_language("de");
        assert_eq!(resolve(&ctx), resolve(&ctx));
    }
}
