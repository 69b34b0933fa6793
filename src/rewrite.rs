//! Home URL computation and language-segment rewriting.

use crate::hooks::{Hooks, LanguageEvent};
use crate::i18n::{detect_browser_language, LanguageCatalog};
use crate::request::{strip_home, CookieWrite, RequestContext, BROWSER_REDIRECT_COOKIE, YEAR_IN_SECONDS};
use tracing::{debug, info};

/// Builds language-aware URLs relative to the site's original home URL.
#[derive(Debug, Clone, Copy)]
pub struct UrlRewriter<'a> {
    catalog: &'a LanguageCatalog,
    home_url: &'a str,
}

/// What the browser-language check decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserRedirect {
    /// One-time redirect target, if any
    pub location: Option<String>,
    pub cookies: Vec<CookieWrite>,
    pub events: Vec<LanguageEvent>,
}

impl<'a> UrlRewriter<'a> {
    pub fn new(catalog: &'a LanguageCatalog, home_url: &'a str) -> Self {
        Self {
            catalog,
            home_url: home_url.trim_end_matches('/'),
        }
    }

    /// Original home URL, without any language segment.
    pub fn original_home_url(&self) -> &str {
        self.home_url
    }

    /// Home URL for `slug`; the default language has no segment.
    pub fn home_url_for(&self, slug: &str) -> String {
        if slug == self.catalog.default_slug() {
            self.home_url.to_string()
        } else {
            format!("{}/{}", self.home_url, slug)
        }
    }

    /// Home URL as seen by the current request.
    ///
    /// Admin pages and requests handled before initialization see the
    /// original value unless `force` is set.
    pub fn home_url(
        &self,
        ctx: &RequestContext,
        resolved: &str,
        initialized: bool,
        force: bool,
    ) -> String {
        if !initialized || (ctx.is_admin_page() && !force) {
            return self.home_url.to_string();
        }
        self.home_url_for(resolved)
    }

    /// Point `url` at the `target_slug` variant.
    ///
    /// Any existing language segment is replaced; the default language gets
    /// none. URLs outside the site and unknown targets are returned as is.
    /// Rewriting is idempotent.
    pub fn rewrite(&self, url: &str, target_slug: &str) -> String {
        if self.catalog.by_slug(target_slug).is_none() {
            debug!("Not rewriting {} for unknown language '{}'", url, target_slug);
            return url.to_string();
        }

        let Some((prefix, rest)) = self.split_site_url(url) else {
            return url.to_string();
        };

        // Strip every leading language segment ("/fr/en/x" → "/x")
        let mut rest = rest;
        let mut stripped = false;
        while let Some(len) = self.leading_language_segment(rest) {
            rest = &rest[len..];
            stripped = true;
        }

        let mut out = String::with_capacity(url.len() + target_slug.len() + 1);
        out.push_str(prefix);
        if target_slug != self.catalog.default_slug() {
            out.push('/');
            out.push_str(target_slug);
        } else if stripped && !rest.starts_with('/') {
            out.push('/');
        }
        out.push_str(rest);

        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// `url` without any language segment.
    pub fn strip_language(&self, url: &str) -> String {
        self.rewrite(url, self.catalog.default_slug())
    }

    /// Decide the one-time redirect to the browser's preferred language.
    ///
    /// Gated by the `wpm_language` cookie: when it is absent the cookie is
    /// set and the browser language checked; when it disagrees with the
    /// resolved language it is refreshed and a change event emitted.
    pub fn redirect_for_browser_language(
        &self,
        ctx: &RequestContext,
        resolved: &str,
        hooks: &Hooks,
        now: i64,
    ) -> BrowserRedirect {
        let mut decision = BrowserRedirect::default();
        if ctx.is_admin || ctx.is_async || ctx.is_cli {
            return decision;
        }

        match ctx.cookie(BROWSER_REDIRECT_COOKIE) {
            None => {
                decision.cookies.push(CookieWrite::new(
                    BROWSER_REDIRECT_COOKIE,
                    resolved,
                    now + YEAR_IN_SECONDS,
                ));

                if !hooks.redirect_to_browser_language.apply(true) {
                    debug!("Browser language redirect disabled by filter");
                    return decision;
                }

                let Some(browser) = detect_browser_language(ctx.accept_language.as_deref(), self.catalog)
                else {
                    return decision;
                };
                if browser == resolved {
                    return decision;
                }

                let browser_home = self.home_url_for(&browser);
                let current_home = self.home_url_for(resolved);
                match strip_home(&ctx.current_url, &current_home) {
                    Some(rest) => {
                        let location = format!("{}{}", browser_home, rest);
                        info!("Redirecting to browser language '{}': {}", browser, location);
                        decision.location = Some(location);
                    }
                    None => debug!(
                        "Current URL {} is outside {}, skipping browser redirect",
                        ctx.current_url, current_home
                    ),
                }
            }
            Some(previous) if previous != resolved => {
                decision.cookies.push(CookieWrite::new(
                    BROWSER_REDIRECT_COOKIE,
                    resolved,
                    now + YEAR_IN_SECONDS,
                ));
                decision.events.push(LanguageEvent::LanguageChanged {
                    previous: previous.to_string(),
                    current: resolved.to_string(),
                });
            }
            Some(_) => {}
        }

        decision
    }

    /// Split into (site prefix, site-relative rest).
    fn split_site_url<'u>(&self, url: &'u str) -> Option<(&'u str, &'u str)> {
        if !self.home_url.is_empty() {
            if let Some(rest) = strip_home(url, self.home_url) {
                return Some((&url[..url.len() - rest.len()], rest));
            }
        }
        if url.starts_with('/') && !url.starts_with("//") {
            return Some(("", url));
        }
        None
    }

    /// Byte length of a leading `/slug` naming any catalog language.
    fn leading_language_segment(&self, rest: &str) -> Option<usize> {
        let segment = rest.strip_prefix('/')?;
        let end = segment.find(['/', '?', '#']).unwrap_or(segment.len());
        let candidate = &segment[..end];
        if candidate.is_empty() {
            return None;
        }
        self.catalog
            .languages()
            .iter()
            .any(|lang| lang.slug.eq_ignore_ascii_case(candidate))
            .then_some(end + 1)
    }
}
