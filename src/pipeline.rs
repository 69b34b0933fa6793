//! The per-request routing pipeline.
//!
//! resolve → bind (canonical redirect) → availability → browser redirect.
//! Redirects are terminal outcomes, not errors.

use crate::hooks::{Hooks, LanguageEvent};
use crate::i18n::{
    Binding, LanguageCatalog, LocaleBinder, RoutingMetrics, Signal, SignalResolver,
};
use crate::request::{CookieWrite, RequestContext, LANG_PARAM};
use crate::rewrite::UrlRewriter;
use std::sync::Arc;
use tracing::{debug, info};

/// Site settings the pipeline needs.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Original home URL, without any language segment
    pub home_url: String,

    /// Path prefix of the admin area (e.g., "/wp-admin")
    pub admin_path: String,
}

/// The language state handed to downstream rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLanguage {
    pub slug: String,
    pub locale: String,
    pub source: Signal,

    /// Home URL for this language
    pub home_url: String,

    /// Request for `/` whose only parameter is `lang`; render the front page
    pub is_front_page: bool,

    /// Locale to use for user-facing strings of this request. For
    /// background requests from the front end this is the bound locale,
    /// otherwise the user's stored preference.
    pub user_locale: Option<String>,
}

/// What the host should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Continue to content rendering
    Render,

    /// Stop and redirect
    Redirect(String),

    /// The requested language exists but is disabled (404)
    NotAvailable,
}

/// Everything the pipeline decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub action: Action,
    pub language: ActiveLanguage,
    /// Cookies to set, also on redirects
    pub cookies: Vec<CookieWrite>,
    pub events: Vec<LanguageEvent>,
}

/// Runs the language pipeline for individual requests.
#[derive(Debug)]
pub struct LanguageRouter {
    settings: RouterSettings,
    hooks: Arc<Hooks>,
    metrics: Arc<RoutingMetrics>,
}

impl LanguageRouter {
    pub fn new(settings: RouterSettings, hooks: Arc<Hooks>, metrics: Arc<RoutingMetrics>) -> Self {
        Self {
            settings,
            hooks,
            metrics,
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    pub fn rewriter<'a>(&'a self, catalog: &'a LanguageCatalog) -> UrlRewriter<'a> {
        UrlRewriter::new(catalog, &self.settings.home_url)
    }

    /// Route one request. `now` is the current Unix time.
    pub fn route(&self, catalog: &LanguageCatalog, ctx: &RequestContext, now: i64) -> RouteOutcome {
        let rewriter = self.rewriter(catalog);
        let resolver = SignalResolver::new(catalog, &self.settings.home_url, &self.settings.admin_path);

        let resolution = resolver.resolve(ctx, now);
        self.metrics.record_resolution(resolution.source);

        let mut cookies = resolution.cookies.clone();
        let mut events = Vec::new();

        let mut binder = LocaleBinder::new(catalog);
        let (locale, slug) = match binder.bind(&resolution, ctx, catalog, &rewriter) {
            Binding::Bound { locale, slug } => (locale, slug),
            Binding::Redirect { location } => {
                self.metrics.record_canonical_redirect();
                let language = self.active_language(
                    ctx,
                    &rewriter,
                    binder.active_locale(),
                    &resolution.slug,
                    resolution.source,
                    resolution.frontend_origin,
                );
                return RouteOutcome {
                    action: Action::Redirect(location),
                    language,
                    cookies,
                    events,
                };
            }
        };

        let bound = LanguageEvent::LocaleBound {
            locale: locale.clone(),
            slug: slug.clone(),
        };
        self.hooks.emit(&bound);
        events.push(bound);

        let language = self.active_language(
            ctx,
            &rewriter,
            &locale,
            &slug,
            resolution.source,
            resolution.frontend_origin,
        );

        if let Some(requested) = &resolution.unavailable {
            info!("Language '{}' is disabled, responding not available", requested);
            self.metrics.record_not_available();
            return RouteOutcome {
                action: Action::NotAvailable,
                language,
                cookies,
                events,
            };
        }

        let browser = rewriter.redirect_for_browser_language(ctx, &slug, &self.hooks, now);
        cookies.extend(browser.cookies);
        for event in browser.events {
            self.hooks.emit(&event);
            events.push(event);
        }

        let action = match browser.location {
            Some(location) => {
                self.metrics.record_browser_redirect();
                Action::Redirect(location)
            }
            None => Action::Render,
        };
        debug!("Routed {} as '{}' ({:?})", ctx.raw_path, slug, action);

        RouteOutcome {
            action,
            language,
            cookies,
            events,
        }
    }

    fn active_language(
        &self,
        ctx: &RequestContext,
        rewriter: &UrlRewriter<'_>,
        locale: &str,
        slug: &str,
        source: Signal,
        frontend_origin: bool,
    ) -> ActiveLanguage {
        let user_locale = if frontend_origin {
            Some(locale.to_string())
        } else {
            ctx.user_locale_preference.clone()
        };

        ActiveLanguage {
            slug: slug.to_string(),
            locale: locale.to_string(),
            source,
            home_url: rewriter.home_url(ctx, slug, true, false),
            is_front_page: is_front_page_request(ctx),
            user_locale,
        }
    }
}

/// `/?lang=xx` with no other query parameters addresses the front page.
/// Body parameters do not count.
fn is_front_page_request(ctx: &RequestContext) -> bool {
    let path = ctx.raw_path.split(['?', '#']).next().unwrap_or_default();
    ctx.query.len() == 1 && ctx.query.contains_key(LANG_PARAM) && (path.is_empty() || path == "/")
}
