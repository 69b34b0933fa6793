//! Binds the resolved language to the request's active locale.

use crate::i18n::{LanguageCatalog, Resolution};
use crate::request::{RequestContext, LANG_PARAM};
use crate::rewrite::UrlRewriter;
use tracing::{info, warn};

/// Result of binding a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Locale bound; processing continues
    Bound { locale: String, slug: String },

    /// The default language was requested with an explicit path segment;
    /// serve the canonical URL instead
    Redirect { location: String },
}

/// Holds the active locale for one request.
#[derive(Debug, Clone)]
pub struct LocaleBinder {
    active_locale: String,
}

impl LocaleBinder {
    /// Binder whose active locale starts at the catalog default.
    pub fn new(catalog: &LanguageCatalog) -> Self {
        Self {
            active_locale: catalog.default_locale().to_string(),
        }
    }

    pub fn active_locale(&self) -> &str {
        &self.active_locale
    }

    /// Set the active locale from `resolution`.
    ///
    /// Returns a redirect when the default language's segment appears in a
    /// front-end URL without an explicit `lang` parameter.
    pub fn bind(
        &mut self,
        resolution: &Resolution,
        ctx: &RequestContext,
        catalog: &LanguageCatalog,
        rewriter: &UrlRewriter<'_>,
    ) -> Binding {
        let Some(language) = catalog.by_slug(&resolution.slug) else {
            warn!(
                "Resolved language '{}' is not in the catalog; keeping {}",
                resolution.slug, self.active_locale
            );
            return Binding::Bound {
                locale: self.active_locale.clone(),
                slug: catalog.default_slug().to_string(),
            };
        };

        self.active_locale = language.locale.clone();

        let canonicalize = language.locale == catalog.default_locale()
            && !ctx.is_admin
            && !ctx.is_cli
            && ctx.param(LANG_PARAM).is_none()
            && resolution.path_prefix.is_some();

        if canonicalize {
            let current = format!("{}{}", rewriter.original_home_url(), ctx.raw_path);
            let location = rewriter.strip_language(&current);
            info!(
                "Default language '{}' shown in URL, redirecting to {}",
                language.slug, location
            );
            return Binding::Redirect { location };
        }

        Binding::Bound {
            locale: language.locale.clone(),
            slug: language.slug.clone(),
        }
    }

    /// Mirror a locale change made elsewhere. Not validated.
    pub fn on_locale_changed(&mut self, new_locale: &str) {
        self.active_locale = new_locale.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{AvailableTranslations, SignalResolver};
    use serde_json::{json, Value};

    const HOME: &str = "https://example.com";

    fn catalog() -> LanguageCatalog {
        let Value::Object(options) = json!({
            "en_US": {"name": "English", "slug": "en", "flag": "us", "enable": 1},
            "fr_FR": {"name": "Français", "slug": "fr", "flag": "fr", "enable": 1},
        }) else {
            unreachable!()
        };
        LanguageCatalog::load(&options, &[], &AvailableTranslations::builtin(), None)
            .unwrap()
            .catalog
    }

    fn bind(ctx: &RequestContext) -> (Binding, String) {
        let catalog = catalog();
        let rewriter = UrlRewriter::new(&catalog, HOME);
        let resolution = SignalResolver::new(&catalog, HOME, "/wp-admin").resolve(ctx, 0);
        let mut binder = LocaleBinder::new(&catalog);
        let binding = binder.bind(&resolution, ctx, &catalog, &rewriter);
        (binding, binder.active_locale().to_string())
    }

    #[test]
    fn test_bind_non_default() {
        let ctx = RequestContext::frontend(HOME, "https://example.com/fr/about");
        let (binding, active) = bind(&ctx);
        assert_eq!(
            binding,
            Binding::Bound {
                locale: "fr_FR".to_string(),
                slug: "fr".to_string()
            }
        );
        assert_eq!(active, "fr_FR");
    }

    #[test]
    fn test_bind_default_prefix_redirects() {
        let ctx = RequestContext::frontend(HOME, "https://example.com/en/about");
        let (binding, active) = bind(&ctx);
        assert_eq!(
            binding,
            Binding::Redirect {
                location: "https://example.com/about".to_string()
            }
        );
        assert_eq!(active, "en_US");
    }

    #[test]
    fn test_bind_default_prefix_with_param_no_redirect() {
        let ctx = RequestContext::frontend(HOME, "https://example.com/en/about?lang=en").with_param(LANG_PARAM, "en");
        let (binding, _) = bind(&ctx);
        assert!(matches!(binding, Binding::Bound { .. }));
    }

    #[test]
    fn test_bind_default_without_prefix() {
        let ctx = RequestContext::frontend(HOME, "https://example.com/about");
        let (binding, active) = bind(&ctx);
        assert!(matches!(binding, Binding::Bound { ref slug, .. } if slug == "en"));
        assert_eq!(active, "en_US");
    }

    #[test]
    fn test_bind_cli_never_redirects() {
        let mut ctx = RequestContext::frontend(HOME, "https://example.com/en/about");
        ctx.is_cli = true;
        let (binding, _) = bind(&ctx);
        assert!(matches!(binding, Binding::Bound { .. }));
    }

    #[test]
    fn test_bind_unknown_slug_keeps_default() {
        let catalog = catalog();
        let rewriter = UrlRewriter::new(&catalog, HOME);
        let ctx = RequestContext::frontend(HOME, HOME);
        let resolution = Resolution {
            slug: "xx".to_string(),
            source: crate::i18n::Signal::Default,
            path_prefix: None,
            unavailable: None,
            frontend_origin: false,
            cookies: Vec::new(),
        };

        let mut binder = LocaleBinder::new(&catalog);
        let binding = binder.bind(&resolution, &ctx, &catalog, &rewriter);
        assert_eq!(
            binding,
            Binding::Bound {
                locale: "en_US".to_string(),
                slug: "en".to_string()
            }
        );
    }

    #[test]
    fn test_on_locale_changed_mirrors_without_validation() {
        let mut binder = LocaleBinder::new(&catalog());
        binder.on_locale_changed("zz_ZZ");
        assert_eq!(binder.active_locale(), "zz_ZZ");
    }
}
