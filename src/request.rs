//! Request snapshot and cookie writes exchanged with the host.

use std::collections::HashMap;

/// Cookie holding the admin-area language selection.
pub const ADMIN_LANGUAGE_COOKIE: &str = "language";

/// Cookie gating the one-time browser-language redirect.
pub const BROWSER_REDIRECT_COOKIE: &str = "wpm_language";

/// Request parameter that selects a language explicitly.
pub const LANG_PARAM: &str = "lang";

pub const MONTH_IN_SECONDS: i64 = 30 * 24 * 60 * 60;
pub const YEAR_IN_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Read-only snapshot of everything the resolver looks at.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request is served from the admin area
    pub is_admin: bool,

    /// Background/AJAX subrequest issued by a page
    pub is_async: bool,

    /// Non-HTTP invocation; redirects are never issued
    pub is_cli: bool,

    /// Full URL of the current request (scheme, host, path, query)
    pub current_url: String,

    /// Path (with query) relative to the site's original home URL
    pub raw_path: String,

    /// Merged query and body parameters
    pub params: HashMap<String, String>,

    /// Parameters from the URL query string only
    pub query: HashMap<String, String>,

    pub cookies: HashMap<String, String>,

    pub accept_language: Option<String>,

    pub referrer: Option<String>,

    /// Locale stored in the signed-in user's profile, if any.
    ///
    /// This is a persisted preference and is never overwritten by
    /// per-request resolution.
    pub user_locale_preference: Option<String>,
}

impl RequestContext {
    /// A front-end request for `url` under `home_url`.
    pub fn frontend(home_url: &str, url: &str) -> Self {
        let raw_path = relative_path(home_url, url);
        Self {
            current_url: url.to_string(),
            query: query_params(&raw_path),
            raw_path,
            ..Self::default()
        }
    }

    /// An admin-area request for `url` under `home_url`.
    pub fn admin(home_url: &str, url: &str) -> Self {
        Self {
            is_admin: true,
            ..Self::frontend(home_url, url)
        }
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_referrer(mut self, referrer: &str) -> Self {
        self.referrer = Some(referrer.to_string());
        self
    }

    pub fn with_accept_language(mut self, header: &str) -> Self {
        self.accept_language = Some(header.to_string());
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Admin request that is not a background subrequest.
    pub fn is_admin_page(&self) -> bool {
        self.is_admin && !self.is_async
    }
}

/// Path of `url` relative to `home_url`.
///
/// URLs outside the home URL fall back to their own path component.
pub fn relative_path(home_url: &str, url: &str) -> String {
    if let Some(rest) = strip_home(url, home_url.trim_end_matches('/')) {
        return rest.to_string();
    }

    match url::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        // Already relative
        Err(_) => url.to_string(),
    }
}

/// Decoded query-string parameters of a path or URL; the fragment is ignored.
pub fn query_params(url: &str) -> HashMap<String, String> {
    let Some((_, query)) = url.split_once('?') else {
        return HashMap::new();
    };
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// Rest of `url` after `home`, only at a path boundary.
pub fn strip_home<'u>(url: &'u str, home: &str) -> Option<&'u str> {
    let rest = url.strip_prefix(home)?;
    (rest.is_empty() || rest.starts_with(['/', '?', '#'])).then_some(rest)
}

/// A cookie the host must set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieWrite {
    pub name: String,
    pub value: String,
    /// Expiry as Unix epoch seconds
    pub expires: i64,
}

impl CookieWrite {
    pub fn new(name: &str, value: &str, expires: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            expires,
        }
    }
}
