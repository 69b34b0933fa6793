//! HTTP host: runs the language pipeline as axum middleware.

use crate::entity_config::{ConfigAggregator, DiscoveredEntities};
use crate::error::{Result, RouterError};
use crate::hooks::Hooks;
use crate::i18n::{AvailableTranslations, LanguageCatalog, RoutingMetrics};
use crate::markup::{hidden_lang_field, hreflang_links, redirect_after_save, EDIT_LANG_PARAM};
use crate::pipeline::{Action, ActiveLanguage, LanguageRouter, RouteOutcome, RouterSettings};
use crate::request::{relative_path, CookieWrite, RequestContext, LANG_PARAM};
use crate::store::OptionStore;
use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, COOKIE, EXPIRES, LOCATION, PRAGMA, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

/// Largest form body the middleware buffers to read `lang`.
const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Host configuration for [`AppState`].
#[derive(Debug, Clone)]
pub struct HostSettings {
    pub site_url: String,
    pub admin_path: String,
    pub async_path: String,
    pub installed_locales: Vec<String>,
    pub entities: DiscoveredEntities,
}

/// Shared state of the HTTP host.
pub struct AppState {
    pub router: LanguageRouter,
    pub entity_config: ConfigAggregator,
    store: Arc<dyn OptionStore>,
    catalog: RwLock<Arc<LanguageCatalog>>,
    translations: AvailableTranslations,
    installed_locales: Vec<String>,
    site_origin: String,
    async_path: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Load the catalog and prepare the pipeline.
    pub fn new(
        settings: HostSettings,
        store: Arc<dyn OptionStore>,
        hooks: Hooks,
        translations: AvailableTranslations,
    ) -> Result<Self> {
        let site_url = settings.site_url.trim_end_matches('/').to_string();
        let site_origin = url::Url::parse(&site_url)
            .map(|u| u.origin().ascii_serialization())
            .map_err(|e| RouterError::MalformedOption {
                key: "site_url".to_string(),
                reason: e.to_string(),
            })?;

        let catalog =
            LanguageCatalog::load_from_store(store.as_ref(), &settings.installed_locales, &translations)?;
        info!(
            "Loaded {} languages, default {}",
            catalog.languages().len(),
            catalog.default_locale()
        );

        let hooks = Arc::new(hooks);
        let router = LanguageRouter::new(
            RouterSettings {
                home_url: site_url,
                admin_path: settings.admin_path,
            },
            Arc::clone(&hooks),
            Arc::new(RoutingMetrics::new()),
        );
        let entity_config = ConfigAggregator::new(Arc::clone(&store), hooks, settings.entities);

        Ok(Self {
            router,
            entity_config,
            store,
            catalog: RwLock::new(Arc::new(catalog)),
            translations,
            installed_locales: settings.installed_locales,
            site_origin,
            async_path: settings.async_path,
        })
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Result<Arc<LanguageCatalog>> {
        let catalog = self.catalog.read().map_err(|_| RouterError::Poisoned)?;
        Ok(Arc::clone(&catalog))
    }

    /// Rebuild the catalog from storage and drop the memoized entity config.
    pub fn reload(&self) -> Result<()> {
        let catalog = LanguageCatalog::load_from_store(
            self.store.as_ref(),
            &self.installed_locales,
            &self.translations,
        )?;
        *self.catalog.write().map_err(|_| RouterError::Poisoned)? = Arc::new(catalog);
        self.entity_config.invalidate();
        info!("Language catalog reloaded");
        Ok(())
    }

    fn request_context(
        &self,
        parts: &Parts,
        query: HashMap<String, String>,
        params: HashMap<String, String>,
    ) -> RequestContext {
        let settings = self.router.settings();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let current_url = format!("{}{}", self.site_origin, path_and_query);
        let raw_path = relative_path(&settings.home_url, &current_url);

        let path = raw_path.split(['?', '#']).next().unwrap_or_default();
        let is_async_endpoint = path == self.async_path;
        let is_async = is_async_endpoint
            || header_str(&parts.headers, "x-requested-with")
                .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
        let is_admin = is_async_endpoint
            || path == settings.admin_path
            || path.starts_with(&format!("{}/", settings.admin_path.trim_end_matches('/')));

        RequestContext {
            is_admin,
            is_async,
            is_cli: false,
            current_url,
            raw_path,
            params,
            query,
            cookies: parse_cookies(&parts.headers),
            accept_language: header_str(&parts.headers, "accept-language").map(str::to_string),
            referrer: header_str(&parts.headers, "referer").map(str::to_string),
            user_locale_preference: None,
        }
    }
}

/// Build the demo site with the language middleware.
pub fn app(state: SharedState) -> Router {
    let admin_post = format!("{}/post.php", state.router.settings().admin_path.trim_end_matches('/'));

    let site = Router::new()
        .route(&admin_post, get(edit_form).post(save_post))
        .fallback(page)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            language_middleware,
        ));

    Router::new()
        .route("/_wpm/metrics", get(metrics))
        .route("/_wpm/config", get(entity_config))
        .route("/_wpm/reload", post(reload))
        .merge(site)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the request language and apply the pipeline's decision.
pub async fn language_middleware(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let mut params = query.clone();

    let is_form = header_str(&parts.headers, CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    let body = if is_form {
        match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
            Ok(bytes) => {
                params.extend(form_urlencoded::parse(&bytes).into_owned());
                Body::from(bytes)
            }
            Err(e) => {
                warn!("Failed to buffer form body: {}", e);
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        }
    } else {
        body
    };

    let catalog = match state.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Catalog unavailable: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let ctx = state.request_context(&parts, query, params);
    let RouteOutcome {
        action,
        language,
        cookies,
        ..
    } = state.router.route(&catalog, &ctx, Utc::now().timestamp());

    let mut response = match action {
        Action::Redirect(location) => redirect(&location),
        Action::NotAvailable => not_available(&language),
        Action::Render => {
            let mut request = Request::from_parts(parts, body);
            request.extensions_mut().insert(language);
            request.extensions_mut().insert(catalog);
            next.run(request).await
        }
    };

    append_cookies(response.headers_mut(), &cookies);
    response
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(e) => {
            error!("Refusing to redirect to invalid location {}: {}", location, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_available(language: &ActiveLanguage) -> Response {
    let mut response = (
        StatusCode::NOT_FOUND,
        Html(format!(
            "<!doctype html><html lang=\"{}\"><body><h1>Not available in this language</h1></body></html>",
            language.slug
        )),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, must-revalidate, max-age=0"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("Wed, 11 Jan 1984 05:00:00 GMT"));
    response
}

fn append_cookies(headers: &mut HeaderMap, cookies: &[CookieWrite]) {
    for cookie in cookies {
        match HeaderValue::from_str(&set_cookie_value(cookie)) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => warn!("Skipping cookie {}: {}", cookie.name, e),
        }
    }
}

/// `Set-Cookie` header value for a cookie write.
pub fn set_cookie_value(cookie: &CookieWrite) -> String {
    let expires = DateTime::<Utc>::from_timestamp(cookie.expires, 0)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT");
    format!(
        "{}={}; Expires={}; Path=/; SameSite=Lax",
        cookie.name, cookie.value, expires
    )
}

/// Parse the `Cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ==================== Handlers ====================

async fn page(
    State(state): State<SharedState>,
    Extension(language): Extension<ActiveLanguage>,
    Extension(catalog): Extension<Arc<LanguageCatalog>>,
    request: Request,
) -> Html<String> {
    let rewriter = state.router.rewriter(&catalog);
    let current_url = format!(
        "{}{}",
        state.site_origin,
        request.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
    );
    let title = if language.is_front_page {
        "Home".to_string()
    } else {
        request.uri().path().to_string()
    };

    Html(format!(
        "<!doctype html>\n<html lang=\"{slug}\">\n<head>\n<title>{title}</title>\n{links}\n</head>\n\
         <body data-locale=\"{locale}\"><a href=\"{home}\">home</a></body>\n</html>",
        slug = language.slug,
        title = title,
        links = hreflang_links(&catalog, &rewriter, &current_url),
        locale = language.locale,
        home = language.home_url,
    ))
}

async fn edit_form(
    Extension(language): Extension<ActiveLanguage>,
    Extension(catalog): Extension<Arc<LanguageCatalog>>,
    Query(query): Query<HashMap<String, String>>,
) -> Html<String> {
    let lang = query
        .get(EDIT_LANG_PARAM)
        .filter(|slug| catalog.is_enabled_slug(slug))
        .cloned()
        .unwrap_or(language.slug);
    let post_id = query.get("post").cloned().unwrap_or_default();

    Html(format!(
        "<form method=\"post\"><input type=\"hidden\" name=\"post\" value=\"{}\">{}</form>",
        post_id.chars().filter(char::is_ascii_digit).collect::<String>(),
        hidden_lang_field(&lang)
    ))
}

async fn save_post(
    State(state): State<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let settings = state.router.settings();
    let post_id: String = form
        .get("post")
        .map(|p| p.chars().filter(char::is_ascii_digit).collect())
        .unwrap_or_default();
    let location = format!(
        "{}{}/post.php?post={}&action=edit",
        settings.home_url,
        settings.admin_path.trim_end_matches('/'),
        post_id
    );
    debug!("Saved post {}", post_id);
    redirect(&redirect_after_save(&location, form.get(LANG_PARAM).map(String::as_str)))
}

async fn metrics(State(state): State<SharedState>) -> Json<crate::i18n::MetricsReport> {
    Json(state.router.metrics().report())
}

async fn entity_config(State(state): State<SharedState>) -> Response {
    match state.entity_config.config() {
        Ok(config) => Json(config.as_ref().clone()).into_response(),
        Err(e) => {
            error!("Failed to build entity config: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn reload(State(state): State<SharedState>) -> StatusCode {
    match state.reload() {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            error!("Reload failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
