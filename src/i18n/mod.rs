//! Language catalog, resolution and locale binding.
//!
//! # Architecture
//!
//! - `language`: `Language` and its stored option form
//! - `translations`: metadata for installable locales
//! - `catalog`: the languages a site serves, merged from options and installed locales
//! - `browser`: `Accept-Language` parsing
//! - `resolver`: picks the request language from competing signals
//! - `binder`: binds the resolved language as the request's active locale
//! - `metrics`: routing counters
//!
//! # Example
//!
//! ```rust,ignore
//! use wpm_router::i18n::{LanguageCatalog, SignalResolver};
//!
//! let catalog = LanguageCatalog::load_from_store(&store, &installed, &translations)?;
//! let resolution = SignalResolver::new(&catalog, home_url, "/wp-admin").resolve(&ctx, now);
//! ```

mod binder;
mod browser;
mod catalog;
mod language;
mod metrics;
mod resolver;
mod translations;

pub use binder::{Binding, LocaleBinder};
pub use browser::{detect_browser_language, parse_accept_language, LanguagePreference};
pub use catalog::{CatalogLoad, LanguageCatalog, SYSTEM_DEFAULT_LOCALE};
pub use language::{Language, LanguageOption};
pub use metrics::{MetricsReport, RoutingMetrics};
pub use resolver::{language_prefix, Resolution, Signal, SignalResolver};
pub use translations::{AvailableTranslations, TranslationInfo};
