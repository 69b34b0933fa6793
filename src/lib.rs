//! Language routing for multilingual CMS sites.
//!
//! Resolves the active language of each request from its signals, binds the
//! locale, rewrites URLs between languages, and aggregates the per-entity
//! translation config.

pub mod config;
pub mod entity_config;
pub mod error;
pub mod hooks;
pub mod i18n;
pub mod markup;
pub mod pipeline;
pub mod request;
pub mod rewrite;
pub mod server;
pub mod store;

pub use error::{Result, RouterError};
pub use pipeline::{Action, ActiveLanguage, LanguageRouter, RouteOutcome, RouterSettings};
