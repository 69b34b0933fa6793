//! Translation configuration per entity type.
//!
//! The stored `wpm_config` record is merged with the post types and
//! taxonomies the host currently knows about, passing every collection and
//! every entity through its extension point.

use crate::error::{Result, RouterError};
use crate::hooks::Hooks;
use crate::store::{OptionStore, CONFIG_OPTION};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Translation policies keyed by entity type, built once per config load.
///
/// A `null` policy means the entity is known but has nothing configured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTranslationConfig {
    pub post_types: Map<String, Value>,
    pub taxonomies: Map<String, Value>,
    pub options: Value,
    /// Present only on multisite installs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_options: Option<Value>,
    pub widgets: Value,
    /// Keys of the stored record this layer does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntityTranslationConfig {
    pub fn post_type_policy(&self, post_type: &str) -> Option<&Value> {
        self.post_types.get(post_type).filter(|v| !v.is_null())
    }

    pub fn taxonomy_policy(&self, taxonomy: &str) -> Option<&Value> {
        self.taxonomies.get(taxonomy).filter(|v| !v.is_null())
    }
}

/// Build the config from the stored record and discovered entities.
///
/// Extension points run in this order: `load_config`, `posts_config`,
/// `per_post_type_config` for each post type, `taxonomies_config`,
/// `per_taxonomy_config` for each taxonomy, `options_config`,
/// `site_options_config` (multisite only), `widgets_config`.
pub fn build_config(
    stored: Option<Value>,
    post_types: &[String],
    taxonomies: &[String],
    is_multisite: bool,
    hooks: &Hooks,
) -> EntityTranslationConfig {
    let raw = hooks
        .load_config
        .apply(stored.unwrap_or_else(|| Value::Object(Map::new())));
    let mut raw = into_object("config", raw);

    let posts = hooks
        .posts_config
        .apply(raw.remove("post_types").unwrap_or(Value::Null));
    let mut posts = into_object("post_types", posts);
    for post_type in post_types {
        let current = posts.get(post_type).cloned().unwrap_or(Value::Null);
        posts.insert(
            post_type.clone(),
            hooks.per_post_type_config.apply(post_type, current),
        );
    }

    let taxes = hooks
        .taxonomies_config
        .apply(raw.remove("taxonomies").unwrap_or(Value::Null));
    let mut taxes = into_object("taxonomies", taxes);
    for taxonomy in taxonomies {
        let current = taxes.get(taxonomy).cloned().unwrap_or(Value::Null);
        taxes.insert(
            taxonomy.clone(),
            hooks.per_taxonomy_config.apply(taxonomy, current),
        );
    }

    let options = hooks
        .options_config
        .apply(raw.remove("options").unwrap_or(Value::Null));

    let stored_site_options = raw.remove("site_options");
    let site_options = if is_multisite {
        Some(
            hooks
                .site_options_config
                .apply(stored_site_options.unwrap_or(Value::Null)),
        )
    } else {
        None
    };

    let widgets = hooks
        .widgets_config
        .apply(raw.remove("widgets").unwrap_or(Value::Null));

    EntityTranslationConfig {
        post_types: posts,
        taxonomies: taxes,
        options,
        site_options,
        widgets,
        extra: raw,
    }
}

fn into_object(what: &str, value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            warn!("Ignoring non-object {} config: {}", what, other);
            Map::new()
        }
    }
}

/// Entities discovered on the host.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredEntities {
    pub post_types: Vec<String>,
    pub taxonomies: Vec<String>,
    pub is_multisite: bool,
}

/// Loads and memoizes the entity config until explicitly invalidated.
pub struct ConfigAggregator {
    store: Arc<dyn OptionStore>,
    hooks: Arc<Hooks>,
    entities: DiscoveredEntities,
    cached: RwLock<Option<Arc<EntityTranslationConfig>>>,
}

impl ConfigAggregator {
    pub fn new(store: Arc<dyn OptionStore>, hooks: Arc<Hooks>, entities: DiscoveredEntities) -> Self {
        Self {
            store,
            hooks,
            entities,
            cached: RwLock::new(None),
        }
    }

    /// The current config, building it on first use.
    pub fn config(&self) -> Result<Arc<EntityTranslationConfig>> {
        if let Some(config) = self
            .cached
            .read()
            .map_err(|_| RouterError::Poisoned)?
            .as_ref()
        {
            return Ok(Arc::clone(config));
        }

        let mut cached = self.cached.write().map_err(|_| RouterError::Poisoned)?;
        // Another request may have built it while we waited
        if let Some(config) = cached.as_ref() {
            return Ok(Arc::clone(config));
        }

        let stored = self.store.get_option(CONFIG_OPTION)?;
        let config = Arc::new(build_config(
            stored,
            &self.entities.post_types,
            &self.entities.taxonomies,
            self.entities.is_multisite,
            &self.hooks,
        ));
        debug!(
            "Built entity config: {} post types, {} taxonomies",
            config.post_types.len(),
            config.taxonomies.len()
        );
        *cached = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Drop the memoized config (theme switch, plugin activation, upgrade).
    pub fn invalidate(&self) {
        match self.cached.write() {
            Ok(mut cached) => {
                if cached.take().is_some() {
                    info!("Entity config invalidated");
                }
            }
            Err(_) => warn!("Entity config lock poisoned; cannot invalidate"),
        }
    }
}
