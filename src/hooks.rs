//! Extension points and emitted events.
//!
//! Each extension point is an ordered list of pure transforms. The core
//! folds a value through the list in registration order; an empty list is
//! the identity.

use serde_json::Value;
use std::fmt;

type Transform<T> = Box<dyn Fn(T) -> T + Send + Sync>;
type NamedTransform = Box<dyn Fn(&str, Value) -> Value + Send + Sync>;
type Listener = Box<dyn Fn(&LanguageEvent) + Send + Sync>;

/// Ordered transforms for one extension point.
pub struct FilterChain<T> {
    handlers: Vec<Transform<T>>,
}

impl<T> FilterChain<T> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn add(&mut self, handler: impl Fn(T) -> T + Send + Sync + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn apply(&self, value: T) -> T {
        self.handlers.iter().fold(value, |acc, handler| handler(acc))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FilterChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterChain({} handlers)", self.handlers.len())
    }
}

/// Per-entity transforms; each handler receives the entity name.
#[derive(Default)]
pub struct EntityFilterChain {
    handlers: Vec<NamedTransform>,
}

impl EntityFilterChain {
    pub fn add(&mut self, handler: impl Fn(&str, Value) -> Value + Send + Sync + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Register a transform that only runs for one entity name.
    pub fn add_for(
        &mut self,
        entity: &str,
        handler: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) {
        let entity = entity.to_string();
        self.add(move |name, value| if name == entity { handler(value) } else { value });
    }

    pub fn apply(&self, entity: &str, value: Value) -> Value {
        self.handlers
            .iter()
            .fold(value, |acc, handler| handler(entity, acc))
    }
}

impl fmt::Debug for EntityFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityFilterChain({} handlers)", self.handlers.len())
    }
}

/// Notifications for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageEvent {
    /// The active locale was bound for this request
    LocaleBound { locale: String, slug: String },

    /// The browser-redirect cookie disagreed with the resolved language
    LanguageChanged { previous: String, current: String },
}

/// All extension points, applied by the config aggregator and pipeline.
#[derive(Default)]
pub struct Hooks {
    pub load_config: FilterChain<Value>,
    pub posts_config: FilterChain<Value>,
    pub per_post_type_config: EntityFilterChain,
    pub taxonomies_config: FilterChain<Value>,
    pub per_taxonomy_config: EntityFilterChain,
    pub options_config: FilterChain<Value>,
    pub site_options_config: FilterChain<Value>,
    pub widgets_config: FilterChain<Value>,
    pub redirect_to_browser_language: FilterChain<bool>,
    listeners: Vec<Listener>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, listener: impl Fn(&LanguageEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&self, event: &LanguageEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("load_config", &self.load_config)
            .field("posts_config", &self.posts_config)
            .field("per_post_type_config", &self.per_post_type_config)
            .field("taxonomies_config", &self.taxonomies_config)
            .field("per_taxonomy_config", &self.per_taxonomy_config)
            .field("options_config", &self.options_config)
            .field("site_options_config", &self.site_options_config)
            .field("widgets_config", &self.widgets_config)
            .field("redirect_to_browser_language", &self.redirect_to_browser_language)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
