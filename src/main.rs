use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use wpm_router::{
    config::Config,
    entity_config::DiscoveredEntities,
    hooks::{Hooks, LanguageEvent},
    i18n::AvailableTranslations,
    server::{self, AppState, HostSettings},
    store::JsonFileStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wpm_router=info".parse()?),
        )
        .init();

    info!("Starting multilingual router");

    let config = Config::from_env()?;

    let store = JsonFileStore::open(&config.options_file)
        .with_context(|| format!("Failed to open options file {}", config.options_file))?;
    info!("Using options file {}", store.path().display());

    let mut hooks = Hooks::new();
    let redirect_enabled = config.redirect_to_browser_language;
    hooks
        .redirect_to_browser_language
        .add(move |enabled| enabled && redirect_enabled);
    hooks.on_event(|event| {
        if let LanguageEvent::LanguageChanged { previous, current } = event {
            info!("Visitor language changed from {} to {}", previous, current);
        }
    });

    let state = AppState::new(
        HostSettings {
            site_url: config.site_url.clone(),
            admin_path: config.admin_path.clone(),
            async_path: config.async_path.clone(),
            installed_locales: config.installed_locales.clone(),
            entities: DiscoveredEntities {
                post_types: config.post_types.clone(),
                taxonomies: config.taxonomies.clone(),
                is_multisite: config.multisite,
            },
        },
        Arc::new(store),
        hooks,
        AvailableTranslations::builtin(),
    )
    .context("Failed to initialize language routing")?;

    let app = server::app(Arc::new(state));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {} for {}", addr, config.site_url);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
