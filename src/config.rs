use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Site
    pub site_url: String,
    pub admin_path: String,
    pub async_path: String,

    // Storage
    pub options_file: String,

    // Languages
    pub installed_locales: Vec<String>,
    pub redirect_to_browser_language: bool,

    // Entities
    pub post_types: Vec<String>,
    pub taxonomies: Vec<String>,
    pub multisite: bool,

    // Server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let site_url = std::env::var("SITE_URL").context("SITE_URL not set")?;
        let site_url = site_url.trim_end_matches('/').to_string();
        url::Url::parse(&site_url).with_context(|| format!("SITE_URL is not a valid URL: {}", site_url))?;

        let mut installed_locales = list_var("INSTALLED_LOCALES", &[]);
        // en_US ships with every install
        if !installed_locales.iter().any(|l| l == "en_US") {
            installed_locales.insert(0, "en_US".to_string());
        }

        Ok(Self {
            site_url,
            admin_path: std::env::var("ADMIN_PATH").unwrap_or_else(|_| "/wp-admin".to_string()),
            async_path: std::env::var("ASYNC_PATH")
                .unwrap_or_else(|_| "/wp-admin/admin-ajax.php".to_string()),

            options_file: std::env::var("OPTIONS_FILE")
                .unwrap_or_else(|_| "wpm-options.json".to_string()),

            installed_locales,
            redirect_to_browser_language: bool_var("REDIRECT_TO_BROWSER_LANGUAGE", true)?,

            post_types: list_var("POST_TYPES", &["post", "page", "attachment"]),
            taxonomies: list_var("TAXONOMIES", &["category", "post_tag"]),
            multisite: bool_var("MULTISITE", false)?,

            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }
}

/// Comma separated list; blank entries are dropped.
fn list_var(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(value) => value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn bool_var(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => bail!("{} must be a boolean, got '{}'", name, other),
        },
        Err(_) => Ok(default),
    }
}
