//! Server configuration.
//!
//! Loaded from TOML, then overridden by environment variables. Every field has a
//! default, so an absent file is equivalent to an empty one.

use crate::error::Result;
use crate::registry::{
    DEFAULT_LOCALE, ExtractOptions, FileSource, HttpSource, RELEASE_SCHEMA, RegistrySource,
};
use crate::schema::{DEFAULT_MAX_DEPTH, MAX_SCHEMA_DEPTH};
use crate::search::MAX_RESULTS;
use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Explicit configuration file path.
pub const CONFIG_ENV: &str = "EXTENSION_SEARCH_CONFIG";
pub const REGISTRY_URL_ENV: &str = "EXTENSION_SEARCH_REGISTRY_URL";
pub const REGISTRY_PATH_ENV: &str = "EXTENSION_SEARCH_REGISTRY_PATH";
pub const LOCALE_ENV: &str = "EXTENSION_SEARCH_LOCALE";

pub const DEFAULT_REGISTRY_URL: &str = "https://extensions.open-contracting.org/extensions.json";
pub const DEFAULT_EXPLORER_URL: &str = "https://extensions.open-contracting.org/en/extensions";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Registry document URL.
    pub registry_url: String,
    /// Local registry document; takes precedence over `registry_url`.
    pub registry_path: Option<PathBuf>,
    /// Preferred locale for names, schemas and codelists.
    pub locale: String,
    /// Schema documents flattened for each extension.
    pub schema_files: Vec<String>,
    /// Maximum results per query, capped at 1000.
    pub result_limit: usize,
    /// Nesting guard for schema documents, at most 100.
    pub max_schema_depth: usize,
    /// Number of query results kept per index generation.
    pub query_cache_size: usize,
    /// Seconds between background refreshes; 0 disables them.
    pub refresh_interval_secs: u64,
    /// HTTP timeout for registry fetches.
    pub request_timeout_secs: u64,
    /// Base URL for extension links in rendered results.
    pub explorer_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_path: None,
            locale: DEFAULT_LOCALE.to_string(),
            schema_files: vec![RELEASE_SCHEMA.to_string()],
            result_limit: MAX_RESULTS,
            max_schema_depth: DEFAULT_MAX_DEPTH,
            query_cache_size: 128,
            refresh_interval_secs: 24 * 60 * 60,
            request_timeout_secs: 30,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `$EXTENSION_SEARCH_CONFIG`, the user config directory,
    /// or defaults, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(REGISTRY_URL_ENV) {
            self.registry_url = url;
        }
        if let Some(path) = lookup(REGISTRY_PATH_ENV) {
            self.registry_path = Some(PathBuf::from(path));
        }
        if let Some(locale) = lookup(LOCALE_ENV) {
            self.locale = locale;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.result_limit == 0 {
            bail!("result_limit must be at least 1");
        }
        if self.max_schema_depth == 0 || self.max_schema_depth > MAX_SCHEMA_DEPTH {
            bail!(
                "max_schema_depth must be between 1 and {} (got {})",
                MAX_SCHEMA_DEPTH,
                self.max_schema_depth
            );
        }
        if self.query_cache_size == 0 {
            bail!("query_cache_size must be at least 1");
        }
        if self.schema_files.is_empty() {
            tracing::warn!("No schema files configured; only codelists will be indexed");
        }
        Ok(())
    }

    /// Effective per-query result bound.
    pub fn result_limit(&self) -> usize {
        self.result_limit.min(MAX_RESULTS)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            locale: self.locale.clone(),
            schema_files: self.schema_files.clone(),
            max_schema_depth: self.max_schema_depth,
        }
    }

    /// The registry source this configuration points at.
    pub fn source(&self) -> Result<Arc<dyn RegistrySource>> {
        let source: Arc<dyn RegistrySource> = match &self.registry_path {
            Some(path) => Arc::new(FileSource::new(path)),
            None => Arc::new(HttpSource::new(
                &self.registry_url,
                Duration::from_secs(self.request_timeout_secs),
            )?),
        };
        Ok(source)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

/// `$EXTENSION_SEARCH_CONFIG`, else `<config dir>/extension-search/config.toml` if it exists.
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("extension-search").join("config.toml"))
        .filter(|path| path.is_file())
}
