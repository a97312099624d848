//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{DeletionScope, Generation};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker serves, e.g. `https://example.com`.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path under the origin the app lives at. Starts and ends with `/`.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Prefix shared by every cache store this deployment owns.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache version. Changing it creates a new generation and evicts
    /// the previous one on the next activation.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths, relative to `scope`, that must be cached at install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Document served for failed HTML navigations, relative to `scope`.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// URL schemes the worker never intercepts.
    #[serde(default = "default_bypass_schemes")]
    pub bypass_schemes: Vec<String>,

    /// Delete every non-current store on activation, not only stores
    /// carrying `cache_prefix`.
    #[serde(default)]
    pub purge_foreign_stores: bool,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Host-level HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Title used for push notifications.
    #[serde(default = "default_app_title")]
    pub app_title: String,

    /// Notification body when a push carries no payload.
    #[serde(default = "default_push_body")]
    pub push_default_body: String,

    /// Notification icon and badge, relative to `scope`.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Background sync tag the worker reacts to.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_scope() -> String {
    "/fortune-learning-pwa/".into()
}

fn default_cache_prefix() -> String {
    "fortune-learning-cache".into()
}

fn default_cache_version() -> String {
    "v1.0.2".into()
}

fn default_precache() -> Vec<String> {
    [
        "",
        "index.html",
        "style.css",
        "app.js",
        "manifest.json",
        "icons/icon-192.png",
        "icons/icon-512.png",
        "icons/apple-touch-icon.png",
        "icons/favicon.ico",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_document() -> String {
    "index.html".into()
}

fn default_bypass_schemes() -> Vec<String> {
    vec!["chrome-extension".into()]
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_app_title() -> String {
    "Fortune Learning".into()
}

fn default_push_body() -> String {
    "New content is available in the knowledge base!".into()
}

fn default_notification_icon() -> String {
    "icons/icon-192.png".into()
}

fn default_sync_tag() -> String {
    "sync-data".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            scope: default_scope(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            offline_document: default_offline_document(),
            bypass_schemes: default_bypass_schemes(),
            purge_foreign_stores: false,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            app_title: default_app_title(),
            push_default_body: default_push_body(),
            notification_icon: default_notification_icon(),
            sync_tag: default_sync_tag(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The generation this configuration deploys.
    pub fn generation(&self) -> Generation {
        Generation::new(&self.cache_prefix, &self.cache_version)
    }

    pub fn deletion_scope(&self) -> DeletionScope {
        if self.purge_foreign_stores { DeletionScope::AllForeign } else { DeletionScope::OwnedPrefix }
    }

    /// The configured origin as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Absolute URL of the app root (origin + scope).
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })
    }

    /// Resolve a path relative to the app root.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.scope_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "path".into(), reason: format!("{path}: {e}") })
    }

    /// Absolute URLs of the precache manifest, in manifest order.
    pub fn precache_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.precache.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn offline_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.offline_document)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var_os("SWCACHE_CONFIG_FILE").map(PathBuf::from);
        Self::load_with(config_file.as_deref())
    }

    /// Load configuration using an explicit TOML file instead of
    /// `SWCACHE_CONFIG_FILE`. Environment variables still take precedence.
    pub fn load_with(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./swcache.sqlite"));
        assert_eq!(config.cache_version, "v1.0.2");
        assert_eq!(config.precache.len(), 9);
        assert_eq!(config.bypass_schemes, vec!["chrome-extension".to_string()]);
        assert!(!config.purge_foreign_stores);
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_generation_from_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation().store_name(), "fortune-learning-cache-v1.0.2");
        assert_eq!(config.deletion_scope(), DeletionScope::OwnedPrefix);

        let config = AppConfig { purge_foreign_stores: true, ..Default::default() };
        assert_eq!(config.deletion_scope(), DeletionScope::AllForeign);
    }

    #[test]
    fn test_precache_urls_resolve_against_scope() {
        let config = AppConfig { origin: "https://example.com".into(), ..Default::default() };
        let urls = config.precache_urls().unwrap();
        assert_eq!(urls[0].as_str(), "https://example.com/fortune-learning-pwa/");
        assert_eq!(urls[1].as_str(), "https://example.com/fortune-learning-pwa/index.html");
        assert_eq!(urls[5].as_str(), "https://example.com/fortune-learning-pwa/icons/icon-192.png");
        assert_eq!(config.offline_url().unwrap(), urls[1]);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_load_layers_env_over_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swcache.toml",
                r#"
                cache_version = "v2"
                origin = "https://app.example"
                "#,
            )?;
            jail.set_env("SWCACHE_CONFIG_FILE", "swcache.toml");
            jail.set_env("SWCACHE_CACHE_VERSION", "v3");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.cache_version, "v3");
            assert_eq!(config.origin, "https://app.example");
            assert_eq!(config.cache_prefix, "fortune-learning-cache");
            Ok(())
        });
    }

    #[test]
    fn test_load_with_explicit_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", r#"cache_prefix = "custom""#)?;
            let config = AppConfig::load_with(Some(Path::new("custom.toml"))).expect("config loads");
            assert_eq!(config.cache_prefix, "custom");
            assert_eq!(config.generation().store_name(), "custom-v1.0.2");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SWCACHE_TIMEOUT_MS", "50");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
