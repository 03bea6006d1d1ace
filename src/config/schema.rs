//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section is defaulted, so an empty file is a valid config.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::SiteMeta;
use crate::handlers::CacheConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Listener and HTTP limits.
    pub server: ServerConfig,

    /// Routes directory and site metadata.
    pub site: SiteSettings,

    /// Ambient handler cache defaults.
    pub cache: CacheConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Development settings.
    pub dev: DevConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000").
    pub bind_address: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Site settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SiteSettings {
    /// Directory holding the route hierarchy.
    pub routes_dir: PathBuf,

    /// Mount point: empty, or a relative path ending with `/` (e.g. `app/`).
    pub prefix: String,

    /// File name that marks a directory as having handlers.
    pub handler_file: String,

    pub title: String,
    pub description: String,
    pub noscript_message: String,

    /// Show error details in 500 responses.
    pub debug: bool,

    /// Path suffix → content type. Defaults to `.json` in debug mode.
    pub intercept_extensions: Option<BTreeMap<String, String>>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        let meta = SiteMeta::default();
        Self {
            routes_dir: PathBuf::from("routes"),
            prefix: String::new(),
            handler_file: crate::routes::builder::DEFAULT_HANDLER_FILE.to_string(),
            title: meta.title,
            description: meta.description,
            noscript_message: meta.noscript_message,
            debug: false,
            intercept_extensions: None,
        }
    }
}

impl SiteSettings {
    pub fn meta(&self) -> SiteMeta {
        SiteMeta {
            title: self.title.clone(),
            description: self.description.clone(),
            noscript_message: self.noscript_message.clone(),
        }
    }

    /// Configured extensions, or `.json` when debugging.
    pub fn intercept_extensions(&self) -> BTreeMap<String, String> {
        match &self.intercept_extensions {
            Some(map) => map.clone(),
            None if self.debug => {
                BTreeMap::from([(".json".to_string(), "application/json".to_string())])
            }
            None => BTreeMap::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus scrape address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Development settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DevConfig {
    /// Rebuild routes when the routes directory changes.
    pub watch: bool,

    /// Quiet period before rebuilding, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            watch: false,
            debounce_ms: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.site.handler_file, "handlers.rs");
        assert_eq!(config.cache.vary_on, vec!["Accept".to_string()]);
    }

    #[test]
    fn test_parse_sections() {
        let config: SiteConfig = toml::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:9000"

            [site]
            routes_dir = "src/routes"
            prefix = "app/"
            debug = true

            [cache]
            cache_time = 60
            vary_on = ["Accept", "Cookie"]

            [cache.cache_control]
            must-revalidate = ""

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.site.routes_dir, PathBuf::from("src/routes"));
        assert_eq!(config.cache.cache_time, Some(60));
        assert_eq!(config.cache.vary_on.len(), 2);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(
            config.site.intercept_extensions().get(".json").map(String::as_str),
            Some("application/json")
        );
    }
}
