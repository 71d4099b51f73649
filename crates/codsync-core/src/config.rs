//! Configuration types for codsync components.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::CodType;

/// HTTP client configuration for external API calls.
///
/// TODO(config): Support environment variables `HTTP_TIMEOUT` and
/// `HTTP_MAX_RETRIES`; the upstream ArcGIS endpoints occasionally need a
/// longer timeout than the default.
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Base URLs of the upstream geoservice folders and the population API.
///
/// The two boundary URLs are ArcGIS REST service folders queried with
/// `?f=pjson`. The population URL is a template with `/iso` and `/adm/`
/// placeholders substituted per country and administrative level.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceUrls {
    pub boundaries: String,
    pub edge_match: String,
    pub population: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            boundaries: "https://gistmaps.itos.uga.edu/arcgis/rest/services/COD_External"
                .to_string(),
            edge_match: "https://gistmaps.itos.uga.edu/arcgis/rest/services/COD_External_Edgematch"
                .to_string(),
            population:
                "https://apps.itos.uga.edu/CODV2API/api/v1/themes/cod-ps/lookup/Get/adm/do/iso"
                    .to_string(),
        }
    }
}

impl ServiceUrls {
    /// Base URL for the given dataset category.
    pub fn for_type(&self, cod_type: CodType) -> &str {
        match cod_type {
            CodType::Boundaries => &self.boundaries,
            CodType::EdgeMatch => &self.edge_match,
            CodType::Population => &self.population,
        }
    }
}

/// Top-level configuration file contents.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_urls: ServiceUrls,
    /// HXL-tagged country export; may instead come from the CLI.
    pub countries_url: Option<String>,
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("codsync").join("config.toml"))
}

/// Loads configuration from `path`, or from [`default_config_path`] when no
/// path is given.
///
/// A missing file at the default location falls back to built-in defaults;
/// an explicitly requested path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let path = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(AppError::ConfigError(format!(
                    "{}: file not found",
                    explicit.display()
                )));
            }
            explicit.to_path_buf()
        }
        None => match default_config_path() {
            Some(default) if default.exists() => default,
            _ => return Ok(AppConfig::default()),
        },
    };

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))?;

    toml::from_str(&raw).map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))
}
