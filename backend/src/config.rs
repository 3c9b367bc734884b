//! Service configuration.
//!
//! Settings come from an optional TOML file (`relay.toml`, or the path in
//! `RELAY_CONFIG`) and are then overridden by environment variables:
//!
//! - `HOST`, `PORT`: listening address (default `0.0.0.0:5000`)
//! - `IMAGERY_SERVICE`: `local` or `remote`
//! - `IMAGERY_COLLECTION`, `CLOUD_COVER_PROPERTY`: scene collection and its
//!   cloud-cover attribute
//! - `REGION_COLLECTION`, `REGION_NAME_FIELD`: region table and name attribute
//! - `DEFAULT_LON`, `DEFAULT_LAT`, `DEFAULT_BUFFER_METERS`: fallback AOI
//! - `CREDENTIALS_PATH`: service-account key file for the remote service
//! - `REMOTE_BASE_URL`, `REMOTE_TIMEOUT_SECS`: remote endpoint and per-call bound

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::remote::ServiceType;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub imagery: ImagerySettings,
    #[serde(default)]
    pub remote: RemoteSettings,
}

/// Listening address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Remote collection identifiers and the fallback area of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagerySettings {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_cloud_property")]
    pub cloud_property: String,
    #[serde(default = "default_region_collection")]
    pub region_collection: String,
    #[serde(default = "default_region_name_field")]
    pub region_name_field: String,
    #[serde(default = "default_lon")]
    pub default_lon: f64,
    #[serde(default = "default_lat")]
    pub default_lat: f64,
    #[serde(default = "default_buffer_meters")]
    pub default_buffer_meters: f64,
}

impl Default for ImagerySettings {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            cloud_property: default_cloud_property(),
            region_collection: default_region_collection(),
            region_name_field: default_region_name_field(),
            default_lon: default_lon(),
            default_lat: default_lat(),
            default_buffer_meters: default_buffer_meters(),
        }
    }
}

/// Remote service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// `local` or `remote`. When unset, `remote` is chosen if a credentials
    /// path is configured.
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            service_type: None,
            credentials_path: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_collection() -> String {
    "COPERNICUS/S2_SR_HARMONIZED".to_string()
}

fn default_cloud_property() -> String {
    "CLOUDY_PIXEL_PERCENTAGE".to_string()
}

fn default_region_collection() -> String {
    "projects/kenya/assets/counties".to_string()
}

fn default_region_name_field() -> String {
    "COUNTY_NAM".to_string()
}

// Nairobi
fn default_lon() -> f64 {
    36.8219
}

fn default_lat() -> f64 {
    -1.2921
}

fn default_buffer_meters() -> f64 {
    50_000.0
}

fn default_base_url() -> String {
    "https://imagery.example.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

const DEFAULT_CONFIG_PATHS: [&str; 3] = ["relay.toml", "backend/relay.toml", "../relay.toml"];

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file named by `RELAY_CONFIG`, else the first `relay.toml` in
    /// the standard locations, else defaults; then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("RELAY_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables onto the current values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        override_string("HOST", &mut self.server.host);
        override_parsed("PORT", &mut self.server.port)?;

        override_string("IMAGERY_COLLECTION", &mut self.imagery.collection);
        override_string("CLOUD_COVER_PROPERTY", &mut self.imagery.cloud_property);
        override_string("REGION_COLLECTION", &mut self.imagery.region_collection);
        override_string("REGION_NAME_FIELD", &mut self.imagery.region_name_field);
        override_parsed("DEFAULT_LON", &mut self.imagery.default_lon)?;
        override_parsed("DEFAULT_LAT", &mut self.imagery.default_lat)?;
        override_parsed("DEFAULT_BUFFER_METERS", &mut self.imagery.default_buffer_meters)?;

        if let Ok(value) = env::var("IMAGERY_SERVICE") {
            self.remote.service_type = Some(value);
        }
        if let Ok(value) = env::var("CREDENTIALS_PATH") {
            self.remote.credentials_path = Some(PathBuf::from(value));
        }
        override_string("REMOTE_BASE_URL", &mut self.remote.base_url);
        override_parsed("REMOTE_TIMEOUT_SECS", &mut self.remote.timeout_secs)?;
        self.validate()
    }

    /// A zero timeout would fail every remote call.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REMOTE_TIMEOUT_SECS",
                value: self.remote.timeout_secs.to_string(),
            });
        }
        Ok(())
    }

    /// Which imagery service implementation to build.
    pub fn service_type(&self) -> Result<ServiceType, ConfigError> {
        match &self.remote.service_type {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "IMAGERY_SERVICE",
                value: value.clone(),
            }),
            None if self.remote.credentials_path.is_some() => Ok(ServiceType::Remote),
            None => Ok(ServiceType::Local),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidValue {
            key: "HOST",
            value: addr,
        })
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

fn override_string(key: &'static str, target: &mut String) {
    if let Ok(value) = env::var(key) {
        *target = value;
    }
}

fn override_parsed<T: FromStr>(key: &'static str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(value) = env::var(key) {
        *target = value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value })?;
    }
    Ok(())
}
