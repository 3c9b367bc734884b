//! Imagery service factory.
//!
//! Builds the [`ImageryService`] selected by configuration. Building the
//! remote client includes loading credentials and the first token exchange,
//! so a successful `create` means the service is ready for requests.

use std::str::FromStr;
use std::sync::Arc;

use super::error::{RemoteError, RemoteResult};
use super::local::LocalImageryService;
use super::service::ImageryService;
use crate::config::ServiceConfig;

/// Imagery service implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// Seeded in-memory service
    Local,
    /// Remote HTTP API with service-account authentication
    Remote,
}

impl FromStr for ServiceType {
    type Err = String;

    /// Parse service type from string ("local", "remote"/"http").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "remote" | "http" => Ok(Self::Remote),
            _ => Err(format!("Unknown imagery service type: {}", s)),
        }
    }
}

/// Factory for imagery service instances.
pub struct ServiceFactory;

impl ServiceFactory {
    /// Create the service selected by `config`.
    pub async fn create(config: &ServiceConfig) -> RemoteResult<Arc<dyn ImageryService>> {
        let service_type = config
            .service_type()
            .map_err(|e| RemoteError::configuration(e.to_string()))?;

        match service_type {
            ServiceType::Local => Ok(Self::create_local(config)),
            ServiceType::Remote => Self::create_remote(config).await,
        }
    }

    /// Create the seeded in-memory service.
    pub fn create_local(config: &ServiceConfig) -> Arc<dyn ImageryService> {
        Arc::new(LocalImageryService::with_sample_data(config.imagery.clone()))
    }

    /// Load credentials and authenticate against the remote service.
    #[cfg(feature = "remote-service")]
    pub async fn create_remote(config: &ServiceConfig) -> RemoteResult<Arc<dyn ImageryService>> {
        use super::credentials::ServiceAccountKey;
        use super::http::HttpImageryService;

        let path = config.remote.credentials_path.as_ref().ok_or_else(|| {
            RemoteError::configuration("Remote imagery service requires CREDENTIALS_PATH")
        })?;
        let key = ServiceAccountKey::from_file(path)?;

        let service = HttpImageryService::connect(
            key,
            config.remote.base_url.clone(),
            config.imagery.clone(),
            config.remote_timeout(),
        )
        .await?;
        Ok(Arc::new(service))
    }

    #[cfg(not(feature = "remote-service"))]
    pub async fn create_remote(_config: &ServiceConfig) -> RemoteResult<Arc<dyn ImageryService>> {
        Err(RemoteError::configuration(
            "Remote imagery service feature not enabled",
        ))
    }
}
