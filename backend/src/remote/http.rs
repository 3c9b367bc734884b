//! Production client for the remote imagery service.
//!
//! Talks JSON over HTTPS. Every request carries a bearer token obtained with
//! the JWT-bearer grant from the service-account key; tokens are cached until
//! shortly before they expire.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::credentials::ServiceAccountKey;
use super::error::{ErrorContext, RemoteError, RemoteResult};
use super::service::ImageryService;
use crate::config::ImagerySettings;
use crate::models::{AreaOfInterest, MapId, SceneFilter, VisualizationRequest};

/// OAuth scope requested for imagery access.
pub const IMAGERY_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens are refreshed this many seconds before their stated expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: i64,
}

impl AccessToken {
    fn is_fresh(&self, now: i64) -> bool {
        now + TOKEN_EXPIRY_MARGIN_SECS < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadResponse {
    download_url: String,
}

#[derive(Debug, Serialize)]
struct PropertyFilter<'a> {
    property: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct ExportRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<PropertyFilter<'a>>,
    format: &'static str,
}

/// [`ImageryService`] backed by the remote HTTP API.
pub struct HttpImageryService {
    client: Client,
    base_url: String,
    settings: ImagerySettings,
    key: ServiceAccountKey,
    token: Mutex<Option<AccessToken>>,
}

impl HttpImageryService {
    /// Build the client and authenticate once. Fails if the token exchange
    /// is rejected.
    pub async fn connect(
        key: ServiceAccountKey,
        base_url: impl Into<String>,
        settings: ImagerySettings,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        let service = Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
            key,
            token: Mutex::new(None),
        };
        service.bearer_token().await?;
        info!(
            account = %service.key.client_email,
            base_url = %service.base_url,
            "Authenticated against remote imagery service"
        );
        Ok(service)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn bearer_token(&self) -> RemoteResult<String> {
        let now = chrono::Utc::now().timestamp();
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self, now: i64) -> RemoteResult<AccessToken> {
        debug!(token_uri = %self.key.token_uri, "Requesting access token");
        let assertion = self.key.assertion(IMAGERY_SCOPE, now)?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| RemoteError::from(e).with_operation("fetch_token"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<empty response>".to_string());

        if !status.is_success() {
            return Err(RemoteError::Authentication {
                message: format!("Token request failed ({}): {}", status, body.trim()),
                context: ErrorContext::new("fetch_token").with_entity_id(&self.key.client_email),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            RemoteError::authentication(format!("Failed to parse token response: {}", e))
                .with_operation("fetch_token")
        })?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> RemoteResult<T> {
        let token = self.bearer_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RemoteError::from(e).with_operation(operation))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::from(e).with_operation(operation))?;

        if !status.is_success() {
            return Err(status_error(operation, status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            RemoteError::InvalidResponse {
                message: format!("Failed to decode response: {}", e),
                context: ErrorContext::new(operation).with_details(truncate(&body, 200)),
            }
        })
    }

    async fn features(
        &self,
        operation: &'static str,
        filter: Option<PropertyFilter<'_>>,
    ) -> RemoteResult<serde_json::Value> {
        let url = self.endpoint(&format!("tables/{}/features", self.settings.region_collection));
        let mut request = self.client.get(url);
        if let Some(filter) = filter {
            request = request.query(&[("property", filter.property), ("value", filter.value)]);
        }
        self.send(operation, request).await
    }
}

fn status_error(operation: &'static str, status: StatusCode, body: &str) -> RemoteError {
    let message = format!("Remote service returned {}: {}", status, truncate(body.trim(), 500));
    let context = ErrorContext::new(operation).with_details(format!("status={}", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Authentication { message, context }
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => RemoteError::Query {
            message,
            context: context.retryable(),
        },
        _ => RemoteError::Query { message, context },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn feature_names(collection: &serde_json::Value, field: &str) -> Vec<String> {
    collection["features"]
        .as_array()
        .map(|features| {
            features
                .iter()
                .filter_map(|f| f["properties"][field].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ImageryService for HttpImageryService {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[instrument(skip(self))]
    async fn region_features(&self) -> RemoteResult<serde_json::Value> {
        self.features("region_features", None).await
    }

    #[instrument(skip(self))]
    async fn region_names(&self) -> RemoteResult<Vec<String>> {
        let collection = self.features("region_names", None).await?;
        let mut names = feature_names(&collection, &self.settings.region_name_field);
        names.sort();
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn find_region(&self, name: &str) -> RemoteResult<Option<serde_json::Value>> {
        let collection = self
            .features(
                "find_region",
                Some(PropertyFilter {
                    property: &self.settings.region_name_field,
                    value: name,
                }),
            )
            .await
            .map_err(|e| e.with_entity("region", name))?;

        Ok(collection["features"]
            .as_array()
            .and_then(|features| features.first())
            .map(|feature| feature["geometry"].clone()))
    }

    #[instrument(skip(self, filter), fields(collection = %filter.collection))]
    async fn count_scenes(&self, filter: &SceneFilter) -> RemoteResult<u64> {
        let url = self.endpoint(&format!("collections/{}:count", filter.collection));
        let response: CountResponse = self
            .send("count_scenes", self.client.post(url).json(filter))
            .await?;
        Ok(response.count)
    }

    #[instrument(skip(self, request))]
    async fn get_map(&self, request: &VisualizationRequest) -> RemoteResult<MapId> {
        let url = self.endpoint("maps");
        self.send("get_map", self.client.post(url).json(request)).await
    }

    #[instrument(skip(self, area), fields(area = %area.describe()))]
    async fn download_url(&self, area: &AreaOfInterest) -> RemoteResult<String> {
        let filter = match area {
            AreaOfInterest::Region { name, .. } => Some(PropertyFilter {
                property: &self.settings.region_name_field,
                value: name,
            }),
            AreaOfInterest::Collection { .. } => None,
            AreaOfInterest::BufferedPoint { .. } => {
                return Err(RemoteError::query(
                    "Table export needs a region or the whole region table",
                )
                .with_operation("download_url"))
            }
        };

        let url = self.endpoint(&format!("tables/{}:export", self.settings.region_collection));
        let body = ExportRequest {
            filter,
            format: "GeoJSON",
        };
        let response: DownloadResponse = self
            .send("download_url", self.client.post(url).json(&body))
            .await?;
        Ok(response.download_url)
    }

    async fn health_check(&self) -> RemoteResult<bool> {
        self.bearer_token().await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness_margin() {
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: 1000,
        };
        assert!(token.is_fresh(900));
        assert!(!token.is_fresh(940));
        assert!(!token.is_fresh(1000));
    }

    #[test]
    fn test_status_error_classification() {
        let err = status_error("get_map", StatusCode::FORBIDDEN, "denied");
        assert!(matches!(err, RemoteError::Authentication { .. }));

        let err = status_error("get_map", StatusCode::SERVICE_UNAVAILABLE, "busy");
        assert!(err.is_retryable());

        let err = status_error("count_scenes", StatusCode::BAD_REQUEST, "bad filter");
        assert!(matches!(err, RemoteError::Query { .. }));
        assert!(!err.is_retryable());
        assert_eq!(err.context().details.as_deref(), Some("status=400"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ñandú ñandú", 5), "ñandú...");
    }

    #[test]
    fn test_feature_names() {
        let fc = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "properties": { "COUNTY_NAM": "Nairobi" } },
                { "properties": { "OTHER": "x" } },
                { "properties": { "COUNTY_NAM": "Kisumu" } }
            ]
        });
        assert_eq!(feature_names(&fc, "COUNTY_NAM"), vec!["Nairobi", "Kisumu"]);
        assert!(feature_names(&serde_json::json!({}), "COUNTY_NAM").is_empty());
    }

    #[test]
    fn test_export_request_shape() {
        let body = ExportRequest {
            filter: Some(PropertyFilter {
                property: "COUNTY_NAM",
                value: "Nairobi",
            }),
            format: "GeoJSON",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["filter"]["value"], "Nairobi");

        let whole = ExportRequest {
            filter: None,
            format: "GeoJSON",
        };
        assert!(serde_json::to_value(&whole).unwrap().get("filter").is_none());
    }
}
