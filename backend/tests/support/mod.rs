#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use imagery_relay::config::ServiceConfig;
use imagery_relay::http::{create_router, AppState};
use imagery_relay::models::{AreaOfInterest, MapId, SceneFilter, VisualizationRequest};
use imagery_relay::remote::{ImageryService, LocalImageryService, RemoteError, RemoteResult};
use imagery_relay::services::ImageryContext;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with the given variables set (`Some`) or removed (`None`),
/// restoring them afterwards. Calls are serialized because the environment
/// is process-global.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::apply(changes);
    f()
}

struct ScopedEnv {
    previous: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let previous = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect();

        for (key, value) in changes {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        Self { previous }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Seeded local service plus a router that is already ready.
pub fn ready_app() -> (Router, Arc<LocalImageryService>) {
    let config = ServiceConfig::default();
    let service = Arc::new(LocalImageryService::with_sample_data(config.imagery.clone()));
    let state = AppState::ready(ImageryContext::new(service.clone(), &config));
    (create_router(state), service)
}

/// Router over an arbitrary service.
pub fn app_with(service: Arc<dyn ImageryService>) -> Router {
    let config = ServiceConfig::default();
    create_router(AppState::ready(ImageryContext::new(service, &config)))
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: impl Into<String>) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Service that knows one region, reports scenes everywhere, and fails
/// every tile and listing request.
#[derive(Default)]
pub struct FailingTileService {
    pub map_calls: AtomicUsize,
}

#[async_trait]
impl ImageryService for FailingTileService {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn region_features(&self) -> RemoteResult<serde_json::Value> {
        Err(RemoteError::connection("connection reset").with_operation("region_features"))
    }

    async fn region_names(&self) -> RemoteResult<Vec<String>> {
        Err(RemoteError::authentication("token revoked"))
    }

    async fn find_region(&self, name: &str) -> RemoteResult<Option<serde_json::Value>> {
        Ok((name == "Nairobi").then(|| {
            serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[36.66, -1.44], [37.10, -1.44], [37.10, -1.16], [36.66, -1.16], [36.66, -1.44]]]
            })
        }))
    }

    async fn count_scenes(&self, _filter: &SceneFilter) -> RemoteResult<u64> {
        Ok(4)
    }

    async fn get_map(&self, _request: &VisualizationRequest) -> RemoteResult<MapId> {
        self.map_calls.fetch_add(1, Ordering::SeqCst);
        Err(RemoteError::query("User memory limit exceeded").with_operation("get_map"))
    }

    async fn download_url(&self, _area: &AreaOfInterest) -> RemoteResult<String> {
        Err(RemoteError::query("export disabled"))
    }

    async fn health_check(&self) -> RemoteResult<bool> {
        Ok(false)
    }
}
