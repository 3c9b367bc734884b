//! The seam between the relay and the remote imagery service.

use async_trait::async_trait;

use super::error::RemoteResult;
use crate::models::{AreaOfInterest, MapId, SceneFilter, VisualizationRequest};

/// Operations the relay needs from the remote imagery service.
///
/// Implementations are constructed already authenticated; holding an
/// `ImageryService` means the one-time initialization has completed.
#[async_trait]
pub trait ImageryService: Send + Sync {
    /// Short identifier of the implementation, for logs and health output.
    fn name(&self) -> &'static str;

    /// Every feature of the region collection as a GeoJSON FeatureCollection.
    async fn region_features(&self) -> RemoteResult<serde_json::Value>;

    /// Region names in ascending, case-sensitive order.
    async fn region_names(&self) -> RemoteResult<Vec<String>>;

    /// Geometry of the first region whose name attribute equals `name`.
    async fn find_region(&self, name: &str) -> RemoteResult<Option<serde_json::Value>>;

    /// Number of scenes matching `filter`.
    async fn count_scenes(&self, filter: &SceneFilter) -> RemoteResult<u64>;

    /// Evaluate the request and return a tile-serving handle.
    async fn get_map(&self, request: &VisualizationRequest) -> RemoteResult<MapId>;

    /// URL from which the region table restricted to `area` can be
    /// downloaded as GeoJSON.
    async fn download_url(&self, area: &AreaOfInterest) -> RemoteResult<String>;

    /// Cheap reachability probe.
    async fn health_check(&self) -> RemoteResult<bool>;
}
