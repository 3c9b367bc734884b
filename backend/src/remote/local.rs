//! In-memory imagery service for local development and tests.
//!
//! Regions are polygons, scenes are footprints with an acquisition date and a
//! cloud-cover percentage. Queries are evaluated the way the remote service
//! would: spatial intersection, inclusive date range, exclusive cloud bound.

use async_trait::async_trait;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::{ErrorContext, RemoteError, RemoteResult};
use super::service::ImageryService;
use crate::config::ImagerySettings;
use crate::enhancement::KNOWN_BANDS;
use crate::models::{
    AreaOfInterest, BoundingBox, ImageExpression, MapId, SceneFilter, VisualizationRequest,
};

/// A named region polygon.
#[derive(Debug, Clone)]
pub struct LocalRegion {
    pub name: String,
    pub geometry: serde_json::Value,
}

impl LocalRegion {
    pub fn from_bounds(name: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            name: name.into(),
            geometry: bounds.to_geometry(),
        }
    }

    fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_geometry(&self.geometry)
    }
}

/// A single acquisition in the imagery collection.
#[derive(Debug, Clone)]
pub struct LocalScene {
    pub id: String,
    pub footprint: BoundingBox,
    pub date: NaiveDate,
    pub cloud_cover: f64,
}

/// In-memory [`ImageryService`].
pub struct LocalImageryService {
    settings: ImagerySettings,
    regions: Vec<LocalRegion>,
    scenes: Vec<LocalScene>,
    maps_requested: AtomicUsize,
}

impl LocalImageryService {
    /// Create an empty service.
    pub fn new(settings: ImagerySettings) -> Self {
        Self {
            settings,
            regions: Vec::new(),
            scenes: Vec::new(),
            maps_requested: AtomicUsize::new(0),
        }
    }

    /// Create a service seeded with a handful of Kenyan counties and two
    /// years of monthly scenes over each of them.
    pub fn with_sample_data(settings: ImagerySettings) -> Self {
        let regions = [
            ("Nairobi", BoundingBox::new(36.66, -1.44, 37.10, -1.16)),
            ("Mombasa", BoundingBox::new(39.56, -4.14, 39.76, -3.96)),
            ("Kisumu", BoundingBox::new(34.45, -0.45, 35.45, 0.05)),
            ("Nakuru", BoundingBox::new(35.50, -1.10, 36.60, 0.25)),
            ("Turkana", BoundingBox::new(34.00, 1.70, 36.30, 5.00)),
        ];

        let mut service = Self::new(settings);
        for (name, bounds) in regions {
            service = service.with_region(LocalRegion::from_bounds(name, bounds));
        }

        for (region_idx, (name, bounds)) in regions.iter().enumerate() {
            for year in [2022, 2023] {
                for month in 1..=12u32 {
                    // Deterministic spread of cloud cover between 5% and 75%.
                    let cloud_cover = 5.0 + ((month as usize * 7 + region_idx * 13) % 71) as f64;
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, 15) {
                        service = service.with_scene(LocalScene {
                            id: format!("{}_{}_{:02}", name.to_uppercase(), year, month),
                            footprint: *bounds,
                            date,
                            cloud_cover,
                        });
                    }
                }
            }
        }
        service
    }

    pub fn with_region(mut self, region: LocalRegion) -> Self {
        self.regions.push(region);
        self
    }

    pub fn with_scene(mut self, scene: LocalScene) -> Self {
        self.scenes.push(scene);
        self
    }

    /// Number of tile handles issued so far.
    pub fn maps_requested(&self) -> usize {
        self.maps_requested.load(Ordering::SeqCst)
    }

    fn area_bounds(&self, area: &AreaOfInterest) -> RemoteResult<Option<BoundingBox>> {
        match area {
            AreaOfInterest::Region { name, geometry } => {
                BoundingBox::from_geometry(geometry).map(Some).ok_or_else(|| {
                    RemoteError::query_with_context(
                        "Region geometry has no coordinates",
                        ErrorContext::new("area_bounds").with_entity("region").with_entity_id(name),
                    )
                })
            }
            AreaOfInterest::BufferedPoint {
                lon,
                lat,
                radius_meters,
            } => Ok(Some(BoundingBox::around_point(*lon, *lat, *radius_meters))),
            AreaOfInterest::Collection { collection } => {
                self.check_region_collection(collection)?;
                // The whole collection: match any scene touching any region.
                Ok(None)
            }
        }
    }

    fn check_region_collection(&self, collection: &str) -> RemoteResult<()> {
        if collection != self.settings.region_collection {
            return Err(RemoteError::query_with_context(
                format!("Table not found: {}", collection),
                ErrorContext::new("region_lookup").with_entity("table").with_entity_id(collection),
            ));
        }
        Ok(())
    }

    fn matching_scenes<'s: 'f, 'f>(
        &'s self,
        filter: &'f SceneFilter,
    ) -> RemoteResult<impl Iterator<Item = &'s LocalScene> + 'f> {
        if filter.collection != self.settings.collection {
            return Err(RemoteError::query_with_context(
                format!("ImageCollection not found: {}", filter.collection),
                ErrorContext::new("count_scenes")
                    .with_entity("collection")
                    .with_entity_id(&filter.collection),
            ));
        }
        if filter.cloud_property != self.settings.cloud_property {
            return Err(RemoteError::query(format!(
                "Unknown scene property: {}",
                filter.cloud_property
            )));
        }

        let area = self.area_bounds(&filter.region)?;
        let region_bounds: Vec<BoundingBox> =
            self.regions.iter().filter_map(LocalRegion::bounds).collect();

        Ok(self.scenes.iter().filter(move |scene| {
            let in_area = match &area {
                Some(bounds) => bounds.intersects(&scene.footprint),
                None => region_bounds.iter().any(|b| b.intersects(&scene.footprint)),
            };
            in_area
                && filter.date_range.contains(scene.date)
                && scene.cloud_cover < filter.max_cloud_cover
        }))
    }

    fn check_vis_bands(request: &VisualizationRequest) -> RemoteResult<()> {
        let available: Vec<&str> = match &request.image {
            ImageExpression::Rename { name, .. } => vec![name.as_str()],
            _ => KNOWN_BANDS.to_vec(),
        };
        if let Some(missing) = request
            .vis_params
            .bands
            .iter()
            .find(|band| !available.contains(&band.as_str()))
        {
            return Err(RemoteError::query_with_context(
                format!("Image has no band '{}'", missing),
                ErrorContext::new("get_map").with_entity("band").with_entity_id(missing),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ImageryService for LocalImageryService {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn region_features(&self) -> RemoteResult<serde_json::Value> {
        let field = &self.settings.region_name_field;
        let features: Vec<serde_json::Value> = self
            .regions
            .iter()
            .map(|region| {
                serde_json::json!({
                    "type": "Feature",
                    "geometry": region.geometry,
                    "properties": { field.as_str(): region.name },
                })
            })
            .collect();

        Ok(serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }

    async fn region_names(&self) -> RemoteResult<Vec<String>> {
        let mut names: Vec<String> = self.regions.iter().map(|r| r.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn find_region(&self, name: &str) -> RemoteResult<Option<serde_json::Value>> {
        Ok(self
            .regions
            .iter()
            .find(|region| region.name == name)
            .map(|region| region.geometry.clone()))
    }

    async fn count_scenes(&self, filter: &SceneFilter) -> RemoteResult<u64> {
        Ok(self.matching_scenes(filter)?.count() as u64)
    }

    async fn get_map(&self, request: &VisualizationRequest) -> RemoteResult<MapId> {
        if self.matching_scenes(request.image.filter())?.next().is_none() {
            return Err(RemoteError::query(
                "Image.reduce: cannot reduce an empty collection",
            )
            .with_operation("get_map"));
        }
        Self::check_vis_bands(request)?;

        let digest = Sha256::digest(serde_json::to_vec(request)?);
        let hash = hex::encode(digest);
        self.maps_requested.fetch_add(1, Ordering::SeqCst);

        let mapid = format!("projects/local/maps/{}", &hash[..32]);
        Ok(MapId {
            url_format: format!("local://{}/tiles/{{z}}/{{x}}/{{y}}", mapid),
            token: hash[32..48].to_string(),
            mapid,
        })
    }

    async fn download_url(&self, area: &AreaOfInterest) -> RemoteResult<String> {
        let collection = &self.settings.region_collection;
        match area {
            AreaOfInterest::Region { name, .. } => Ok(format!(
                "local://tables/{}/features?{}={}&format=geojson",
                collection, self.settings.region_name_field, name
            )),
            AreaOfInterest::Collection { collection: requested } => {
                self.check_region_collection(requested)?;
                Ok(format!("local://tables/{}/features?format=geojson", collection))
            }
            AreaOfInterest::BufferedPoint { .. } => Err(RemoteError::query(
                "Table export needs a region or the whole region table",
            )
            .with_operation("download_url")),
        }
    }

    async fn health_check(&self) -> RemoteResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, Reducer, VisParams};

    fn service() -> LocalImageryService {
        LocalImageryService::with_sample_data(ImagerySettings::default())
    }

    fn filter(region: AreaOfInterest, year: i32, max_cloud_cover: f64) -> SceneFilter {
        let settings = ImagerySettings::default();
        SceneFilter {
            collection: settings.collection,
            region,
            date_range: DateRange::for_year(year).unwrap(),
            cloud_property: settings.cloud_property,
            max_cloud_cover,
        }
    }

    async fn region(service: &LocalImageryService, name: &str) -> AreaOfInterest {
        AreaOfInterest::Region {
            name: name.to_string(),
            geometry: service.find_region(name).await.unwrap().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_region_names_sorted() {
        let names = service().region_names().await.unwrap();
        assert_eq!(names, vec!["Kisumu", "Mombasa", "Nairobi", "Nakuru", "Turkana"]);
    }

    #[tokio::test]
    async fn test_region_features_use_name_field() {
        let fc = service().region_features().await.unwrap();
        assert_eq!(fc["type"], "FeatureCollection");
        assert_eq!(fc["features"].as_array().unwrap().len(), 5);
        assert!(fc["features"][0]["properties"]["COUNTY_NAM"].is_string());
    }

    #[tokio::test]
    async fn test_find_region_is_exact_match() {
        let service = service();
        assert!(service.find_region("Nairobi").await.unwrap().is_some());
        assert!(service.find_region("nairobi").await.unwrap().is_none());
        assert!(service.find_region("Atlantis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_scenes_filters() {
        let service = service();
        let nairobi = region(&service, "Nairobi").await;

        assert_eq!(service.count_scenes(&filter(nairobi.clone(), 2022, 100.0)).await.unwrap(), 12);
        assert_eq!(service.count_scenes(&filter(nairobi.clone(), 2021, 100.0)).await.unwrap(), 0);
        assert_eq!(service.count_scenes(&filter(nairobi.clone(), 2022, 0.0)).await.unwrap(), 0);

        let partial = service.count_scenes(&filter(nairobi, 2022, 40.0)).await.unwrap();
        assert_eq!(partial, 6);
    }

    #[tokio::test]
    async fn test_count_scenes_exclusive_cloud_bound() {
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let service = LocalImageryService::new(ImagerySettings::default())
            .with_region(LocalRegion::from_bounds("Square", bounds))
            .with_scene(LocalScene {
                id: "S1".to_string(),
                footprint: bounds,
                date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
                cloud_cover: 20.0,
            });
        let square = region(&service, "Square").await;

        assert_eq!(service.count_scenes(&filter(square.clone(), 2022, 20.0)).await.unwrap(), 0);
        assert_eq!(service.count_scenes(&filter(square, 2022, 20.5)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_regions_do_not_share_scenes() {
        let service = service();
        let mombasa = region(&service, "Mombasa").await;
        let bounds = BoundingBox::from_geometry(match &mombasa {
            AreaOfInterest::Region { geometry, .. } => geometry,
            _ => unreachable!(),
        })
        .unwrap();
        let hits: Vec<&LocalScene> = service
            .matching_scenes(&filter(mombasa, 2022, 100.0))
            .unwrap()
            .collect();
        assert_eq!(hits.len(), 12);
        assert!(hits.iter().all(|s| s.id.starts_with("MOMBASA") && s.footprint == bounds));
    }

    #[tokio::test]
    async fn test_collection_area_matches_every_region() {
        let service = service();
        let all = AreaOfInterest::Collection {
            collection: ImagerySettings::default().region_collection,
        };
        assert_eq!(service.count_scenes(&filter(all, 2023, 100.0)).await.unwrap(), 60);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_query_error() {
        let service = service();
        let mut f = filter(region(&service, "Nairobi").await, 2022, 50.0);
        f.collection = "LANDSAT/LC08".to_string();
        let err = service.count_scenes(&f).await.unwrap_err();
        assert!(matches!(err, RemoteError::Query { .. }));
    }

    fn composite_request(filter: SceneFilter, bands: &[&str]) -> VisualizationRequest {
        VisualizationRequest {
            image: ImageExpression::Composite {
                filter,
                reducer: Reducer::Median,
            },
            vis_params: VisParams {
                bands: bands.iter().map(|b| b.to_string()).collect(),
                min: 0.0,
                max: 3000.0,
                gamma: Some(1.4),
                palette: None,
            },
        }
    }

    #[tokio::test]
    async fn test_get_map_is_deterministic() {
        let service = service();
        let f = filter(region(&service, "Nairobi").await, 2022, 50.0);
        let first = service.get_map(&composite_request(f.clone(), &["B4", "B3", "B2"])).await.unwrap();
        let second = service.get_map(&composite_request(f.clone(), &["B4", "B3", "B2"])).await.unwrap();
        let other = service.get_map(&composite_request(f, &["B8", "B4", "B3"])).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first.mapid, other.mapid);
        assert!(first.url_format.contains("{z}/{x}/{y}"));
        assert_eq!(service.maps_requested(), 3);
    }

    #[tokio::test]
    async fn test_get_map_refuses_empty_collection() {
        let service = service();
        let f = filter(region(&service, "Nairobi").await, 2022, 0.0);
        let err = service.get_map(&composite_request(f, &["B4", "B3", "B2"])).await.unwrap_err();
        assert!(err.to_string().contains("empty collection"));
        assert_eq!(service.maps_requested(), 0);
    }

    #[tokio::test]
    async fn test_get_map_checks_bands() {
        let service = service();
        let f = filter(region(&service, "Nairobi").await, 2022, 50.0);
        let err = service.get_map(&composite_request(f, &["NDVI"])).await.unwrap_err();
        assert!(err.to_string().contains("NDVI"));
    }

    #[tokio::test]
    async fn test_download_urls() {
        let service = service();
        let nairobi = region(&service, "Nairobi").await;
        let url = service.download_url(&nairobi).await.unwrap();
        assert!(url.contains("COUNTY_NAM=Nairobi"));

        let all = AreaOfInterest::Collection {
            collection: ImagerySettings::default().region_collection,
        };
        let url = service.download_url(&all).await.unwrap();
        assert!(url.ends_with("features?format=geojson"));

        let point = AreaOfInterest::BufferedPoint {
            lon: 0.0,
            lat: 0.0,
            radius_meters: 10.0,
        };
        assert!(service.download_url(&point).await.is_err());
    }
}
