//! Request-level business logic.
//!
//! Everything here runs against an [`ImageryContext`], the ready client
//! handle produced by one-time initialization. Remote calls are made in a
//! fixed order per request (region lookup, scene count, tile handle), each
//! bounded by the configured timeout.

pub mod analysis;
pub mod palette;
pub mod query;
pub mod region;
pub mod regions;

pub use analysis::run_analysis;
pub use palette::ColorCycle;
pub use query::QueryBuilder;
pub use region::{RegionFallback, RegionResolver, WHOLE_AREA_LABEL};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ImagerySettings, ServiceConfig};
use crate::remote::ImageryService;

/// An initialized imagery service plus the settings needed to query it.
#[derive(Clone)]
pub struct ImageryContext {
    pub service: Arc<dyn ImageryService>,
    pub settings: Arc<ImagerySettings>,
    /// Upper bound for each individual remote call.
    pub timeout: Duration,
}

impl ImageryContext {
    pub fn new(service: Arc<dyn ImageryService>, config: &ServiceConfig) -> Self {
        Self {
            service,
            settings: Arc::new(config.imagery.clone()),
            timeout: config.remote_timeout(),
        }
    }

    pub fn regions(&self) -> RegionResolver<'_> {
        RegionResolver::new(self)
    }

    pub fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}

impl std::fmt::Debug for ImageryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageryContext")
            .field("service", &self.service.name())
            .field("settings", &self.settings)
            .field("timeout", &self.timeout)
            .finish()
    }
}
