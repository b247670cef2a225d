//! Shared API state.

use std::sync::Arc;

use wizard_core::repository::CatalogRepository;
use wizard_core::service::AggregationService;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub aggregation: Arc<AggregationService>,
    pub catalog: Arc<dyn CatalogRepository>,
}

impl AppState {
    pub fn new(aggregation: Arc<AggregationService>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self {
            aggregation,
            catalog,
        }
    }
}
