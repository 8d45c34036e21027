mod error;
mod rest;
mod types;

pub use error::{ApiError, ApiResult};
pub use rest::{RestApi, METRICS_CONTENT_TYPE};
pub use types::*;

use crate::aggregate::MetricsAggregator;
use crate::auth::Authenticator;
use crate::metrics::{CachePolicy, ExportConfig, MetricsCache};
use crate::store::ObjectStore;
use crate::upload::{PinningService, UploadService};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ObjectStore,
    pub uploads: UploadService,
    pub metrics: MetricsCache,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(
        store: ObjectStore,
        pinning: Arc<dyn PinningService>,
        auth: Arc<dyn Authenticator>,
        export: ExportConfig,
        policy: CachePolicy,
    ) -> Self {
        let metrics = MetricsCache::new(MetricsAggregator::new(store.clone()), export, policy);
        let uploads = UploadService::new(store.clone(), pinning);
        Self {
            store,
            uploads,
            metrics,
            auth,
        }
    }

    /// Give each listed host its own metrics cache entry
    pub fn with_metrics_origins(mut self, origins: Vec<String>) -> Self {
        self.metrics = MetricsCache::with_origins(
            MetricsAggregator::new(self.store.clone()),
            self.metrics.export_config().clone(),
            *self.metrics.policy(),
            origins,
        );
        self
    }
}

/// Create the complete API server
pub fn create_api_server(state: AppState) -> Router {
    let rest_api = RestApi::new(state);

    // Metrics are scraped cross-origin by dashboards
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(rest_api.router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerTokenAuth;
    use crate::store::{ScanConfig, Stores};
    use crate::upload::LocalPinning;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        AppState::new(
            ObjectStore::new(Stores::in_memory(), ScanConfig::default()),
            Arc::new(LocalPinning),
            Arc::new(BearerTokenAuth::default()),
            ExportConfig::default(),
            CachePolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_api_server_creation() {
        let app = create_api_server(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let app = create_api_server(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .header("origin", "https://dashboard.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
