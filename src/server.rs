//! Read-only HTTP surface over the analysis snapshot.
//!
//! The snapshot is shared behind an `Arc` and replaced wholesale on refresh,
//! so handlers always see either the old table or the new one, never a
//! partial rebuild.

use crate::constants::DEFAULT_FORECAST_PERIODS;
use crate::insights;
use crate::observability;
use crate::pipeline::{self, loader::FeedReader};
use crate::snapshot::AnalysisSnapshot;
use axum::{
    extract::Query,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state: the live snapshot plus the feed reader used to
/// rebuild it on demand.
pub struct AppState {
    snapshot: RwLock<Arc<AnalysisSnapshot>>,
    reader: Arc<dyn FeedReader>,
}

impl AppState {
    pub fn new(snapshot: AnalysisSnapshot, reader: Arc<dyn FeedReader>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            reader,
        }
    }

    /// Current snapshot. Cheap: clones an `Arc`, never the table.
    pub fn snapshot(&self) -> Arc<AnalysisSnapshot> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    /// Re-runs the pipeline and atomically publishes the new snapshot.
    pub async fn refresh(&self) -> Arc<AnalysisSnapshot> {
        let rebuilt = Arc::new(pipeline::run(self.reader.as_ref()).await);
        *self.snapshot.write().expect("snapshot lock poisoned") = rebuilt.clone();
        rebuilt
    }
}

#[derive(Debug, Deserialize)]
struct DistrictFilter {
    district: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastParams {
    district: Option<String>,
    periods: Option<usize>,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "govoptima",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> impl IntoResponse {
    match observability::render_metrics() {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
    }
}

async fn districts(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "districts": state.snapshot().districts() }))
}

async fn stats(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DistrictFilter>,
) -> impl IntoResponse {
    Json(state.snapshot().district_stats(params.district.as_deref()))
}

async fn stress_heatmap(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot().stress_heatmap())
}

async fn deep_dive(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DistrictFilter>,
) -> impl IntoResponse {
    // A missing district param behaves like an unmatched district: a
    // well-formed placeholder, not an error
    let district = params.district.unwrap_or_default();
    Json(state.snapshot().deep_dive(&district))
}

async fn forecast(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ForecastParams>,
) -> impl IntoResponse {
    let district = params.district.unwrap_or_default();
    let periods = params.periods.unwrap_or(DEFAULT_FORECAST_PERIODS);
    Json(state.snapshot().forecast(&district, periods))
}

async fn trends(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DistrictFilter>,
) -> impl IntoResponse {
    Json(state.snapshot().trends(params.district.as_deref()))
}

async fn resource_recommendations(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(insights::resource_recommendations(&state.snapshot()))
}

async fn migration_alerts(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(insights::migration_alerts(&state.snapshot()))
}

async fn cost_analysis(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(insights::cost_analysis(&state.snapshot()))
}

async fn efficiency_metrics(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(insights::efficiency_metrics(&state.snapshot()))
}

async fn export_report(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let csv = insights::export_report_csv(&state.snapshot());
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=govoptima_analytics_report.csv",
            ),
        ],
        csv,
    )
}

async fn refresh(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.refresh().await;
    Json(serde_json::json!({
        "rows": snapshot.rows().len(),
        "districts": snapshot.districts().len(),
        "degraded_sources": snapshot.degraded_sources(),
        "built_at": snapshot.built_at(),
    }))
}

/// Create the HTTP server with all routes.
pub fn create_server(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/districts", get(districts))
        .route("/api/stats", get(stats))
        .route("/api/stress_heatmap", get(stress_heatmap))
        .route("/api/deep_dive", get(deep_dive))
        .route("/api/forecast", get(forecast))
        .route("/api/trends", get(trends))
        .route("/api/resource_recommendations", get(resource_recommendations))
        .route("/api/migration_alerts", get(migration_alerts))
        .route("/api/cost_analysis", get(cost_analysis))
        .route("/api/efficiency_metrics", get(efficiency_metrics))
        .route("/api/export_report", get(export_report))
        .route("/api/refresh", post(refresh))
        .layer(ServiceBuilder::new().layer(cors).layer(Extension(state)))
}

/// Bind and serve until shutdown.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<(), hyper::Error> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Analytics API listening on http://{}", addr);
    Server::bind(&addr).serve(app.into_make_service()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::loader::InMemoryFeedReader;
    use crate::types::{FeedFrame, FeedRecord, SourceKind};
    use chrono::NaiveDate;

    fn enrollment_frame() -> FeedFrame {
        FeedFrame {
            source: SourceKind::Enrollment,
            columns: vec!["age_0_5".to_string()],
            rows: vec![FeedRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, 10),
                district: "Pune".to_string(),
                counters: [("age_0_5".to_string(), 5.0)].into(),
            }],
        }
    }

    #[tokio::test]
    async fn refresh_swaps_the_snapshot_atomically() {
        let reader = Arc::new(InMemoryFeedReader::new(vec![enrollment_frame()]));
        let state = AppState::new(AnalysisSnapshot::empty(), reader);

        let before = state.snapshot();
        assert!(before.rows().is_empty());

        let after = state.refresh().await;
        assert_eq!(after.rows().len(), 1);
        assert_eq!(state.snapshot().rows().len(), 1);
        // The old snapshot is untouched; readers holding it stay consistent
        assert!(before.rows().is_empty());
    }
}
