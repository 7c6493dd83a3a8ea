//! HTTP surface: chart endpoints, self metrics and the static file fallback.

pub mod chart;
pub mod params;

use std::path::Path;
use std::sync::Arc;

use axum::{http::header::CONTENT_TYPE, response::IntoResponse, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::metrics::gather_text;
use crate::pipeline::{ChartBuilder, StyleConfig};
use crate::query::PrometheusClient;
use crate::render::PlottersRenderer;
use crate::{ChartError, Result};

#[derive(Clone)]
pub struct AppState {
    pub charts: ChartBuilder,
    /// Fixed upstream credential; overrides the caller's header when set.
    pub credential: Option<String>,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/chart.svg", get(chart::chart_svg))
        .route("/chart.png", get(chart::chart_png))
        .route("/metrics", get(metrics))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn metrics() -> Result<impl IntoResponse> {
    let body = gather_text()?;
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

pub async fn serve(config: Config) -> Result<()> {
    let charts = ChartBuilder::new(
        Arc::new(PrometheusClient::new(config.backend.clone())),
        Arc::new(PlottersRenderer::new()),
        Arc::new(StyleConfig::default()),
    );
    let state = AppState {
        charts,
        credential: config.credential.clone(),
    };
    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| ChartError::Internal(format!("Failed to bind {}: {}", config.listen_addr, e)))?;

    info!(
        addr = %config.listen_addr,
        backend = %config.backend,
        static_dir = %config.static_dir.display(),
        "Chart server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| ChartError::Internal(format!("Server error: {}", e)))
}
