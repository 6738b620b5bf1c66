use anyhow::Result;
use analytics_service::{
    config::AppConfig, engine::Engine, http, metrics_server, observability,
    service::AnalyticsService,
};
use std::sync::Arc;
use wattlab_client::history::SnapshotStore;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let history = SnapshotStore::load(&cfg.history.snapshot_path)?;
    tracing::info!(path = %cfg.history.snapshot_path, "history snapshot loaded");

    let service = AnalyticsService::new(Arc::new(Engine::new(cfg.analytics)), Arc::new(history));
    http::serve(&cfg.server.http_bind_addr, service).await
}
