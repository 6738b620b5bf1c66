pub mod anomaly;
pub mod billing;
pub mod config;
pub mod engine;
pub mod forecast;
pub mod http;
pub mod ingest;
pub mod metrics_server;
pub mod observability;
pub mod recommend;
pub mod service;
pub mod timeseries;

pub use engine::Engine;
pub use service::AnalyticsService;
