use serde::Deserialize;
use std::fs;

use crate::anomaly::DetectorConfig;
use crate::billing::BillingConfig;
use crate::forecast::ForecasterConfig;
use crate::recommend::RecommenderConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub http_bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// JSON snapshot of users, appliances and readings.
    pub snapshot_path: String,
}

/// Tuning for the four analytics operations. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub forecast: ForecasterConfig,
    pub anomaly: DetectorConfig,
    pub recommend: RecommenderConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("WATTLAB_CONFIG").unwrap_or_else(|_| "wattlab-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {path}: {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattlab_client::domain::ApplianceCategory;

    #[test]
    fn minimal_config_uses_analytics_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [server]
            http_bind_addr = "127.0.0.1:5000"

            [history]
            snapshot_path = "data/snapshot.json"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.server.http_bind_addr, "127.0.0.1:5000");
        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.analytics, AnalyticsConfig::default());
    }

    #[test]
    fn analytics_sections_override_selected_fields() {
        let cfg = AppConfig::from_toml(
            r#"
            [server]
            http_bind_addr = "0.0.0.0:5000"

            [metrics]
            bind_addr = "0.0.0.0:9100"

            [history]
            snapshot_path = "snapshot.json"

            [analytics.forecast]
            confidence_level = 0.9
            max_gap_ratio = 0.1

            [analytics.anomaly]
            sensitivity = 2.5
            window = 12

            [analytics.recommend.efficiency_savings]
            hvac = 0.2
            "#,
        )
        .expect("parse");
        let analytics = &cfg.analytics;
        assert_eq!(analytics.forecast.confidence_level, 0.9);
        assert_eq!(analytics.forecast.max_gap_ratio, 0.1);
        assert_eq!(analytics.forecast.default_horizon, ForecasterConfig::default().default_horizon);
        assert_eq!(analytics.anomaly.sensitivity, 2.5);
        assert_eq!(analytics.anomaly.window, Some(12));
        assert_eq!(
            analytics.recommend.efficiency_savings.get(&ApplianceCategory::Hvac),
            Some(&0.2)
        );
        assert_eq!(analytics.billing, BillingConfig::default());
        assert_eq!(cfg.metrics.map(|m| m.bind_addr).as_deref(), Some("0.0.0.0:9100"));
    }

    #[test]
    fn missing_server_section_is_an_error() {
        let res = AppConfig::from_toml("[history]\nsnapshot_path = \"x.json\"\n");
        assert!(res.is_err());
    }
}
