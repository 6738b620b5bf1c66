use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::appliance::ApplianceId;

/// Symmetric interval around a point forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn around(center: f64, half_width: f64) -> Self {
        Self {
            lower: center - half_width,
            upper: center + half_width,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub predicted: f64,
    pub interval: ConfidenceInterval,
}

/// Predicted consumption for one appliance over a horizon.
///
/// Besides the points themselves the forecast keeps the cadence, seasonal
/// period and fitted trend it was produced with, so consumers can extend or
/// score it without refitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub appliance_id: ApplianceId,
    pub cadence_secs: i64,
    pub seasonal_period: usize,
    /// Trend change per step, kWh.
    pub trend_slope: f64,
    /// Trend value at the last historical sample, kWh per step.
    pub trend_level: f64,
    pub confidence_level: f64,
    pub horizon: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn cadence(&self) -> Duration {
        Duration::seconds(self.cadence_secs)
    }

    pub fn total_kwh(&self) -> f64 {
        self.horizon.iter().map(|p| p.predicted).sum()
    }
}
