//! Seasonal-trend consumption forecaster.
//!
//! The history is gap-filled, decomposed into trend + seasonal + residual,
//! and extrapolated: a least-squares line through the interior trend,
//! plus the seasonal indices repeated cyclically. The interval half-width
//! grows with the square root of the step index.

use serde::Deserialize;
use time::Duration;
use wattlab_client::domain::{ApplianceId, ConfidenceInterval, ConsumptionSeries, Forecast, ForecastPoint};
use wattlab_client::{AnalyticsError, Result};

use crate::timeseries::{self, Decomposition};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Overrides the period inferred from the sampling cadence.
    pub seasonal_period: Option<usize>,
    /// Minimum history in whole periods; values below 2 are raised to 2.
    pub min_history_periods: usize,
    pub max_gap_ratio: f64,
    pub confidence_level: f64,
    /// Lower bound on the residual spread used for intervals, kWh.
    pub interval_floor_kwh: f64,
    /// Horizon used when a caller does not ask for one.
    pub default_horizon: usize,
    /// Longest horizon accepted, in steps.
    pub max_horizon: usize,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            seasonal_period: None,
            min_history_periods: 2,
            max_gap_ratio: 0.2,
            confidence_level: 0.95,
            interval_floor_kwh: 0.01,
            default_horizon: 24,
            max_horizon: 31 * 96,
        }
    }
}

/// Two-sided normal quantiles for the supported confidence levels.
const Z_TABLE: [(f64, f64); 4] = [(0.80, 1.282), (0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

fn z_for(confidence_level: f64) -> Option<f64> {
    Z_TABLE
        .iter()
        .find(|(level, _)| (level - confidence_level).abs() < 1e-9)
        .map(|&(_, z)| z)
}

#[derive(Debug, Clone, Copy)]
struct TrendLine {
    intercept: f64,
    slope: f64,
}

impl TrendLine {
    fn at(&self, idx: usize) -> f64 {
        self.intercept + self.slope * idx as f64
    }
}

fn fit_trend(d: &Decomposition) -> TrendLine {
    let range = d.interior();
    let xs: Vec<f64> = range.clone().map(|i| i as f64).collect();
    let ys = &d.trend[range];

    let x_mean = timeseries::mean(&xs);
    let y_mean = timeseries::mean(ys);
    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            (sxy + (x - x_mean) * (y - y_mean), sxx + (x - x_mean).powi(2))
        });

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    TrendLine {
        intercept: y_mean - slope * x_mean,
        slope,
    }
}

/// Forecast `horizon_length` steps of consumption for one appliance.
pub fn predict(
    appliance_id: &ApplianceId,
    history: &ConsumptionSeries,
    horizon_length: usize,
    config: &ForecasterConfig,
) -> Result<Forecast> {
    if horizon_length == 0 {
        return Err(AnalyticsError::InvalidInput(
            "horizon length must be at least 1".to_string(),
        ));
    }
    if horizon_length > config.max_horizon {
        return Err(AnalyticsError::InvalidInput(format!(
            "horizon length {horizon_length} exceeds the maximum of {}",
            config.max_horizon
        )));
    }
    let z = z_for(config.confidence_level).ok_or_else(|| {
        AnalyticsError::InvalidInput(format!(
            "unsupported confidence level {}; use 0.80, 0.90, 0.95 or 0.99",
            config.confidence_level
        ))
    })?;

    let cadence = timeseries::infer_cadence(history)?;
    let filled = timeseries::fill_gaps(history, config.max_gap_ratio)?;

    let period = config
        .seasonal_period
        .filter(|p| *p > 0)
        .unwrap_or_else(|| timeseries::seasonal_period_for(cadence));
    let required = (period * config.min_history_periods.max(2)).max(3);
    if filled.len() < required {
        return Err(AnalyticsError::InsufficientData {
            required,
            got: filled.len(),
        });
    }

    let decomposition = timeseries::decompose_values(&filled.values(), period)?;
    let line = fit_trend(&decomposition);
    let sigma = timeseries::std_dev(&decomposition.residual[decomposition.interior()])
        .max(config.interval_floor_kwh);

    // Steps count from the last real reading, not from its snapped slot.
    let last_idx = filled.len() - 1;
    let last_ts = match history.last() {
        Some(s) => s.timestamp,
        None => return Err(AnalyticsError::InsufficientData { required, got: 0 }),
    };
    let cadence_secs = cadence.whole_seconds();

    let horizon = (1..=horizon_length)
        .map(|step| {
            let idx = last_idx + step;
            let predicted = (line.at(idx) + decomposition.seasonal_at(idx)).max(0.0);
            let half_width = z * sigma * (step as f64).sqrt();
            ForecastPoint {
                timestamp: last_ts + Duration::seconds(cadence_secs * step as i64),
                predicted,
                interval: ConfidenceInterval::around(predicted, half_width),
            }
        })
        .collect();

    tracing::debug!(
        appliance_id = %appliance_id,
        period,
        slope = line.slope,
        sigma,
        horizon_length,
        "forecast fitted"
    );

    Ok(Forecast {
        appliance_id: appliance_id.clone(),
        cadence_secs,
        seasonal_period: period,
        trend_slope: line.slope,
        trend_level: line.at(last_idx),
        confidence_level: config.confidence_level,
        horizon,
    })
}
