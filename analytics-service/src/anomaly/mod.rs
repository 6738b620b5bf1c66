//! Rolling-baseline anomaly detection.
//!
//! Point anomalies compare each sample with the mean and spread of the
//! trailing window; sustained drift compares consecutive window means.

use serde::Deserialize;
use wattlab_client::domain::{
    Anomaly, AnomalyKind, AnomalyReport, AnomalySpan, ApplianceId, ConsumptionSeries,
};
use wattlab_client::{AnalyticsError, Result};

use crate::timeseries;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Baseline window in samples; defaults to one seasonal period.
    pub window: Option<usize>,
    /// `k`: how many standard deviations make a spike or drop.
    pub sensitivity: f64,
    /// |z| at which severity saturates to 1.
    pub z_cap: f64,
    /// Spread floor relative to the baseline mean.
    pub min_sigma_ratio: f64,
    /// Absolute spread floor, kWh.
    pub min_sigma_kwh: f64,
    /// Relative change between window means that counts as drift.
    pub drift_threshold: f64,
    pub min_drift_windows: usize,
    /// Relative change at which drift severity saturates to 1.
    pub drift_saturation: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: None,
            sensitivity: 3.0,
            z_cap: 6.0,
            min_sigma_ratio: 0.05,
            min_sigma_kwh: 1e-3,
            drift_threshold: 0.3,
            min_drift_windows: 3,
            drift_saturation: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Flag {
    idx: usize,
    kind: AnomalyKind,
    z: f64,
    baseline: f64,
}

fn score_points(values: &[f64], window: usize, config: &DetectorConfig) -> Vec<Flag> {
    let mut flags = Vec::new();
    for idx in window..values.len() {
        let trailing = &values[idx - window..idx];
        let mu = timeseries::mean(trailing);
        let sigma = timeseries::std_dev(trailing)
            .max(config.min_sigma_ratio * mu.abs())
            .max(config.min_sigma_kwh);
        let z = (values[idx] - mu) / sigma;

        let kind = if z > config.sensitivity {
            AnomalyKind::Spike
        } else if z < -config.sensitivity {
            AnomalyKind::Drop
        } else {
            continue;
        };
        flags.push(Flag {
            idx,
            kind,
            z,
            baseline: mu,
        });
    }
    flags
}

/// Merge consecutive flags of the same kind into one anomaly.
fn merge_runs(series: &ConsumptionSeries, flags: &[Flag], config: &DetectorConfig) -> Vec<Anomaly> {
    let samples = series.samples();
    let mut anomalies = Vec::new();
    let mut start = 0;

    while start < flags.len() {
        let mut end = start + 1;
        while end < flags.len()
            && flags[end].idx == flags[end - 1].idx + 1
            && flags[end].kind == flags[start].kind
        {
            end += 1;
        }

        let run = &flags[start..end];
        let peak = run
            .iter()
            .copied()
            .reduce(|a, b| if b.z.abs() > a.z.abs() { b } else { a })
            .unwrap_or(run[0]);
        let excess_kwh: f64 = run.iter().map(|f| samples[f.idx].value - f.baseline).sum();
        let first_ts = samples[run[0].idx].timestamp;
        let span = if run.len() == 1 {
            AnomalySpan::Point {
                timestamp: first_ts,
            }
        } else {
            AnomalySpan::Window {
                start: first_ts,
                end: samples[run[run.len() - 1].idx].timestamp,
            }
        };

        anomalies.push(Anomaly {
            span,
            kind: run[0].kind,
            severity: (peak.z.abs() / config.z_cap).min(1.0),
            observed: samples[peak.idx].value,
            expected: peak.baseline,
            excess_kwh,
        });
        start = end;
    }

    anomalies
}

/// Runs of windows whose means all moved away from the window just before
/// the run, by more than the threshold and in the same direction.
///
/// The reference window must itself agree with its predecessor, so a
/// return to normal after a one-window excursion is not reported as drift.
fn detect_drift(series: &ConsumptionSeries, window: usize, config: &DetectorConfig) -> Vec<Anomaly> {
    let samples = series.samples();
    let values = series.values();
    let count = values.len() / window;
    let offset = values.len() - count * window;
    let means: Vec<f64> = (0..count)
        .map(|j| timeseries::mean(&values[offset + j * window..offset + (j + 1) * window]))
        .collect();

    let relative = |from: usize, to: usize| {
        (means[to] - means[from]) / means[from].abs().max(config.min_sigma_kwh)
    };
    let min_windows = config.min_drift_windows.max(1);

    let mut anomalies = Vec::new();
    let mut j = 1;
    while j < count {
        let reference = j - 1;
        let stable_reference =
            reference == 0 || relative(reference - 1, reference).abs() <= config.drift_threshold;
        let first = relative(reference, j);
        if !stable_reference || first.abs() <= config.drift_threshold {
            j += 1;
            continue;
        }

        let mut len = 1;
        while j + len < count {
            let r = relative(reference, j + len);
            if r.abs() <= config.drift_threshold || r.signum() != first.signum() {
                break;
            }
            len += 1;
        }

        if len < min_windows {
            j += 1;
            continue;
        }

        let drifted = timeseries::mean(&means[j..j + len]);
        let expected = means[reference];
        let change = (drifted - expected) / expected.abs().max(config.min_sigma_kwh);
        anomalies.push(Anomaly {
            span: AnomalySpan::Window {
                start: samples[offset + j * window].timestamp,
                end: samples[offset + (j + len) * window - 1].timestamp,
            },
            kind: AnomalyKind::SustainedDrift,
            severity: (change.abs() / config.drift_saturation).min(1.0),
            observed: drifted,
            expected,
            excess_kwh: (drifted - expected) * (len * window) as f64,
        });
        j += len;
    }

    anomalies
}

/// Score `series` against its rolling baseline.
pub fn detect(
    appliance_id: &ApplianceId,
    series: &ConsumptionSeries,
    config: &DetectorConfig,
) -> Result<AnomalyReport> {
    let window = match config.window.filter(|w| *w > 0) {
        Some(w) => w,
        None => timeseries::seasonal_period_for(timeseries::infer_cadence(series)?),
    }
    .max(2);

    if series.len() < window {
        return Err(AnalyticsError::InsufficientData {
            required: window,
            got: series.len(),
        });
    }

    let flags = score_points(&series.values(), window, config);
    let mut anomalies = merge_runs(series, &flags, config);
    anomalies.extend(detect_drift(series, window, config));
    anomalies.sort_by(|a, b| a.span.start().cmp(&b.span.start()).then(a.kind.cmp(&b.kind)));

    if !anomalies.is_empty() {
        tracing::debug!(
            appliance_id = %appliance_id,
            window,
            count = anomalies.len(),
            "anomalies detected"
        );
    }

    Ok(AnomalyReport {
        appliance_id: appliance_id.clone(),
        anomalies,
    })
}
