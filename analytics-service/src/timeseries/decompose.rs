use std::ops::Range;

use serde::Serialize;
use wattlab_client::domain::ConsumptionSeries;
use wattlab_client::{AnalyticsError, Result};

use super::{infer_cadence, mean, resample, seasonal_period_for};

/// Additive decomposition `value = trend + seasonal + residual`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub period: usize,
    /// One centred index per phase of the period, summing to zero.
    pub seasonal_indices: Vec<f64>,
    interior_start: usize,
    interior_end: usize,
}

impl Decomposition {
    /// Indices where the moving-average trend is fully defined (the edges
    /// are extended copies).
    pub fn interior(&self) -> Range<usize> {
        self.interior_start..self.interior_end
    }

    /// Seasonal contribution at any index, including past the input.
    pub fn seasonal_at(&self, idx: usize) -> f64 {
        self.seasonal_indices[idx % self.period]
    }

    pub fn len(&self) -> usize {
        self.trend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }
}

/// Decompose a series after resampling it onto its own dominant cadence.
/// The period is inferred from that cadence.
pub fn decompose(series: &ConsumptionSeries) -> Result<Decomposition> {
    let cadence = infer_cadence(series)?;
    let regular = resample(series, cadence)?;
    decompose_values(&regular.values(), seasonal_period_for(cadence))
}

/// Classical additive decomposition of evenly spaced values.
///
/// Trend is a centred moving average over one period (a 2xm average for
/// even periods, a 3-point average when there is no seasonality); the edges
/// repeat the nearest defined value. Seasonal indices are the mean
/// detrended value per phase over the interior, centred to sum to zero.
/// Needs at least two full periods.
pub fn decompose_values(values: &[f64], period: usize) -> Result<Decomposition> {
    let period = period.max(1);
    let window = if period >= 2 { period } else { 3 };
    let required = (2 * period).max(window);
    let n = values.len();
    if n < required {
        return Err(AnalyticsError::InsufficientData { required, got: n });
    }

    let half = window / 2;
    let interior = half..n - half;

    let mut trend = vec![0.0; n];
    for i in interior.clone() {
        trend[i] = if window % 2 == 1 {
            mean(&values[i - half..=i + half])
        } else {
            let inner: f64 = values[i - half + 1..i + half].iter().sum();
            (0.5 * values[i - half] + inner + 0.5 * values[i + half]) / window as f64
        };
    }
    let head = trend[interior.start];
    let tail = trend[interior.end - 1];
    trend[..interior.start].fill(head);
    trend[interior.end..].fill(tail);

    let mut seasonal_indices = vec![0.0; period];
    if period >= 2 {
        let mut sums = vec![0.0; period];
        let mut counts = vec![0usize; period];
        for i in interior.clone() {
            sums[i % period] += values[i] - trend[i];
            counts[i % period] += 1;
        }
        for (idx, (sum, count)) in seasonal_indices.iter_mut().zip(sums.iter().zip(&counts)) {
            *idx = if *count > 0 { sum / *count as f64 } else { 0.0 };
        }
        let offset = mean(&seasonal_indices);
        for idx in &mut seasonal_indices {
            *idx -= offset;
        }
    }

    let seasonal: Vec<f64> = (0..n).map(|i| seasonal_indices[i % period]).collect();
    let residual = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((v, t), s)| v - t - s)
        .collect();

    Ok(Decomposition {
        trend,
        seasonal,
        residual,
        period,
        seasonal_indices,
        interior_start: interior.start,
        interior_end: interior.end,
    })
}
