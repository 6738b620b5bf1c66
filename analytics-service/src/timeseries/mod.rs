//! Shared time-series helpers: cadence and period inference, resampling,
//! gap-filling and additive decomposition.

mod decompose;
mod resample;

pub use decompose::{decompose, decompose_values, Decomposition};
pub use resample::{fill_gaps, resample};

use std::collections::BTreeMap;

use time::Duration;
use wattlab_client::domain::ConsumptionSeries;
use wattlab_client::{AnalyticsError, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// Largest regular grid built when resampling or gap-filling.
pub const MAX_GRID_SLOTS: usize = 1_000_000;

/// Slots from 0 through `last_slot`, rejected above [`MAX_GRID_SLOTS`].
fn grid_len(last_slot: i64) -> Result<usize> {
    match usize::try_from(last_slot) {
        Ok(slot) if slot < MAX_GRID_SLOTS => Ok(slot + 1),
        _ => Err(AnalyticsError::InvalidInput(format!(
            "series would span {} slots; at most {MAX_GRID_SLOTS} are supported",
            last_slot.saturating_add(1)
        ))),
    }
}

/// Most frequent spacing between consecutive samples. Ties resolve to the
/// shorter spacing.
pub fn infer_cadence(series: &ConsumptionSeries) -> Result<Duration> {
    if series.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            required: 2,
            got: series.len(),
        });
    }

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for pair in series.samples().windows(2) {
        let secs = (pair[1].timestamp - pair[0].timestamp).whole_seconds();
        *counts.entry(secs).or_default() += 1;
    }

    let mut best: Option<(i64, usize)> = None;
    for (&secs, &count) in &counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((secs, count)),
        }
    }

    match best {
        Some((secs, _)) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(AnalyticsError::InvalidInput(
            "samples must be at least one second apart".to_string(),
        )),
    }
}

/// Number of samples after which the consumption pattern is expected to
/// repeat, given the sampling cadence.
///
/// - sub-daily cadences that divide a day: one day (hourly -> 24);
/// - daily cadence: one week (7);
/// - anything else: 1, meaning no seasonal component.
pub fn seasonal_period_for(cadence: Duration) -> usize {
    let secs = cadence.whole_seconds();
    if secs <= 0 {
        return 1;
    }
    if secs < SECONDS_PER_DAY && SECONDS_PER_DAY % secs == 0 {
        return (SECONDS_PER_DAY / secs) as usize;
    }
    if secs == SECONDS_PER_DAY {
        return 7;
    }
    1
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Linear interpolation over missing slots. Leading and trailing holes take
/// the nearest known value; an all-empty input yields zeros.
pub(crate) fn interpolate_missing(slots: &[Option<f64>]) -> Vec<f64> {
    let known: Vec<(usize, f64)> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let (Some(&(first_idx, first_val)), Some(&(last_idx, last_val))) = (known.first(), known.last())
    else {
        return vec![0.0; slots.len()];
    };

    let mut out = vec![0.0; slots.len()];
    out[..=first_idx].fill(first_val);
    out[last_idx..].fill(last_val);

    for pair in known.windows(2) {
        let (a, va) = pair[0];
        let (b, vb) = pair[1];
        let span = (b - a) as f64;
        for (offset, slot) in out[a..=b].iter_mut().enumerate() {
            *slot = va + (vb - va) * offset as f64 / span;
        }
    }

    out
}
