use time::Duration;
use wattlab_client::domain::ConsumptionSeries;
use wattlab_client::{AnalyticsError, Result};

use super::{grid_len, infer_cadence, interpolate_missing};

/// Re-bucket `series` onto a fixed cadence aligned to its first sample.
///
/// Each bucket holds the mean of the samples that fall into it; buckets
/// with no samples are interpolated from their neighbours. Grids longer
/// than [`super::MAX_GRID_SLOTS`] are rejected as `InvalidInput`.
pub fn resample(series: &ConsumptionSeries, target_interval: Duration) -> Result<ConsumptionSeries> {
    if series.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            required: 2,
            got: series.len(),
        });
    }

    let step = target_interval.whole_seconds();
    if step <= 0 {
        return Err(AnalyticsError::InvalidInput(format!(
            "target interval must be at least one second, got {step}s"
        )));
    }

    let samples = series.samples();
    let origin = samples[0].timestamp;
    let bucket_of = |ts: time::OffsetDateTime| ((ts - origin).whole_seconds() / step) as usize;

    let buckets = grid_len((samples[samples.len() - 1].timestamp - origin).whole_seconds() / step)?;
    let mut sums = vec![0.0; buckets];
    let mut counts = vec![0usize; buckets];
    for s in samples {
        let b = bucket_of(s.timestamp);
        sums[b] += s.value;
        counts[b] += 1;
    }

    let slots: Vec<Option<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
        .collect();

    ConsumptionSeries::from_values(origin, Duration::seconds(step), &interpolate_missing(&slots))
}

/// Place samples on their native cadence grid and linearly interpolate the
/// missing slots.
///
/// Fails with `ExcessiveGap` when more than `max_gap_ratio` of the expected
/// slots have no sample. The ratio is checked before the grid is built, so
/// a sparse series spanning years fails without allocating it.
pub fn fill_gaps(series: &ConsumptionSeries, max_gap_ratio: f64) -> Result<ConsumptionSeries> {
    if !(0.0..=1.0).contains(&max_gap_ratio) {
        return Err(AnalyticsError::InvalidInput(format!(
            "max gap ratio must be within [0, 1], got {max_gap_ratio}"
        )));
    }

    let cadence = infer_cadence(series)?;
    let step = cadence.whole_seconds();
    let samples = series.samples();
    let origin = samples[0].timestamp;
    // Nearest grid slot; readings a little off the grid still land in place.
    let slot_of = |ts: time::OffsetDateTime| ((ts - origin).whole_seconds() + step / 2) / step;

    let last_slot = slot_of(samples[samples.len() - 1].timestamp);
    let expected = last_slot as f64 + 1.0;
    // Samples are ordered, so equal slots are adjacent.
    let mut present = 0usize;
    let mut previous = None;
    for s in samples {
        let slot = slot_of(s.timestamp);
        if previous != Some(slot) {
            present += 1;
            previous = Some(slot);
        }
    }

    let missing_ratio = (expected - present as f64) / expected;
    if missing_ratio > max_gap_ratio {
        return Err(AnalyticsError::ExcessiveGap {
            missing_ratio,
            max_ratio: max_gap_ratio,
        });
    }

    let expected = grid_len(last_slot)?;
    let mut sums = vec![0.0; expected];
    let mut counts = vec![0usize; expected];
    for s in samples {
        let slot = slot_of(s.timestamp) as usize;
        sums[slot] += s.value;
        counts[slot] += 1;
    }

    let slots: Vec<Option<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
        .collect();

    if present < expected {
        tracing::debug!(
            expected,
            present,
            missing_ratio,
            "interpolating missing samples"
        );
    }

    ConsumptionSeries::from_values(origin, cadence, &interpolate_missing(&slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use wattlab_client::domain::ConsumptionSample;

    fn at_minutes(points: &[(i64, f64)]) -> ConsumptionSeries {
        let start = datetime!(2024-05-01 00:00:00 UTC);
        ConsumptionSeries::new(
            points
                .iter()
                .map(|&(m, v)| ConsumptionSample::new(start + Duration::minutes(m), v))
                .collect(),
        )
        .expect("valid series")
    }

    #[test]
    fn resample_averages_within_bucket() {
        let series = at_minutes(&[(0, 1.0), (15, 3.0), (30, 2.0), (45, 4.0), (60, 5.0)]);
        let hourly = resample(&series, Duration::hours(1)).expect("resampled");
        assert_eq!(hourly.values(), vec![2.5, 5.0]);
        assert_eq!(
            hourly.last().map(|s| s.timestamp),
            Some(datetime!(2024-05-01 01:00:00 UTC))
        );
    }

    #[test]
    fn resample_interpolates_empty_buckets() {
        let series = at_minutes(&[(0, 1.0), (180, 4.0)]);
        let hourly = resample(&series, Duration::hours(1)).expect("resampled");
        assert_eq!(hourly.values(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn resample_requires_two_samples() {
        let series = at_minutes(&[(0, 1.0)]);
        assert!(matches!(
            resample(&series, Duration::hours(1)),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn resample_rejects_zero_interval() {
        let series = at_minutes(&[(0, 1.0), (60, 1.0)]);
        assert!(matches!(
            resample(&series, Duration::ZERO),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn fill_gaps_interpolates_missing_slots() {
        let series = at_minutes(&[(0, 1.0), (60, 2.0), (120, 3.0), (240, 5.0), (300, 6.0)]);
        let filled = fill_gaps(&series, 0.25).expect("filled");
        assert_eq!(filled.values(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn fill_gaps_rejects_excessive_gaps() {
        let series = at_minutes(&[(0, 1.0), (60, 1.0), (360, 1.0), (420, 1.0)]);
        match fill_gaps(&series, 0.2) {
            Err(AnalyticsError::ExcessiveGap { missing_ratio, .. }) => {
                assert!((missing_ratio - 0.5).abs() < 1e-12);
            }
            other => panic!("expected excessive gap, got {other:?}"),
        }
    }

    #[test]
    fn fill_gaps_leaves_regular_series_untouched() {
        let series = at_minutes(&[(0, 1.0), (60, 1.5), (120, 0.5)]);
        let filled = fill_gaps(&series, 0.0).expect("filled");
        assert_eq!(filled, series);
    }

    #[test]
    fn sparse_series_over_a_year_fails_on_gap_ratio() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let series = ConsumptionSeries::new(vec![
            ConsumptionSample::new(start, 1.0),
            ConsumptionSample::new(start + Duration::seconds(1), 1.0),
            ConsumptionSample::new(start + Duration::seconds(2), 1.0),
            ConsumptionSample::new(start + Duration::days(365), 1.0),
        ])
        .expect("valid series");
        match fill_gaps(&series, 0.2) {
            Err(AnalyticsError::ExcessiveGap { missing_ratio, .. }) => assert!(missing_ratio > 0.99),
            other => panic!("expected excessive gap, got {other:?}"),
        }
        // Even a ratio that tolerates every gap stops short of the full grid.
        assert!(matches!(fill_gaps(&series, 1.0), Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn resample_rejects_oversized_grid() {
        let series = at_minutes(&[(0, 1.0), (60 * 24 * 365, 1.0)]);
        assert!(matches!(
            resample(&series, Duration::seconds(1)),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn fill_gaps_rejects_ratio_out_of_range() {
        let series = at_minutes(&[(0, 1.0), (60, 1.5)]);
        assert!(matches!(fill_gaps(&series, 1.5), Err(AnalyticsError::InvalidInput(_))));
    }
}
