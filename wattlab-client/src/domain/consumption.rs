use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{AnalyticsError, Result};

/// One metered reading for an appliance, in kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSample {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: f64,
}

impl ConsumptionSample {
    pub fn new(timestamp: OffsetDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Time-ordered readings for a single appliance.
///
/// Invariants, checked on construction and deserialization:
/// - timestamps strictly increasing (no duplicates);
/// - values finite and non-negative.
///
/// Gaps between readings are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ConsumptionSample>", into = "Vec<ConsumptionSample>")]
pub struct ConsumptionSeries {
    samples: Vec<ConsumptionSample>,
}

impl ConsumptionSeries {
    pub fn new(samples: Vec<ConsumptionSample>) -> Result<Self> {
        for (idx, s) in samples.iter().enumerate() {
            if !s.value.is_finite() {
                return Err(AnalyticsError::invalid(format!(
                    "sample {idx} has a non-finite value"
                )));
            }
            if s.value < 0.0 {
                return Err(AnalyticsError::invalid(format!(
                    "sample {idx} has negative consumption {}",
                    s.value
                )));
            }
        }

        if let Some(idx) = samples
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(AnalyticsError::invalid(format!(
                "timestamps must be strictly increasing (sample {} is not after sample {idx})",
                idx + 1
            )));
        }

        Ok(Self { samples })
    }

    /// Build a series from evenly spaced values starting at `start`.
    pub fn from_values(
        start: OffsetDateTime,
        cadence: time::Duration,
        values: &[f64],
    ) -> Result<Self> {
        if cadence <= time::Duration::ZERO {
            return Err(AnalyticsError::invalid("cadence must be positive"));
        }
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &v)| ConsumptionSample::new(start + cadence * i as u32, v))
            .collect();
        Self::new(samples)
    }

    pub fn samples(&self) -> &[ConsumptionSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&ConsumptionSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&ConsumptionSample> {
        self.samples.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn total_kwh(&self) -> f64 {
        self.samples.iter().map(|s| s.value).sum()
    }
}

impl TryFrom<Vec<ConsumptionSample>> for ConsumptionSeries {
    type Error = AnalyticsError;

    fn try_from(samples: Vec<ConsumptionSample>) -> Result<Self> {
        Self::new(samples)
    }
}

impl From<ConsumptionSeries> for Vec<ConsumptionSample> {
    fn from(series: ConsumptionSeries) -> Self {
        series.samples
    }
}
