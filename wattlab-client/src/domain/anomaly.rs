use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::appliance::ApplianceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Spike,
    Drop,
    SustainedDrift,
}

/// Where an anomaly sits: a single sample or an inclusive run of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalySpan {
    Point {
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    Window {
        #[serde(with = "time::serde::rfc3339")]
        start: OffsetDateTime,
        #[serde(with = "time::serde::rfc3339")]
        end: OffsetDateTime,
    },
}

impl AnomalySpan {
    pub fn start(&self) -> OffsetDateTime {
        match self {
            Self::Point { timestamp } => *timestamp,
            Self::Window { start, .. } => *start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub span: AnomalySpan,
    pub kind: AnomalyKind,
    /// Normalized deviation in [0, 1].
    pub severity: f64,
    /// Peak observed value (spike/drop) or window mean (drift).
    pub observed: f64,
    /// Baseline the observation was compared against.
    pub expected: f64,
    /// Consumption above (positive) or below (negative) baseline over the span.
    pub excess_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub appliance_id: ApplianceId,
    pub anomalies: Vec<Anomaly>,
}

impl AnomalyReport {
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    pub fn max_severity(&self) -> f64 {
        self.anomalies
            .iter()
            .map(|a| a.severity)
            .fold(0.0, f64::max)
    }
}
