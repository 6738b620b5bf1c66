use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::appliance::{ApplianceId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceBill {
    pub appliance_id: ApplianceId,
    /// Recorded plus forecast consumption inside the period.
    pub projected_kwh: f64,
    /// Part of `projected_kwh` already metered.
    #[serde(default)]
    pub recorded_kwh: f64,
    /// Share of the energy charge, proportional to consumption.
    pub allocated_cost: f64,
    /// Points generated by repeating the last seasonal cycle past the horizon.
    pub extrapolated_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillProjection {
    pub user_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    pub projected_kwh: f64,
    pub projected_cost: f64,
    pub cost_range: CostRange,
    pub effective_rate_per_kwh: f64,
    pub breakdown: Vec<ApplianceBill>,
}
