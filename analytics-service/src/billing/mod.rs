//! Monthly bill projection from per-appliance forecasts.

use std::collections::BTreeMap;

use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use wattlab_client::domain::{
    ApplianceBill, ApplianceId, BillProjection, CostRange, Forecast, ForecastPoint, TariffSchedule,
    UserId,
};
use wattlab_client::{AnalyticsError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Upper bound on forecast steps requested to reach the end of a
    /// billing period.
    pub max_horizon_steps: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        // One month of 15-minute readings.
        Self {
            max_horizon_steps: 31 * 96,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PeriodUsage {
    kwh: f64,
    low_kwh: f64,
    high_kwh: f64,
    recorded: f64,
    extrapolated: usize,
}

impl PeriodUsage {
    fn record(&mut self, kwh: f64) {
        self.kwh += kwh;
        self.low_kwh += kwh;
        self.high_kwh += kwh;
        self.recorded += kwh;
    }

    fn add(&mut self, point: &ForecastPoint) {
        self.kwh += point.predicted;
        self.low_kwh += point.interval.lower.max(0.0);
        self.high_kwh += point.interval.upper.max(0.0);
    }
}

/// Consumption a forecast attributes to `[start, end)`.
///
/// A horizon that stops short of `end` is extended by repeating its last
/// full seasonal cycle (or the whole horizon when it is shorter than one
/// cycle). The extension keeps the phase of the cycle.
fn period_usage(forecast: &Forecast, start: OffsetDateTime, end: OffsetDateTime) -> Result<PeriodUsage> {
    let cadence = forecast.cadence();
    if cadence <= Duration::ZERO {
        return Err(AnalyticsError::InvalidInput(format!(
            "forecast for {} has a non-positive cadence",
            forecast.appliance_id
        )));
    }
    let Some(last) = forecast.horizon.last() else {
        return Err(AnalyticsError::InvalidInput(format!(
            "forecast for {} has an empty horizon",
            forecast.appliance_id
        )));
    };

    let mut usage = PeriodUsage::default();
    for point in &forecast.horizon {
        if point.timestamp >= start && point.timestamp < end {
            usage.add(point);
        }
    }

    let cycle_len = forecast.seasonal_period.clamp(1, forecast.horizon.len());
    let cycle = &forecast.horizon[forecast.horizon.len() - cycle_len..];
    let cadence_secs = cadence.whole_seconds();

    let mut step: i64 = 0;
    let mut ts = last.timestamp + cadence;
    if ts < start {
        let gap = (start - ts).whole_seconds();
        step = (gap + cadence_secs - 1) / cadence_secs;
        ts += Duration::seconds(step * cadence_secs);
    }
    while ts < end {
        usage.add(&cycle[(step as usize) % cycle_len]);
        usage.extrapolated += 1;
        step += 1;
        ts += cadence;
    }

    Ok(usage)
}

/// Project a user's bill for `[period_start, period_end)`.
///
/// Tiers are applied to the whole-account total, not per appliance; the
/// energy charge is then allocated back to appliances by consumption share.
pub fn project_bill(
    user_id: &UserId,
    forecasts: &BTreeMap<ApplianceId, Forecast>,
    tariff: &TariffSchedule,
    period_start: OffsetDateTime,
    period_end: OffsetDateTime,
) -> Result<BillProjection> {
    project_bill_with_recorded(
        user_id,
        forecasts,
        &BTreeMap::new(),
        tariff,
        period_start,
        period_end,
    )
}

/// [`project_bill`] for a period that has partly or fully elapsed.
///
/// `recorded` holds the kWh each appliance already metered inside the
/// period. Forecasts must start after the last recorded reading so no
/// interval is counted twice. Recorded energy carries no uncertainty and
/// is added to both ends of the cost range.
pub fn project_bill_with_recorded(
    user_id: &UserId,
    forecasts: &BTreeMap<ApplianceId, Forecast>,
    recorded: &BTreeMap<ApplianceId, f64>,
    tariff: &TariffSchedule,
    period_start: OffsetDateTime,
    period_end: OffsetDateTime,
) -> Result<BillProjection> {
    tariff.validate()?;
    if period_end <= period_start {
        return Err(AnalyticsError::InvalidInput(
            "billing period must end after it starts".to_string(),
        ));
    }

    let mut usages: BTreeMap<&ApplianceId, PeriodUsage> = BTreeMap::new();
    for (id, forecast) in forecasts {
        usages.insert(id, period_usage(forecast, period_start, period_end)?);
    }
    for (id, &kwh) in recorded {
        if !kwh.is_finite() || kwh < 0.0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "recorded consumption for {id} must be finite and non-negative, got {kwh}"
            )));
        }
        usages.entry(id).or_default().record(kwh);
    }

    let total_kwh: f64 = usages.values().map(|u| u.kwh).sum();
    let low_kwh: f64 = usages.values().map(|u| u.low_kwh).sum();
    let high_kwh: f64 = usages.values().map(|u| u.high_kwh).sum();

    let energy_cost = tariff.energy_cost(total_kwh);
    let projected_cost = energy_cost + tariff.service_charge;

    let breakdown = usages
        .iter()
        .map(|(id, u)| ApplianceBill {
            appliance_id: (*id).clone(),
            projected_kwh: u.kwh,
            recorded_kwh: u.recorded,
            allocated_cost: if total_kwh > 0.0 {
                energy_cost * u.kwh / total_kwh
            } else {
                0.0
            },
            extrapolated_points: u.extrapolated,
        })
        .collect();

    let extrapolated: usize = usages.values().map(|u| u.extrapolated).sum();
    if extrapolated > 0 {
        tracing::debug!(
            user_id = %user_id,
            extrapolated,
            "forecast horizons extended by repeating the last seasonal cycle"
        );
    }

    Ok(BillProjection {
        user_id: user_id.clone(),
        period_start,
        period_end,
        projected_kwh: total_kwh,
        projected_cost,
        cost_range: CostRange {
            low: tariff.total_cost(low_kwh),
            high: tariff.total_cost(high_kwh),
        },
        effective_rate_per_kwh: if total_kwh > 0.0 {
            projected_cost / total_kwh
        } else {
            0.0
        },
        breakdown,
    })
}
