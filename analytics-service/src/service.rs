//! Resolves ids through the history store and drives the engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use time::{Date, Month, OffsetDateTime};
use wattlab_client::domain::{
    Appliance, BillProjection, ConsumptionSeries, Recommendation, UserId,
};
use wattlab_client::history::HistoryStore;
use wattlab_client::{AnalyticsError, Result};

use crate::engine::Engine;
use crate::timeseries;

#[derive(Clone)]
pub struct AnalyticsService {
    engine: Arc<Engine>,
    history: Arc<dyn HistoryStore>,
}

/// `[first of month, first of next month)` in UTC.
pub fn month_bounds(month: u8, year: i32) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let month = Month::try_from(month)
        .map_err(|_| AnalyticsError::InvalidInput(format!("month must be 1-12, got {month}")))?;
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        m => (year, m.next()),
    };
    let first = |y: i32, m: Month| {
        Date::from_calendar_date(y, m, 1)
            .map(|d| d.midnight().assume_utc())
            .map_err(|e| AnalyticsError::InvalidInput(format!("invalid billing month: {e}")))
    };
    Ok((first(year, month)?, first(next_year, next_month)?))
}

/// Steps a forecast needs to cover what is left of the period after the
/// last reading. Zero once the history already reaches `end`.
fn steps_until(series: &ConsumptionSeries, end: OffsetDateTime, max_steps: usize) -> Result<usize> {
    if series.last().is_some_and(|last| last.timestamp >= end) {
        return Ok(0);
    }
    let cadence = timeseries::infer_cadence(series)?;
    let Some(last) = series.last() else {
        return Ok(1);
    };
    let remaining = (end - last.timestamp).whole_seconds();
    let step = cadence.whole_seconds().max(1);
    if remaining <= step {
        return Ok(0);
    }
    let steps = usize::try_from((remaining + step - 1) / step).unwrap_or(max_steps);
    Ok(steps.clamp(1, max_steps.max(1)))
}

/// kWh metered inside `[start, end)`.
fn recorded_within(series: &ConsumptionSeries, start: OffsetDateTime, end: OffsetDateTime) -> f64 {
    series
        .samples()
        .iter()
        .filter(|s| s.timestamp >= start && s.timestamp < end)
        .map(|s| s.value)
        .sum()
}

fn skippable(err: &AnalyticsError) -> bool {
    matches!(
        err,
        AnalyticsError::InsufficientData { .. } | AnalyticsError::ExcessiveGap { .. }
    )
}

impl AnalyticsService {
    pub fn new(engine: Arc<Engine>, history: Arc<dyn HistoryStore>) -> Self {
        Self { engine, history }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Project the bill for a calendar month from every appliance's history.
    ///
    /// Readings already inside the month are counted as recorded usage and
    /// only the rest of the month is forecast. A month wholly covered by
    /// history is billed from readings alone. Any appliance that still
    /// needs a forecast and cannot get one fails the whole projection.
    pub fn predict_bill_for_month(&self, user_id: &UserId, month: u8, year: i32) -> Result<BillProjection> {
        let (start, end) = month_bounds(month, year)?;
        let user = self.history.user(user_id)?;
        let appliances = self.history.appliances(&user)?;
        let max_steps = self
            .engine
            .config()
            .billing
            .max_horizon_steps
            .min(self.engine.config().forecast.max_horizon);

        let mut histories = Vec::with_capacity(appliances.len());
        for appliance in &appliances {
            histories.push((appliance, self.history.series(&appliance.id)?));
        }
        let earliest = histories
            .iter()
            .filter_map(|(_, series)| series.first().map(|s| s.timestamp))
            .min();
        if earliest.is_some_and(|first| first >= end) {
            return Err(AnalyticsError::InvalidInput(format!(
                "billing period {start} to {end} ends before any recorded consumption"
            )));
        }

        let mut forecasts = BTreeMap::new();
        let mut recorded = BTreeMap::new();
        for (appliance, series) in &histories {
            recorded.insert(appliance.id.clone(), recorded_within(series, start, end));
            let horizon = steps_until(series, end, max_steps)?;
            if horizon == 0 {
                tracing::debug!(appliance = %appliance.id, "history covers the billing period");
                continue;
            }
            let forecast = self.engine.predict(&appliance.id, series, Some(horizon))?;
            forecasts.insert(appliance.id.clone(), forecast);
        }

        self.engine
            .project_bill_with_recorded(&user.id, &forecasts, &recorded, &user.tariff, start, end)
    }

    /// Forecast and scan every appliance, then rank suggestions.
    ///
    /// Appliances with too little or too patchy history are left out.
    pub fn recommendations_for_user(&self, user_id: &UserId) -> Result<Vec<Recommendation>> {
        let user = self.history.user(user_id)?;
        let appliances: Vec<Appliance> = self.history.appliances(&user)?;

        let mut forecasts = Vec::with_capacity(appliances.len());
        let mut reports = Vec::with_capacity(appliances.len());
        for appliance in &appliances {
            let series = self.history.series(&appliance.id)?;

            match self.engine.predict(&appliance.id, &series, None) {
                Ok(f) => forecasts.push(f),
                Err(e) if skippable(&e) => {
                    tracing::warn!(appliance = %appliance.id, error = %e, "skipping forecast");
                }
                Err(e) => return Err(e),
            }
            match self.engine.detect(&appliance.id, &series) {
                Ok(r) => reports.push(r),
                Err(e) if skippable(&e) => {
                    tracing::warn!(appliance = %appliance.id, error = %e, "skipping anomaly scan");
                }
                Err(e) => return Err(e),
            }
        }

        self.engine.recommend(&user.id, &appliances, &forecasts, &reports)
    }
}
