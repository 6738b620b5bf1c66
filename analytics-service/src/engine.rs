//! Stateless entry point for the four analytics operations.

use std::collections::BTreeMap;
use std::time::Instant;

use time::OffsetDateTime;
use wattlab_client::domain::{
    AnomalyReport, Appliance, ApplianceId, BillProjection, ConsumptionSeries, Forecast,
    Recommendation, TariffSchedule, UserId,
};
use wattlab_client::Result;

use crate::config::AnalyticsConfig;
use crate::{anomaly, billing, forecast, recommend};

/// Holds the analytics configuration and nothing else; safe to share
/// across request handlers.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: AnalyticsConfig,
}

fn observe<T>(op: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _span = tracing::info_span!("analytics", op).entered();
    let started = Instant::now();
    let result = f();
    metrics::histogram!("analytics_operation_duration_seconds", "op" => op)
        .record(started.elapsed().as_secs_f64());

    match &result {
        Ok(_) => {
            metrics::counter!("analytics_operations_total", "op" => op).increment(1);
        }
        Err(e) => {
            metrics::counter!("analytics_operation_errors_total", "op" => op, "kind" => e.kind())
                .increment(1);
            tracing::warn!(error = %e, kind = e.kind(), "analytics operation failed");
        }
    }
    result
}

impl Engine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Forecast one appliance. `None` uses the configured default horizon.
    pub fn predict(
        &self,
        appliance_id: &ApplianceId,
        history: &ConsumptionSeries,
        horizon_length: Option<usize>,
    ) -> Result<Forecast> {
        let horizon = horizon_length.unwrap_or(self.config.forecast.default_horizon);
        observe("predict", || {
            forecast::predict(appliance_id, history, horizon, &self.config.forecast)
        })
    }

    pub fn project_bill(
        &self,
        user_id: &UserId,
        forecasts: &BTreeMap<ApplianceId, Forecast>,
        tariff: &TariffSchedule,
        period_start: OffsetDateTime,
        period_end: OffsetDateTime,
    ) -> Result<BillProjection> {
        observe("project_bill", || {
            billing::project_bill(user_id, forecasts, tariff, period_start, period_end)
        })
    }

    /// Bill for a period that has partly or fully elapsed; see
    /// [`billing::project_bill_with_recorded`].
    pub fn project_bill_with_recorded(
        &self,
        user_id: &UserId,
        forecasts: &BTreeMap<ApplianceId, Forecast>,
        recorded: &BTreeMap<ApplianceId, f64>,
        tariff: &TariffSchedule,
        period_start: OffsetDateTime,
        period_end: OffsetDateTime,
    ) -> Result<BillProjection> {
        observe("project_bill", || {
            billing::project_bill_with_recorded(
                user_id,
                forecasts,
                recorded,
                tariff,
                period_start,
                period_end,
            )
        })
    }

    pub fn detect(&self, appliance_id: &ApplianceId, series: &ConsumptionSeries) -> Result<AnomalyReport> {
        observe("detect", || {
            let report = anomaly::detect(appliance_id, series, &self.config.anomaly)?;
            tracing::debug!(
                appliance_id = %appliance_id,
                anomalies = report.anomalies.len(),
                max_severity = report.max_severity(),
                "scan complete"
            );
            Ok(report)
        })
    }

    pub fn recommend(
        &self,
        user_id: &UserId,
        appliances: &[Appliance],
        forecasts: &[Forecast],
        anomaly_reports: &[AnomalyReport],
    ) -> Result<Vec<Recommendation>> {
        observe("recommend", || {
            recommend::recommend(
                user_id,
                appliances,
                forecasts,
                anomaly_reports,
                &self.config.recommend,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;
    use wattlab_client::AnalyticsError;

    fn hourly(values: &[f64]) -> ConsumptionSeries {
        ConsumptionSeries::from_values(datetime!(2024-03-01 00:00:00 UTC), Duration::hours(1), values)
            .expect("series")
    }

    #[test]
    fn predict_defaults_to_configured_horizon() {
        let engine = Engine::default();
        let values: Vec<f64> = (0..48).map(|i| if i % 2 == 0 { 1.0 } else { 1.2 }).collect();
        let fc = engine
            .predict(&ApplianceId::new("A1"), &hourly(&values), None)
            .expect("forecast");
        assert_eq!(fc.horizon.len(), engine.config().forecast.default_horizon);
    }

    #[test]
    fn errors_pass_through_unchanged() {
        let engine = Engine::default();
        let err = engine
            .predict(&ApplianceId::new("A1"), &hourly(&[1.0, 1.0, 1.0]), Some(4))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn recorded_usage_joins_the_forecast_total() {
        let engine = Engine::default();
        let id = ApplianceId::new("A1");
        let values: Vec<f64> = (0..48).map(|i| if i % 2 == 0 { 1.0 } else { 1.2 }).collect();
        let fc = engine.predict(&id, &hourly(&values), Some(24)).expect("forecast");
        let forecasts = BTreeMap::from([(id.clone(), fc)]);
        let tariff = TariffSchedule::flat(0.2, 0.0).expect("tariff");
        let (start, end) = (datetime!(2024-03-03 00:00:00 UTC), datetime!(2024-03-04 00:00:00 UTC));

        let forecast_only = engine
            .project_bill(&UserId::new("u1"), &forecasts, &tariff, start, end)
            .expect("bill");
        let with_recorded = engine
            .project_bill_with_recorded(
                &UserId::new("u1"),
                &forecasts,
                &BTreeMap::from([(id, 3.0)]),
                &tariff,
                start,
                end,
            )
            .expect("bill");
        assert!((with_recorded.projected_kwh - forecast_only.projected_kwh - 3.0).abs() < 1e-9);
        assert!((with_recorded.projected_cost - forecast_only.projected_cost - 0.6).abs() < 1e-9);
    }

    #[test]
    fn engine_is_deterministic() {
        let engine = Engine::default();
        let values: Vec<f64> = (0..72).map(|i| 1.0 + (i % 24) as f64 * 0.1).collect();
        let series = hourly(&values);
        let id = ApplianceId::new("A1");
        assert_eq!(
            engine.predict(&id, &series, Some(12)).expect("first"),
            engine.predict(&id, &series, Some(12)).expect("second")
        );
        assert_eq!(
            engine.detect(&id, &series).expect("first"),
            engine.detect(&id, &series).expect("second")
        );
    }
}
