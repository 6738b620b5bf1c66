use wattlab_client::domain::{
    AnomalyKind, AnomalyReport, Appliance, ApplianceCategory, ApplianceId, Forecast, RuleCategory,
};

use super::RecommenderConfig;

/// A rule's proposal before ranking.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub appliance_id: ApplianceId,
    pub rule: RuleCategory,
    pub text: String,
    pub savings_kwh: f64,
    /// Severity of the triggering anomaly, 0 for other signals.
    pub severity: f64,
}

/// Forecast trend growing faster than the configured share per period.
pub(crate) fn rising_trend(
    appliance: &Appliance,
    forecast: &Forecast,
    config: &RecommenderConfig,
) -> Option<Candidate> {
    if forecast.trend_level <= f64::EPSILON || forecast.trend_slope <= 0.0 {
        return None;
    }
    let period = forecast.seasonal_period.max(1) as f64;
    let growth = forecast.trend_slope * period / forecast.trend_level;
    if growth <= config.rising_trend_threshold {
        return None;
    }

    let steps = forecast.horizon.len() as f64;
    let savings_kwh = forecast.trend_slope * steps * (steps + 1.0) / 2.0;
    Some(Candidate {
        appliance_id: appliance.id.clone(),
        rule: RuleCategory::RisingTrend,
        text: format!(
            "{} ({}) consumption is rising about {:.0}% per cycle; check it for wear, blocked filters or changed usage",
            appliance.display_name(),
            appliance.category.label(),
            growth * 100.0
        ),
        savings_kwh,
        severity: 0.0,
    })
}

/// High-severity spikes or upward drift still showing in the report.
pub(crate) fn active_anomaly(
    appliance: &Appliance,
    report: &AnomalyReport,
    config: &RecommenderConfig,
) -> Option<Candidate> {
    let active: Vec<_> = report
        .anomalies
        .iter()
        .filter(|a| a.severity >= config.high_severity)
        .filter(|a| match a.kind {
            AnomalyKind::Spike => true,
            AnomalyKind::SustainedDrift => a.excess_kwh > 0.0,
            AnomalyKind::Drop => false,
        })
        .collect();
    if active.is_empty() {
        return None;
    }

    let savings_kwh = active.iter().map(|a| a.excess_kwh.max(0.0)).sum();
    let severity = active.iter().map(|a| a.severity).fold(0.0, f64::max);
    let events = if active.len() == 1 { "event" } else { "events" };
    Some(Candidate {
        appliance_id: appliance.id.clone(),
        rule: RuleCategory::ActiveAnomaly,
        text: format!(
            "{} shows unusual consumption ({} high-severity {events}); inspect it for faults or standby use",
            appliance.display_name(),
            active.len()
        ),
        savings_kwh,
        severity,
    })
}

fn efficiency_tip(category: ApplianceCategory, name: &str) -> Option<String> {
    let tip = match category {
        ApplianceCategory::Hvac => format!("Set {name} to 24°C for optimal efficiency"),
        ApplianceCategory::Lighting => format!("Replace {name} bulbs with LED"),
        ApplianceCategory::Kitchen => format!("Run {name} only when full"),
        ApplianceCategory::Refrigeration => {
            format!("Keep {name} door seals clean and set it to 3-4°C")
        }
        ApplianceCategory::WaterHeating => format!("Lower the {name} thermostat to 50°C"),
        ApplianceCategory::Laundry => format!("Use {name} with full loads on cold cycles"),
        ApplianceCategory::Electronics | ApplianceCategory::Other => return None,
    };
    Some(tip)
}

/// Category with a known efficiency measure, sized by the forecast.
pub(crate) fn efficient_alternative(
    appliance: &Appliance,
    forecast: &Forecast,
    config: &RecommenderConfig,
) -> Option<Candidate> {
    let fraction = *config.efficiency_savings.get(&appliance.category)?;
    let text = efficiency_tip(appliance.category, appliance.display_name())?;
    Some(Candidate {
        appliance_id: appliance.id.clone(),
        rule: RuleCategory::EfficientAlternative,
        text,
        savings_kwh: fraction * forecast.total_kwh(),
        severity: 0.0,
    })
}
