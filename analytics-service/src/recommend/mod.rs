//! Rule-based energy-saving recommendations.

mod rules;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Deserialize;
use wattlab_client::domain::{
    AnomalyReport, Appliance, ApplianceCategory, ApplianceId, Forecast, Recommendation,
    RuleCategory, UserId,
};
use wattlab_client::{AnalyticsError, Result};

use rules::Candidate;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Trend growth per seasonal period, as a share of the current level.
    pub rising_trend_threshold: f64,
    pub high_severity: f64,
    pub min_savings_kwh: f64,
    /// Share of consumption a category's efficiency measure saves.
    pub efficiency_savings: BTreeMap<ApplianceCategory, f64>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            rising_trend_threshold: 0.05,
            high_severity: 0.7,
            min_savings_kwh: 0.01,
            efficiency_savings: BTreeMap::from([
                (ApplianceCategory::Hvac, 0.15),
                (ApplianceCategory::Lighting, 0.30),
                (ApplianceCategory::Kitchen, 0.10),
                (ApplianceCategory::Refrigeration, 0.10),
                (ApplianceCategory::WaterHeating, 0.12),
                (ApplianceCategory::Laundry, 0.10),
            ]),
        }
    }
}

fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.savings_kwh
        .total_cmp(&a.savings_kwh)
        .then(b.severity.total_cmp(&a.severity))
        .then_with(|| a.appliance_id.cmp(&b.appliance_id))
        .then(a.rule.cmp(&b.rule))
}

fn lookup<'a>(
    appliances: &'a BTreeMap<&ApplianceId, &Appliance>,
    id: &ApplianceId,
) -> Result<&'a Appliance> {
    appliances
        .get(id)
        .copied()
        .ok_or_else(|| AnalyticsError::InvalidInput(format!("unknown appliance id {id}")))
}

/// Rank energy-saving suggestions for one user.
///
/// At most one suggestion is kept per appliance and rule. An empty result
/// means no rule fired.
pub fn recommend(
    user_id: &UserId,
    appliances: &[Appliance],
    forecasts: &[Forecast],
    anomaly_reports: &[AnomalyReport],
    config: &RecommenderConfig,
) -> Result<Vec<Recommendation>> {
    let by_id: BTreeMap<&ApplianceId, &Appliance> =
        appliances.iter().map(|a| (&a.id, a)).collect();

    let mut candidates = Vec::new();
    for forecast in forecasts {
        let appliance = lookup(&by_id, &forecast.appliance_id)?;
        candidates.extend(rules::rising_trend(appliance, forecast, config));
        candidates.extend(rules::efficient_alternative(appliance, forecast, config));
    }
    for report in anomaly_reports {
        let appliance = lookup(&by_id, &report.appliance_id)?;
        candidates.extend(rules::active_anomaly(appliance, report, config));
    }

    let mut best: BTreeMap<(ApplianceId, RuleCategory), Candidate> = BTreeMap::new();
    for candidate in candidates {
        if !candidate.savings_kwh.is_finite() || candidate.savings_kwh < config.min_savings_kwh {
            continue;
        }
        let key = (candidate.appliance_id.clone(), candidate.rule);
        match best.get(&key) {
            Some(kept) if rank(kept, &candidate) != Ordering::Greater => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }

    let mut ranked: Vec<Candidate> = best.into_values().collect();
    ranked.sort_by(rank);

    Ok(ranked
        .into_iter()
        .enumerate()
        .map(|(idx, c)| Recommendation {
            user_id: user_id.clone(),
            appliance_id: Some(c.appliance_id),
            rule: c.rule,
            text: c.text,
            estimated_savings_kwh: c.savings_kwh,
            priority: idx as u32 + 1,
        })
        .collect())
}
