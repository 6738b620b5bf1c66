use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// One bracket of a progressive tariff. The bracket starts at
/// `threshold_kwh` and runs up to the next tier's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffTier {
    pub threshold_kwh: f64,
    pub rate_per_kwh: f64,
}

/// Progressive billing schedule plus a fixed service charge.
///
/// Rules:
/// - at least one tier, the first starting at 0 kWh;
/// - thresholds strictly increasing, the last tier unbounded;
/// - rates and the service charge finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffSchedule {
    pub tiers: Vec<TariffTier>,
    #[serde(default)]
    pub service_charge: f64,
}

impl TariffSchedule {
    pub fn new(tiers: Vec<TariffTier>, service_charge: f64) -> Result<Self> {
        let schedule = Self {
            tiers,
            service_charge,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Single-rate schedule.
    pub fn flat(rate_per_kwh: f64, service_charge: f64) -> Result<Self> {
        Self::new(
            vec![TariffTier {
                threshold_kwh: 0.0,
                rate_per_kwh,
            }],
            service_charge,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let first = self
            .tiers
            .first()
            .ok_or_else(|| AnalyticsError::UnknownTariff("schedule has no tiers".to_string()))?;

        if first.threshold_kwh != 0.0 {
            return Err(AnalyticsError::UnknownTariff(format!(
                "first tier must start at 0 kWh, starts at {}",
                first.threshold_kwh
            )));
        }

        for (idx, tier) in self.tiers.iter().enumerate() {
            if !tier.threshold_kwh.is_finite() {
                return Err(AnalyticsError::UnknownTariff(format!(
                    "tier {idx} has a non-finite threshold"
                )));
            }
            if !tier.rate_per_kwh.is_finite() || tier.rate_per_kwh < 0.0 {
                return Err(AnalyticsError::UnknownTariff(format!(
                    "tier {idx} has invalid rate {}",
                    tier.rate_per_kwh
                )));
            }
        }

        if let Some(idx) = self
            .tiers
            .windows(2)
            .position(|w| w[1].threshold_kwh <= w[0].threshold_kwh)
        {
            return Err(AnalyticsError::UnknownTariff(format!(
                "thresholds must be strictly increasing (tier {} <= tier {idx})",
                idx + 1
            )));
        }

        if !self.service_charge.is_finite() || self.service_charge < 0.0 {
            return Err(AnalyticsError::UnknownTariff(format!(
                "invalid service charge {}",
                self.service_charge
            )));
        }

        Ok(())
    }

    /// Tier-by-tier energy charge for a whole-account total, excluding the
    /// service charge. Assumes a validated schedule.
    pub fn energy_cost(&self, total_kwh: f64) -> f64 {
        let total_kwh = total_kwh.max(0.0);
        let mut cost = 0.0;

        for (idx, tier) in self.tiers.iter().enumerate() {
            if total_kwh <= tier.threshold_kwh {
                break;
            }
            let upper = self
                .tiers
                .get(idx + 1)
                .map(|next| next.threshold_kwh)
                .unwrap_or(f64::INFINITY);
            let in_tier = total_kwh.min(upper) - tier.threshold_kwh;
            cost += in_tier * tier.rate_per_kwh;
        }

        cost
    }

    pub fn total_cost(&self, total_kwh: f64) -> f64 {
        self.energy_cost(total_kwh) + self.service_charge
    }
}
