use serde::{Deserialize, Serialize};

use super::appliance::{ApplianceId, UserId};

/// Signal family a recommendation was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    RisingTrend,
    ActiveAnomaly,
    EfficientAlternative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appliance_id: Option<ApplianceId>,
    pub rule: RuleCategory,
    pub text: String,
    pub estimated_savings_kwh: f64,
    /// 1 is the most important.
    pub priority: u32,
}
