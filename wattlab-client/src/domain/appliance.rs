use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::tariff::TariffSchedule;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplianceId(pub String);

impl ApplianceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplianceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplianceCategory {
    #[serde(alias = "HVAC", alias = "Hvac")]
    Hvac,
    #[serde(alias = "Lighting")]
    Lighting,
    #[serde(alias = "Refrigeration")]
    Refrigeration,
    #[serde(alias = "WaterHeating", alias = "Bathroom")]
    WaterHeating,
    #[serde(alias = "Laundry")]
    Laundry,
    #[serde(alias = "Kitchen")]
    Kitchen,
    #[serde(alias = "Electronics")]
    Electronics,
    #[serde(other)]
    Other,
}

impl ApplianceCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hvac => "HVAC",
            Self::Lighting => "lighting",
            Self::Refrigeration => "refrigeration",
            Self::WaterHeating => "water heating",
            Self::Laundry => "laundry",
            Self::Kitchen => "kitchen",
            Self::Electronics => "electronics",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appliance {
    pub id: ApplianceId,
    pub category: ApplianceCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_power_watts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Appliance {
    pub fn new(id: impl Into<String>, category: ApplianceCategory) -> Self {
        Self {
            id: ApplianceId::new(id),
            category,
            rated_power_watts: None,
            name: None,
        }
    }

    /// Human-facing label: the configured name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// A household account. Appliances are referenced by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub tariff: TariffSchedule,
    #[serde(default)]
    pub appliances: BTreeSet<ApplianceId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_accepts_dashboard_spellings() {
        let c: ApplianceCategory = serde_json::from_str(r#""HVAC""#).expect("alias");
        assert_eq!(c, ApplianceCategory::Hvac);
        let c: ApplianceCategory = serde_json::from_str(r#""water_heating""#).expect("snake");
        assert_eq!(c, ApplianceCategory::WaterHeating);
        let c: ApplianceCategory = serde_json::from_str(r#""Garage""#).expect("fallback");
        assert_eq!(c, ApplianceCategory::Other);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let mut a = Appliance::new("A1", ApplianceCategory::Lighting);
        assert_eq!(a.display_name(), "A1");
        a.name = Some("Hall lamp".to_string());
        assert_eq!(a.display_name(), "Hall lamp");
    }

    #[test]
    fn appliance_uses_camel_case_fields() {
        let json = r#"{"id":"A1","category":"hvac","ratedPowerWatts":1500.0}"#;
        let a: Appliance = serde_json::from_str(json).expect("valid appliance");
        assert_eq!(a.rated_power_watts, Some(1500.0));
        assert_eq!(a.id, ApplianceId::new("A1"));
    }
}
