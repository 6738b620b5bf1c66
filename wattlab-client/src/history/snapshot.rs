use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use super::HistoryStore;
use crate::domain::{Appliance, ApplianceId, ConsumptionSeries, User, UserId};
use crate::error::{AnalyticsError, Result};

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    appliances: Vec<Appliance>,
    #[serde(default)]
    readings: BTreeMap<ApplianceId, ConsumptionSeries>,
}

/// In-memory history loaded once from a JSON snapshot.
///
/// Expected shape:
///
/// ```json
/// {
///   "users": [{"id": "u1", "tariff": {...}, "appliances": ["A1"]}],
///   "appliances": [{"id": "A1", "category": "hvac"}],
///   "readings": {"A1": [{"timestamp": "2024-01-01T00:00:00Z", "value": 1.0}]}
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    users: BTreeMap<UserId, User>,
    appliances: BTreeMap<ApplianceId, Appliance>,
    readings: BTreeMap<ApplianceId, ConsumptionSeries>,
}

impl SnapshotStore {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read history snapshot {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("invalid history snapshot {}", path.display()))
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let file: SnapshotFile = serde_json::from_str(contents)?;
        let store = Self::from_parts(file.users, file.appliances, file.readings);

        for user in store.users.values() {
            if let Some(missing) = user
                .appliances
                .iter()
                .find(|id| !store.appliances.contains_key(*id))
            {
                anyhow::bail!("user {} references unknown appliance {missing}", user.id);
            }
        }

        Ok(store)
    }

    pub fn from_parts(
        users: Vec<User>,
        appliances: Vec<Appliance>,
        readings: BTreeMap<ApplianceId, ConsumptionSeries>,
    ) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            appliances: appliances.into_iter().map(|a| (a.id.clone(), a)).collect(),
            readings,
        }
    }
}

impl HistoryStore for SnapshotStore {
    fn user(&self, user_id: &UserId) -> Result<User> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| AnalyticsError::invalid(format!("unknown user id {user_id}")))
    }

    fn appliances(&self, user: &User) -> Result<Vec<Appliance>> {
        user.appliances
            .iter()
            .map(|id| {
                self.appliances
                    .get(id)
                    .cloned()
                    .ok_or_else(|| AnalyticsError::invalid(format!("unknown appliance id {id}")))
            })
            .collect()
    }

    fn series(&self, appliance_id: &ApplianceId) -> Result<ConsumptionSeries> {
        if !self.appliances.contains_key(appliance_id) {
            return Err(AnalyticsError::invalid(format!(
                "unknown appliance id {appliance_id}"
            )));
        }
        // A registered appliance without readings has an empty history.
        Ok(self.readings.get(appliance_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "users": [{
            "id": "u1",
            "tariff": {"tiers": [{"thresholdKwh": 0.0, "ratePerKwh": 0.12}], "serviceCharge": 4.0},
            "appliances": ["A2", "A1"]
        }],
        "appliances": [
            {"id": "A1", "category": "hvac", "ratedPowerWatts": 1500.0},
            {"id": "A2", "category": "lighting"},
            {"id": "A3", "category": "other"}
        ],
        "readings": {
            "A1": [
                {"timestamp": "2024-01-01T00:00:00Z", "value": 1.0},
                {"timestamp": "2024-01-01T01:00:00Z", "value": 1.2}
            ]
        }
    }"#;

    #[test]
    fn resolves_user_and_appliances_in_id_order() {
        let store = SnapshotStore::from_json(SNAPSHOT).expect("valid snapshot");
        let user = store.user(&UserId::new("u1")).expect("known user");
        let appliances = store.appliances(&user).expect("known appliances");
        let ids: Vec<_> = appliances.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
    }

    #[test]
    fn unknown_user_is_invalid_input() {
        let store = SnapshotStore::from_json(SNAPSHOT).expect("valid snapshot");
        let res = store.user(&UserId::new("nobody"));
        assert!(matches!(res, Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn series_for_appliance_without_readings_is_empty() {
        let store = SnapshotStore::from_json(SNAPSHOT).expect("valid snapshot");
        let series = store.series(&ApplianceId::new("A2")).expect("known appliance");
        assert!(series.is_empty());
        assert_eq!(store.series(&ApplianceId::new("A1")).map(|s| s.len()), Ok(2));
    }

    #[test]
    fn rejects_dangling_appliance_reference() {
        let json = r#"{"users": [{"id": "u1", "tariff": {"tiers": []}, "appliances": ["X"]}]}"#;
        assert!(SnapshotStore::from_json(json).is_err());
    }
}
