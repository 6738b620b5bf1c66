mod snapshot;

pub use snapshot::SnapshotStore;

use crate::domain::{Appliance, ApplianceId, ConsumptionSeries, User, UserId};
use crate::error::Result;

/// Read access to the historical data the analytics engine is fed with.
///
/// Implementations resolve ids to value objects; unknown ids fail with
/// `AnalyticsError::InvalidInput`.
pub trait HistoryStore: Send + Sync {
    fn user(&self, user_id: &UserId) -> Result<User>;

    /// Appliances owned by `user`, ordered by id.
    fn appliances(&self, user: &User) -> Result<Vec<Appliance>>;

    /// Readings for one appliance, ordered by time.
    fn series(&self, appliance_id: &ApplianceId) -> Result<ConsumptionSeries>;
}
