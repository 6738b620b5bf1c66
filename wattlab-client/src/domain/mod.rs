pub mod anomaly;
pub mod appliance;
pub mod bill;
pub mod consumption;
pub mod forecast;
pub mod recommendation;
pub mod tariff;

pub use anomaly::{Anomaly, AnomalyKind, AnomalyReport, AnomalySpan};
pub use appliance::{Appliance, ApplianceCategory, ApplianceId, User, UserId};
pub use bill::{ApplianceBill, BillProjection, CostRange};
pub use consumption::{ConsumptionSample, ConsumptionSeries};
pub use forecast::{ConfidenceInterval, Forecast, ForecastPoint};
pub use recommendation::{Recommendation, RuleCategory};
pub use tariff::{TariffSchedule, TariffTier};
