pub mod domain;
pub mod error;
pub mod history;

pub use error::{AnalyticsError, Result};
