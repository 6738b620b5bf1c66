use thiserror::Error;

/// Errors surfaced by the analytics core.
///
/// Every variant is a distinct failure the transport layer can map to its own
/// response; nothing here is retried internally because identical input
/// always reproduces the same error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("insufficient data: required {required} samples, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("excessive gaps: {missing_ratio:.3} of expected samples missing (max {max_ratio:.3})")]
    ExcessiveGap { missing_ratio: f64, max_ratio: f64 },

    #[error("unknown tariff: {0}")]
    UnknownTariff(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AnalyticsError {
    /// Stable snake_case tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::ExcessiveGap { .. } => "excessive_gap",
            Self::UnknownTariff(_) => "unknown_tariff",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_display() {
        let err = AnalyticsError::InsufficientData { required: 48, got: 10 };
        assert_eq!(err.to_string(), "insufficient data: required 48 samples, got 10");
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn excessive_gap_display_rounds_ratios() {
        let err = AnalyticsError::ExcessiveGap {
            missing_ratio: 0.5,
            max_ratio: 0.2,
        };
        assert_eq!(
            err.to_string(),
            "excessive gaps: 0.500 of expected samples missing (max 0.200)"
        );
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            AnalyticsError::InsufficientData { required: 1, got: 0 }.kind(),
            AnalyticsError::ExcessiveGap {
                missing_ratio: 1.0,
                max_ratio: 0.0,
            }
            .kind(),
            AnalyticsError::UnknownTariff(String::new()).kind(),
            AnalyticsError::InvalidInput(String::new()).kind(),
        ];
        let unique: std::collections::BTreeSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalyticsError>();
    }
}
