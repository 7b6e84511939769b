use crate::persistence::PersistenceError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by loading, windowing, the predictor and the analysis pipelines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested series column is not part of the configured/loaded columns.
    #[error("series '{name}' not found (available: {})", available.join(", "))]
    UnknownSeriesName { name: String, available: Vec<String> },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("model has not been fitted")]
    NotFitted,

    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    #[error("row {row}: cannot parse date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl Error {
    pub(crate) fn shape(context: &'static str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            context,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_series_message_lists_columns() {
        let err = Error::UnknownSeriesName {
            name: "top 9".to_string(),
            available: vec!["top 1".to_string(), "top 2".to_string()],
        };
        assert_eq!(err.to_string(), "series 'top 9' not found (available: top 1, top 2)");
    }

    #[test]
    fn test_shape_helper() {
        let err = Error::shape("forward", "(B, 4, 1)", "(2, 4, 3)");
        assert!(matches!(err, Error::ShapeMismatch { context: "forward", .. }));
        assert!(err.to_string().contains("(2, 4, 3)"));
    }
}
