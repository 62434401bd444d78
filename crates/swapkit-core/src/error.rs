use thiserror::Error;

use crate::domain::Side;

/// Validation errors for domain values and user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be greater than zero")]
    NonPositiveValue { field: &'static str },

    #[error("invalid side '{value}', expected one of from, to")]
    InvalidSide { value: String },

    #[error("invalid amount '{value}'")]
    InvalidAmount { value: String },
}

/// Configuration errors. These are programmer errors and should abort startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config value '{key}' must not be empty")]
    Empty { key: &'static str },
    #[error("config value '{key}' is invalid: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("config value '{key}' must be an http(s) URL: '{value}'")]
    NotHttpUrl { key: &'static str, value: String },
}

/// Reasons a swap cannot be submitted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("no token selected for the {0} side")]
    MissingToken(Side),
    #[error("no amount entered")]
    MissingAmount,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] crate::price_feed::FeedError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeedError;

    #[test]
    fn submit_error_names_the_missing_side() {
        let error = SubmitError::MissingToken(Side::To);
        assert_eq!(error.to_string(), "no token selected for the to side");
    }

    #[test]
    fn core_error_wraps_layer_errors_transparently() {
        let from_feed: CoreError = FeedError::status(503).into();
        assert!(matches!(from_feed, CoreError::Feed(_)));
        assert_eq!(from_feed.to_string(), "price feed returned HTTP 503 (feed.status)");

        let from_input: CoreError = ValidationError::InvalidAmount {
            value: String::from("1a"),
        }
        .into();
        assert_eq!(from_input.to_string(), "invalid amount '1a'");
    }
}
