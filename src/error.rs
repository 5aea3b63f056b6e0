//! Custom error types for bidsmetrics.
//!
//! All library functions return `Result<T, MetricsError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for bidsmetrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API answered with a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// Response or field parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (CFF, paper list) error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Delimited table error
    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Chart rendering error
    #[error("Chart error: {0}")]
    Chart(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl MetricsError {
    /// Build an `Api` error from a response status
    pub fn from_status(status: reqwest::StatusCode, service: &str) -> Self {
        MetricsError::Api {
            code: status.as_u16(),
            message: format!("{} API error: {}", service, status),
        }
    }
}

/// Result type alias using `MetricsError`
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| MetricsError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u32> = None;
        match missing.ok_or_parse("no year") {
            Err(MetricsError::Parse(msg)) => assert_eq!(msg, "no year"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(Some(3).ok_or_parse("unused").ok(), Some(3));
    }

    #[test]
    fn test_from_status() {
        let err = MetricsError::from_status(reqwest::StatusCode::NOT_FOUND, "OpenCitations");
        assert_eq!(err.to_string(), "API error: 404 - OpenCitations API error: 404 Not Found");
    }
}
