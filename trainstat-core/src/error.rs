//! Error types for the trainstat-core crate.

use thiserror::Error;

/// Top-level error type for status inspection.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid safetensors container: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error("Unsupported dtype {dtype} for '{key}'")]
    UnsupportedDtype { key: String, dtype: String },

    #[error("Expected a single value for '{key}', found {elements} elements")]
    NotScalar { key: String, elements: usize },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StatusError {
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_key() {
        let err = StatusError::invalid_value("epoch", "must be non-negative, got -3");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'epoch': must be non-negative, got -3"
        );

        let err = StatusError::NotScalar {
            key: "loss".into(),
            elements: 4,
        };
        assert!(err.to_string().contains("found 4 elements"));
    }
}
