//! Error types for model construction and forward passes.

use graph_weather_mesh::MeshError;
use thiserror::Error;

/// Model-specific errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Tensor operation failed.
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Graph structure could not be built.
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Invalid configuration value.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Input tensor shape does not match what the model was built for.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// Prediction channels are not a whole multiple of reference channels.
    #[error("Constraint channel mismatch: prediction has {prediction} channels, reference has {reference}")]
    ChannelRatio { prediction: usize, reference: usize },

    /// NaN or infinity found where finite values are required.
    #[error("Non-finite values in {stage}")]
    NonFinite { stage: String },

    /// Input validation failed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ModelError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ModelError::ConfigError {
            message: message.into(),
        }
    }

    /// Shorthand for a shape mismatch.
    pub fn shape(context: &str, expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        ModelError::ShapeMismatch {
            context: context.to_string(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

impl From<config::ConfigError> for ModelError {
    fn from(err: config::ConfigError) -> Self {
        ModelError::config(err.to_string())
    }
}

impl From<toml::de::Error> for ModelError {
    fn from(err: toml::de::Error) -> Self {
        ModelError::config(format!("Failed to parse TOML: {}", err))
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
