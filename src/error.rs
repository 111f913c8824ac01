//! Error types for riskdesk

use thiserror::Error;

/// Result type alias for riskdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for riskdesk
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration; always fatal at setup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success response from a remote model or search service
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A participant's generation step failed; aborts the run
    #[error("Generation failed for {participant}: {source}")]
    Generation {
        /// Participant whose turn failed
        participant: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON Schema validation error
    #[error("JSON Schema validation error: {0}")]
    JsonSchema(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an upstream service error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Wrap an error raised while a participant was generating its turn
    pub fn generation(participant: impl Into<String>, source: Error) -> Self {
        Self::Generation {
            participant: participant.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error stems from missing or invalid configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("Failed to parse YAML: {}", err))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_names_participant() {
        let err = Error::generation("fiscal_analysis_agent", Error::upstream("502 Bad Gateway"));
        let text = err.to_string();
        assert!(text.contains("fiscal_analysis_agent"));
        assert!(text.contains("502 Bad Gateway"));
        assert!(!err.is_config());
    }

    #[test]
    fn test_yaml_error_maps_to_config() {
        let err: Error = serde_yaml::from_str::<Vec<String>>("{not: [a list")
            .unwrap_err()
            .into();
        assert!(err.is_config());
    }
}
