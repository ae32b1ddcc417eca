//! Error types for llm-relay.

/// Errors raised while initializing an engine or streaming a completion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Engine not initialized")]
    EngineNotInitialized,

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Usage data not available")]
    UsageUnavailable,

    #[error("Engine communication error: {0}")]
    Communication(String),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::EngineNotInitialized.to_string(), "Engine not initialized");
        assert_eq!(Error::UsageUnavailable.to_string(), "Usage data not available");
        assert_eq!(
            Error::LoadFailed("no such model".into()).to_string(),
            "Load failed: no such model"
        );
    }
}
