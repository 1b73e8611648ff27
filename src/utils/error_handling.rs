use thiserror::Error;

/// Protocol error types
#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("Invalid service: {service}")]
    UnknownService { service: String },

    #[error("Invalid command for {service}: {cmd}")]
    UnknownCommand { service: String, cmd: String },

    #[error("Failed to encode reply data: {0}")]
    EncodingFailure(String),

    #[error("No handler registered for service: {service}")]
    NoHandler { service: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for protocol operations
pub type ProtoResult<T> = Result<T, ProtoError>;

impl ProtoError {
    /// Create a configuration error
    pub fn config(msg: &str) -> Self {
        ProtoError::Configuration(msg.to_string())
    }

    /// Create an invalid format error
    pub fn format(msg: &str) -> Self {
        ProtoError::InvalidFormat(msg.to_string())
    }

    /// True for the errors `Cmd::validate` produces
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProtoError::UnknownService { .. } | ProtoError::UnknownCommand { .. }
        )
    }
}
