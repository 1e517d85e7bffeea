//! Error types for the bridge.

use thiserror::Error;

/// Bridge error type.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// IO error (configuration documents, refresh token file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (unreadable or invalid startup documents)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token endpoint rejected a grant or returned an unusable response
    #[error("Token error: {0}")]
    Token(String),

    /// MQTT client error
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
