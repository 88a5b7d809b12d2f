use edgekit_core::EdgeKitError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; the body is kept for callers that want the details.
    #[error("HTTP error {status}: {reason}")]
    HttpStatus {
        status: u16,
        reason: String,
        body: Vec<u8>,
    },

    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("Timed out connecting to MQTT broker after {0:?}")]
    ConnectTimeout(Duration),

    #[error("MQTT connection refused: {0}")]
    ConnectionRefused(String),

    #[error("No {packet} from MQTT broker within {timeout:?}")]
    AckTimeout {
        packet: &'static str,
        timeout: Duration,
    },

    #[error("MQTT broker rejected subscription to {0}")]
    SubscriptionRejected(String),

    #[error("MQTT connection closed before the broker acknowledged")]
    ConnectionClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] EdgeKitError),
}

pub type Result<T> = std::result::Result<T, NetError>;
