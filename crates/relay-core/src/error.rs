use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("No active worker connection")]
    NoConnection,

    #[error("Worker queue full, frame dropped")]
    QueueFull,

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl RelayError {
    /// Short error code string used in logs and admin responses.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "CONFIG_ERROR",
            RelayError::Malformed(_) => "MALFORMED_PAYLOAD",
            RelayError::NoConnection => "NO_CONNECTION",
            RelayError::QueueFull => "QUEUE_FULL",
            RelayError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
