//! Error types for the Dersimiz client.

/// Top-level error type for the client core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors coming back from the remote REST API or the HTTP transport.
///
/// The server identifies failures with a free-form string code
/// (`INVALID_OTP`, `CONTENT_BLOCKED`, ...). Call sites inspect it through
/// [`ApiError::code`] where they need to branch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Server {
        status: u16,
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Session expired")]
    Unauthenticated,
}

/// Message shown when neither the server nor the transport supplied one.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

impl ApiError {
    /// Server-supplied error code, if the failure came with an error envelope.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// HTTP status of a server failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for an inline error or toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Server { .. } => GENERIC_ERROR_MESSAGE.to_string(),
            Self::Transport(reason) | Self::Decode(reason) if !reason.trim().is_empty() => {
                reason.clone()
            }
            Self::Unauthenticated => "Session expired".to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthenticated) || self.status() == Some(401)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Local credential storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open credential store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Client-side validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Phone number must be exactly {expected} digits")]
    InvalidPhone { expected: usize },

    #[error("Verification code must be exactly {expected} digits")]
    InvalidOtp { expected: usize },

    #[error("A new code can be requested in {remaining_secs}s")]
    ResendCooldown { remaining_secs: u64 },

    #[error("Invalid availability slot: day {day}, hour {hour}")]
    InvalidSlot { day: u8, hour: u8 },

    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("Field must not be empty: {0}")]
    Empty(&'static str),
}

/// Result type alias for the client core.
pub type Result<T> = std::result::Result<T, Error>;
