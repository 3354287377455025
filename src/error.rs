//! Error types and handling for the Pracht Alpha bridge
//!
//! The three wallbox-facing kinds (`Connection`, `Auth`, `Protocol`) are kept
//! apart because callers react differently to each: a connection failure is
//! retried on the next poll, an auth failure needs new credentials, and a
//! protocol failure means the device answered with something unusable.

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, PrachtError>;

/// Main error type for the bridge
#[derive(Debug, Error)]
pub enum PrachtError {
    /// Transport-level failure: timeout, refused connection, DNS failure
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Credentials rejected, or the auth key was refused after one re-login
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Unexpected HTTP status or a body that is not the expected object
    #[error("Protocol error: {message}")]
    Protocol {
        status: Option<u16>,
        message: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// HTTP server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl PrachtError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        PrachtError::Connection {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        PrachtError::Auth {
            message: message.into(),
        }
    }

    /// Create a protocol error for a malformed body
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        PrachtError::Protocol {
            status: None,
            message: message.into(),
        }
    }

    /// Create a protocol error for an unexpected HTTP status
    pub fn protocol_status<S: Into<String>>(status: u16, body: S) -> Self {
        PrachtError::Protocol {
            status: Some(status),
            message: format!("API error {}: {}", status, body.into()),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PrachtError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        PrachtError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        PrachtError::Io {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        PrachtError::Web {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        PrachtError::Generic {
            message: message.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, PrachtError::Connection { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, PrachtError::Auth { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, PrachtError::Protocol { .. })
    }

    /// HTTP status carried by a protocol error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            PrachtError::Protocol { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<std::io::Error> for PrachtError {
    fn from(err: std::io::Error) -> Self {
        PrachtError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PrachtError {
    fn from(err: serde_yaml::Error) -> Self {
        PrachtError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PrachtError {
    fn from(err: serde_json::Error) -> Self {
        PrachtError::Serialization {
            message: err.to_string(),
        }
    }
}
