//! # Client Error Types
//!
//! Every failure a page can receive from this crate.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     HTTP status         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Config         │  │  Transport      │  │  Unauthorized (401)     │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  NotFound (404)         │ │
//! │  │  Storage        │  │  Decode         │  │  Rejected (other 4xx)   │ │
//! │  └─────────────────┘  └─────────────────┘  │  Server (5xx)           │ │
//! │                                            └─────────────────────────┘ │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Client-side (no request was sent)                              │   │
//! │  │  Draft(DraftRejection)  Validation  Form  Busy  NotAuthenticated│   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages that came from the server are carried verbatim; `user_message`
//! turns the rest into the Spanish text the console shows.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use tienda_core::{CoreError, DraftRejection, FormErrors, ValidationError};

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Shown when a failed response carried nothing readable.
pub const GENERIC_ERROR_MESSAGE: &str = "Ocurrió un error inesperado";

#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Durable session file could not be read or written.
    #[error("Session storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    /// A response arrived but its body was not the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    // =========================================================================
    // HTTP Status Errors
    // =========================================================================
    /// 401. At login this is a credential rejection; anywhere else the
    /// session has already been cleared when the caller sees it.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other 4xx, usually a validation failure with a body.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    // =========================================================================
    // Client-side Errors
    // =========================================================================
    #[error(transparent)]
    Draft(#[from] DraftRejection),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Form(#[from] FormErrors),

    #[error("Draft error: {0}")]
    Core(String),

    /// A submission from the same composer is still in flight.
    #[error("A submission is already in progress")]
    Busy,

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    /// Maps a non-success status and its extracted message.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ClientError::Unauthorized(message),
            404 => ClientError::NotFound(message),
            400..=499 => ClientError::Rejected { status, message },
            _ => ClientError::Server { status, message },
        }
    }

    /// Stable identifier for UI bridges.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Config(_) => "CONFIG",
            ClientError::InvalidUrl(_) => "INVALID_URL",
            ClientError::Storage(_) => "STORAGE",
            ClientError::Transport(_) => "TRANSPORT",
            ClientError::Timeout => "TIMEOUT",
            ClientError::Decode(_) => "DECODE",
            ClientError::Unauthorized(_) => "UNAUTHORIZED",
            ClientError::NotFound(_) => "NOT_FOUND",
            ClientError::Rejected { .. } => "REJECTED",
            ClientError::Server { .. } => "SERVER",
            ClientError::Draft(rejection) => rejection.code(),
            ClientError::Validation(_) => "VALIDATION",
            ClientError::Form(_) => "FORM",
            ClientError::Core(_) => "DRAFT",
            ClientError::Busy => "BUSY",
            ClientError::NotAuthenticated => "NOT_AUTHENTICATED",
        }
    }

    /// Text a page shows in its banner or inline helper.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized(message)
            | ClientError::NotFound(message)
            | ClientError::Rejected { message, .. }
            | ClientError::Server { message, .. } => {
                if message.trim().is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            ClientError::Transport(_) | ClientError::Timeout => {
                "No se pudo conectar con el servidor".to_string()
            }
            ClientError::Decode(_) => "Respuesta inesperada del servidor".to_string(),
            ClientError::Draft(rejection) => rejection.to_string(),
            ClientError::Validation(error) => error.to_string(),
            ClientError::Form(errors) => errors.to_string(),
            ClientError::Core(message) => message.clone(),
            ClientError::Busy => "Ya hay un envío en curso".to_string(),
            ClientError::NotAuthenticated => "Debes iniciar sesión".to_string(),
            ClientError::Config(_) | ClientError::InvalidUrl(_) | ClientError::Storage(_) => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// 401 or no session at all.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthorized(_) | ClientError::NotAuthenticated
        )
    }

    /// True when the error was raised before any request was sent.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            ClientError::Draft(_)
                | ClientError::Validation(_)
                | ClientError::Form(_)
                | ClientError::Core(_)
                | ClientError::Busy
                | ClientError::NotAuthenticated
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::Config(_) | ClientError::InvalidUrl(_) | ClientError::Storage(_)
        )
    }

    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized(_) => Some(401),
            ClientError::NotFound(_) => Some(404),
            ClientError::Rejected { status, .. } | ClientError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// `{ "code": ..., "message": ... }`
impl Serialize for ClientError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ClientError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.user_message())?;
        state.end()
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(error) => ClientError::Validation(error),
            other => ClientError::Core(other.to_string()),
        }
    }
}
