#![allow(dead_code)]
use thiserror::Error;

use crate::schema::SchemaViolation;

/// Client-level error type.
/// Every controller converts these into the user-facing `error` string via `Display`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication required - please sign in again")]
    NoSession,

    #[error("Session expired - please sign in again")]
    SessionExpiredUnrefreshable,

    /// Backend message is surfaced verbatim.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("Network error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn precondition(message: impl Into<String>) -> Self {
        ClientError::PreconditionFailed(message.into())
    }

    /// Message stored in controller state, falling back to `default` for empty renderings.
    pub fn user_message(&self, default: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            default.to_string()
        } else {
            message
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::MalformedResponse(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_displays_backend_message_verbatim() {
        let err = ClientError::Http {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "not found");
    }

    #[test]
    fn test_user_message_falls_back_when_empty() {
        let err = ClientError::Http {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message("Analysis failed."), "Analysis failed.");
    }

    #[test]
    fn test_user_message_keeps_precondition_text() {
        let err = ClientError::precondition("file_id is required");
        assert_eq!(err.user_message("x"), "file_id is required");
    }
}
