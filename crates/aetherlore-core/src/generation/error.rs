//! Generation errors
//!
//! Every failure renders as one human-readable message suitable for a
//! transient notification.

use thiserror::Error;

/// Errors that can occur while generating text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// A required credential is missing; no request was sent
    #[error("{0}")]
    Credential(String),

    /// The backend rejected the credential (HTTP 401)
    #[error("Invalid {backend} API Key.")]
    Unauthorized { backend: &'static str },

    /// The backend answered with a non-success status
    #[error("{backend} API returned {status}: {reason}")]
    Status {
        backend: &'static str,
        status: u16,
        reason: String,
    },

    /// The request never completed or the reply could not be read
    #[error("{backend} connection failed: {detail}")]
    Connection {
        backend: &'static str,
        detail: String,
    },
}

impl GenerationError {
    /// Missing or rejected credential
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            GenerationError::Credential(_) | GenerationError::Unauthorized { .. }
        )
    }

    /// Non-success status or connection failure
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GenerationError::Status { .. } | GenerationError::Connection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = GenerationError::Status {
            backend: "NovelAI",
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "NovelAI API returned 500: Internal Server Error"
        );
        assert!(err.is_transport());

        let err = GenerationError::Unauthorized { backend: "NovelAI" };
        assert_eq!(err.to_string(), "Invalid NovelAI API Key.");
        assert!(err.is_credential());
    }

    #[test]
    fn test_connection_names_backend() {
        let err = GenerationError::Connection {
            backend: "Gemini",
            detail: "dns error".to_string(),
        };
        assert!(err.to_string().contains("Gemini"));
        assert!(err.to_string().contains("dns error"));
        assert!(!err.is_credential());
    }
}
