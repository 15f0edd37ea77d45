use crate::provider::ProviderError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// A call to the auth/database provider failed; `message` is the user-facing summary
    #[error("{message}: {source}")]
    Upstream {
        message: String,
        #[source]
        source: ProviderError,
    },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body returned for every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Error {
    /// Wrap a provider failure with the summary shown to the caller
    pub fn upstream(message: impl Into<String>, source: ProviderError) -> Self {
        Error::Upstream {
            message: message.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the response body. Provider messages are passed through as `details` so the
    /// caller can see why a deletion step failed; nothing else internal is exposed.
    pub fn body(&self) -> ErrorBody {
        match self {
            Error::Unauthenticated { message } => ErrorBody {
                error: message.clone().unwrap_or_else(|| "Unauthorized".to_string()),
                details: None,
            },
            Error::Upstream { message, source } => ErrorBody {
                error: message.clone(),
                details: Some(source.details()),
            },
            Error::Internal { .. } | Error::Other(_) => ErrorBody {
                error: "Internal server error".to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unauthenticated_body() {
        let err = Error::Unauthenticated { message: None };
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
    }

    #[test]
    fn test_upstream_body_carries_provider_details() {
        let err = Error::upstream(
            "Failed to delete user credits",
            ProviderError::Api {
                status: 400,
                message: "permission denied for table credits".to_string(),
            },
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = err.body();
        assert_eq!(body.error, "Failed to delete user credits");
        assert_eq!(body.details.as_deref(), Some("permission denied for table credits"));
    }

    #[test]
    fn test_every_failure_outside_auth_is_server_error() {
        let internal = Error::Internal {
            operation: "render navbar.html".to_string(),
        };
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.to_string(), "Failed to render navbar.html");
        assert_eq!(
            Error::Other(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = Error::Other(anyhow::anyhow!("connection pool exhausted"));
        let body = err.body();
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());
    }
}
