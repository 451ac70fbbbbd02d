//! Gate Error Types
//!
//! Every expected failure of the authentication surface is a variant
//! here, carrying whatever the structured response needs (retry delay,
//! remaining attempts). Only `Internal` represents an unexpected fault.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::kind::ErrorKind;
use thiserror::Error;

/// Gate-specific result type alias
pub type GateResult<T> = Result<T, GateError>;

/// Gate-specific error variants
#[derive(Debug, Error)]
pub enum GateError {
    /// Missing or malformed input
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Wrong master password
    #[error("Invalid password")]
    InvalidPassword { remaining_attempts: u32 },

    /// Source address is locked out
    #[error("Too many failed attempts, try again later")]
    Locked { retry_after_ms: i64 },

    /// Request rate limit exceeded
    #[error("Too many requests")]
    RateLimited { retry_after_ms: i64 },

    /// Session token missing, unknown, expired, or pinned elsewhere.
    /// Deliberately carries no reason; the audit log has it.
    #[error("Invalid or expired session")]
    SessionInvalid,

    /// Address is not on the admin allow-list
    #[error("Administrative access denied")]
    AdminDenied,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Stable machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Validation(_) => "VALIDATION_ERROR",
            GateError::InvalidPassword { .. } => "INVALID_PASSWORD",
            GateError::Locked { .. } => "LOCKED",
            GateError::RateLimited { .. } => "RATE_LIMITED",
            GateError::SessionInvalid => "INVALID_SESSION",
            GateError::AdminDenied => "ADMIN_DENIED",
            GateError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Validation(_) => ErrorKind::BadRequest,
            GateError::InvalidPassword { .. } | GateError::SessionInvalid => ErrorKind::Unauthorized,
            GateError::Locked { .. } | GateError::RateLimited { .. } => ErrorKind::TooManyRequests,
            GateError::AdminDenied => ErrorKind::Forbidden,
            GateError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Seconds until retry, for variants that carry a delay
    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GateError::Locked { retry_after_ms } | GateError::RateLimited { retry_after_ms } => {
                Some(((*retry_after_ms).max(0) as u64).div_ceil(1000))
            }
            _ => None,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            GateError::Internal(msg) => {
                tracing::error!(message = %msg, "Gate internal error");
            }
            GateError::InvalidPassword { remaining_attempts } => {
                tracing::warn!(remaining_attempts, "Invalid password attempt");
            }
            GateError::Locked { retry_after_ms } => {
                tracing::warn!(retry_after_ms, "Attempt from locked address");
            }
            GateError::RateLimited { .. } => {
                tracing::warn!("Request rate limited");
            }
            GateError::AdminDenied => {
                tracing::warn!("Admin endpoint access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Gate error");
            }
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        self.log();

        // The public message for internal faults stays generic; detail
        // is already logged server-side.
        let message = match &self {
            GateError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "success": false,
            "code": self.code(),
            "error": message,
        });

        if let GateError::InvalidPassword { remaining_attempts } = &self {
            body["remainingAttempts"] = (*remaining_attempts).into();
        }
        if let GateError::Locked { .. } = &self {
            body["locked"] = true.into();
        }
        if let Some(secs) = self.retry_after_secs() {
            body["retryAfter"] = secs.into();
            return (
                self.status_code(),
                [(http::header::RETRY_AFTER, secs.to_string())],
                Json(body),
            )
                .into_response();
        }

        (self.status_code(), Json(body)).into_response()
    }
}
