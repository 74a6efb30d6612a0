use actix_web::http::StatusCode;
use actix_web::{error::ResponseError, HttpResponse};
use log::{debug, error, warn};
use serde_json::json;
use thiserror::Error;

// Every failure the workflow can report. Callers must be able to tell
// "not approved yet" from "wrong password" from "duplicate account".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Account is not pending review")]
    NotPending,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account role does not match the requested role")]
    RoleMismatch,
    #[error("Account not approved yet")]
    NotApproved,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::DuplicateEmail => "DUPLICATE_EMAIL",
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::NotPending => "NOT_PENDING",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::RoleMismatch => "ROLE_MISMATCH",
            ApiError::NotApproved => "NOT_APPROVED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidPayload(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::DuplicateEmail | ApiError::NotPending => StatusCode::CONFLICT,
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::RoleMismatch | ApiError::NotApproved => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(detail) => {
                error!("\x1B[1;31mINTERNAL SERVER ERROR:\x1B[0m {}", detail);
                "Internal server error".to_string()
            }
            ApiError::NotFound(_) => {
                debug!("\x1B[1;36mNOT FOUND:\x1B[0m {}", self);
                self.to_string()
            }
            _ => {
                warn!("\x1B[1;33m{}:\x1B[0m {}", self.code(), self);
                self.to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.code(),
            "message": message,
        }))
    }
}
