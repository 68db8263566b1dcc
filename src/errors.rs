use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::{DomainError, FieldErrors, InvalidTransition};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    InvalidTransition(InvalidTransition),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid webhook signature")]
    SignatureInvalid,

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(FieldErrors::single(field, message))
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::Validation(fields) => AppError::Validation(fields),
            DomainError::InvalidTransition(t) => AppError::InvalidTransition(t),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::SignatureInvalid => AppError::SignatureInvalid,
            DomainError::Upstream(msg) => AppError::Upstream(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::SignatureInvalid => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(fields) => json!({
                "error": self.to_string(),
                "fields": fields,
            }),
            AppError::InvalidTransition(t) => json!({
                "error": self.to_string(),
                "current": t.current,
                "attempted": t.attempted,
            }),
            AppError::Upstream(msg) => {
                log::error!("upstream failure: {msg}");
                json!({ "error": "Upstream service unavailable" })
            }
            AppError::Internal(msg) => {
                log::error!("internal error: {msg}");
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
