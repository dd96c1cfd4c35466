use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for every operation the service exposes. A booking
/// conflict is deliberately absent: it is a normal response with
/// `success: false`, not an error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("UnAuthorized access")]
    Unauthenticated,
    #[error("Forbidden access")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Service unavailable")]
    Unavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status()).json(json!({ "message": self.to_string() }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            other => {
                log::error!("Store error: {other}");
                ApiError::Unavailable
            }
        }
    }
}
