use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chat_service::ServiceError;
use conversation_manager::TreeError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::BadRequest(msg),
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            e @ ServiceError::SessionNotFound => AppError::NotFound(e.to_string()),
            e @ ServiceError::QuotaExceeded { .. } => AppError::TooManyRequests(e.to_string()),
            ServiceError::Tree(e @ TreeError::InvalidRole) => AppError::BadRequest(e.to_string()),
            ServiceError::Tree(
                e @ (TreeError::MessageNotFound | TreeError::ConversationNotFound),
            ) => AppError::NotFound(e.to_string()),
            e => AppError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_response = JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: "api_error".to_string(),
            },
        };
        HttpResponse::build(status_code).json(error_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_map_to_429() {
        let err: AppError = ServiceError::QuotaExceeded { remaining: 0 }.into();
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn invalid_role_maps_to_400() {
        let err: AppError = ServiceError::Tree(TreeError::InvalidRole).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_session_maps_to_404() {
        let err: AppError = ServiceError::SessionNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflicts_stay_internal_and_opaque() {
        let err: AppError = ServiceError::Tree(TreeError::Conflict).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
