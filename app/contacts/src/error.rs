use axum::response::{IntoResponse, Json, Response};
use http::StatusCode;
use shared::proto::{Envelope, ErrorBody, FieldError, MSG_INTERNAL};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, Clone)]
pub enum ContactError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Record {0} not found")]
    NotFound(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("configuration error:{0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ContactError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ContactError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<sqlx::Error> for ContactError {
    fn from(err: sqlx::Error) -> Self {
        ContactError::Storage(err.to_string())
    }
}

impl From<shared::SharedError> for ContactError {
    fn from(err: shared::SharedError) -> Self {
        ContactError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ContactError {
    fn from(err: std::io::Error) -> Self {
        ContactError::ServerError(err.to_string())
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        match self {
            ContactError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(errors))).into_response()
            }
            ContactError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(Envelope::<()>::failed(self.to_string())),
            )
                .into_response(),
            // 存储层细节只写日志，不返回给调用方
            ContactError::Storage(ref cause)
            | ContactError::ConfigError(ref cause)
            | ContactError::ServerError(ref cause) => {
                error!(error = %cause, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(Envelope::<()>::failed(MSG_INTERNAL)),
                )
                    .into_response()
            }
        }
    }
}
