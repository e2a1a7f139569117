use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use shelf::{app::AppError, cover::CoverError};

pub enum ApiError {
    App(AppError),

    BadRequest(String),

    /// Malformed or oversized multipart body, with the status axum assigned.
    Multipart(StatusCode, String),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        ApiError::App(value)
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        ApiError::Multipart(value.status(), value.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::App(app_error) => match app_error {
                AppError::Cover(cover_error) => match cover_error {
                    CoverError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    CoverError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
                    CoverError::Io(_) | CoverError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::Validation { .. } => StatusCode::BAD_REQUEST,
                AppError::BookNotFound { .. }
                | AppError::MemoryNotFound { .. }
                | AppError::QuoteNotFound { .. } => StatusCode::NOT_FOUND,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let status = self.status();
        let message = match self {
            ApiError::App(app_error) => {
                if status.is_server_error() {
                    tracing::error!(error = %app_error, "request failed");
                }
                app_error.to_string()
            }
            ApiError::BadRequest(msg) | ApiError::Multipart(_, msg) => msg,
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
