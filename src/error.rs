use crate::services::providers::DetectorError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error type.
///
/// The first three variants are the analyze endpoint's wire contract; their
/// serialized bodies must not change shape.
#[derive(Debug, Error)]
pub enum AppError {
    /// The multipart body did not contain a usable `image` field.
    #[error("No image file provided")]
    MissingImage,

    /// The detection backend failed.
    #[error("Error processing image: {0}")]
    Detection(#[from] DetectorError),

    /// The backend answered but found nothing.
    #[error("No landmarks detected")]
    NoLandmarks,

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error_message, details) = match self {
            AppError::MissingImage => (
                StatusCode::BAD_REQUEST,
                "No image file provided".to_string(),
                None,
            ),
            AppError::Detection(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing image: {}", err),
                None,
            ),
            AppError::NoLandmarks => (
                StatusCode::NOT_FOUND,
                "No landmarks detected".to_string(),
                None,
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(format!("{:#}", err)),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}
