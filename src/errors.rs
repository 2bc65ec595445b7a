use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde_json::json;
use thiserror::Error;

pub const IMAGE_INVALID: &str = "'image' não é um base64 string válido";
pub const DATETIME_INVALID: &str = "'measure_datetime' não é uma data válida";
pub const TYPE_INVALID: &str = "'measure_type' não é um valor válido";
pub const CUSTOMER_INVALID: &str = "'customer_code' não é um valor válido";
pub const BODY_INVALID: &str = "corpo da requisição inválido";
pub const DOUBLE_REPORT: &str = "Leitura do mês já realizada";
pub const PROCESSING_FAILED: &str = "Ocorreu um erro ao processar a imagem";
pub const IMAGE_NOT_FOUND: &str = "Image not found.";

/// Everything a handler can answer with besides success.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{description}")]
    InvalidData { status: StatusCode, description: String },
    #[error("{}", DOUBLE_REPORT)]
    DoubleReport,
    #[error("{0}")]
    Internal(String),
    #[error("{}", IMAGE_NOT_FOUND)]
    NotFound,
}

impl AppError {
    pub fn invalid(description: impl Into<String>) -> Self {
        Self::InvalidData { status: StatusCode::BAD_REQUEST, description: description.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidData { status, .. } => *status,
            Self::DoubleReport => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidData { .. } => "INVALID_DATA",
            Self::DoubleReport => "DOUBLE_REPORT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            // The temp-image endpoint keeps its own, shorter error shape.
            Self::NotFound => json!({ "error": IMAGE_NOT_FOUND }),
            other => json!({
                "error_code": other.code(),
                "error_description": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
