use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    NotJson(String),
    CompletionError(String),
    MalformedCompletion(String),
    SchemaValidation(Vec<String>),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::NotJson(msg) => write!(f, "Request must be JSON: {}", msg),
            AppError::CompletionError(msg) => write!(f, "Completion error: {}", msg),
            AppError::MalformedCompletion(msg) => write!(f, "Malformed LLM output: {}", msg),
            AppError::SchemaValidation(fields) => {
                write!(f, "Schema validation error: invalid fields: {}", fields.join(", "))
            }
            AppError::InternalError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotJson(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::CompletionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedCompletion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SchemaValidation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Every error body is structured JSON, never an HTML error page.
        let body = match &self {
            AppError::SchemaValidation(fields) => Json(json!({
                "message": self.to_string(),
                "success": false,
                "fields": fields,
            })),
            _ => Json(json!({
                "message": self.to_string(),
                "success": false,
            })),
        };

        (status, body).into_response()
    }
}
