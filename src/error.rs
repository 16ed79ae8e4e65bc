// permx/src/error.rs

use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde::Serialize;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum PermxError {
    #[display(fmt = "Malformed permission payload: {}", _0)]
    MalformedPayload(String),
    #[display(fmt = "Permission source failed: {}", _0)]
    SourceFailed(String),
    #[display(fmt = "Invalid permission mapping: {}", _0)]
    InvalidMapping(String),
    #[display(fmt = "Configuration error: {}", _0)]
    Config(String),
    #[display(fmt = "I/O error: {}", _0)]
    Io(String),
}

impl std::error::Error for PermxError {}

impl From<std::io::Error> for PermxError {
    fn from(err: std::io::Error) -> Self {
        PermxError::Io(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ResponseError for PermxError {
    fn error_response(&self) -> HttpResponse {
        let status = match self {
            PermxError::MalformedPayload(_) | PermxError::InvalidMapping(_) => {
                actix_web::http::StatusCode::BAD_REQUEST
            }
            _ => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
